use anyhow::Result;
use colored::Colorize;

use crate::exec::Executor;

use super::{Error, Launcher};

impl<E: Executor> Launcher<'_, E> {
    /// List covariance lock files and batch jobs still in flight.
    ///
    /// Telling a crashed owner from a slow one needs lock ages compared against
    /// job runtimes, which is not done yet; this only reports what it finds.
    pub fn clean_lock(&mut self) -> Result<usize> {
        let locks = self.fs.find_locks(self.fs.cov_dir())?;
        eprintln!("{} {} lock file(s):", "Found".yellow(), locks.len());
        for lock in &locks {
            eprintln!("  {}", lock.display());
        }

        let mut batches: Vec<&str> = self.queue.iter().filter(|l| l.starts_with("batch")).collect();
        batches.sort_unstable();
        eprintln!("{} {} batch job(s) in flight:", "Found".yellow(), batches.len());
        for label in batches {
            eprintln!("  {label}");
        }

        Err(Error::Unimplemented("Removing lock files from failed runs").into())
    }
}
