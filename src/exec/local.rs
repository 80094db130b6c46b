use std::process::Command;

use anyhow::Result;
use colored::Colorize;

use crate::fs::Fs;

use super::{run_cmd::run_cmd, Executor, Job};

/// Runs each job to completion on the current host, before the next is considered.
///
/// Meant for interactive debugging on a login node; nothing is ever queued,
/// so the queue snapshot is always empty.
#[derive(Debug, Default)]
pub struct LocalExecutor {
    /// number of jobs that exited unsuccessfully
    pub failures: usize,
}

impl LocalExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Executor for LocalExecutor {
    fn queue_status(&mut self) -> Result<String> {
        Ok(String::new())
    }

    fn describe(&self, job: &Job) -> String {
        job.command_line()
    }

    fn submit(&mut self, job: &Job, fs: &Fs) -> Result<()> {
        let mut cmd = Command::new(&job.program);
        cmd.args(&job.args);
        let success = run_cmd(&mut cmd, &job.log_file, fs)?;
        // a failed job owns its own cleanup; it must not stop its siblings:
        if !success {
            self.failures += 1;
            eprintln!("{} {} (see {:?})", "FAILED".red(), job.label, job.log_file);
            log::error!("job '{}' failed", job.label);
        }
        Ok(())
    }
}
