use std::io::ErrorKind;
use std::process::Command;

use anyhow::{Context, Result};

use crate::fs::Fs;

use super::{Error, Executor, Job};

/// Queue submission command.
const SUBMIT_CMD: &str = "addqueue";

/// Submits jobs to the cluster queue with `addqueue`.
#[derive(Debug)]
pub struct ClusterExecutor {
    /// Queue name
    queue: String,
    /// Program and args listing queued/running jobs
    status_cmd: Vec<String>,
}

impl ClusterExecutor {
    pub fn new(queue: &str, status_cmd: &[String]) -> Self {
        Self {
            queue: queue.to_owned(),
            status_cmd: status_cmd.to_vec(),
        }
    }

    fn submit_args(&self, job: &Job) -> Vec<String> {
        let mut args = vec![
            "-o".to_owned(),
            job.log_file.to_string_lossy().into_owned(),
            "-c".to_owned(),
            job.label.clone(),
            "-n".to_owned(),
            format!("1x{}", job.resources.cores),
            "-s".to_owned(),
            "-q".to_owned(),
            self.queue.clone(),
            "-m".to_owned(),
            job.resources.mem_per_core.to_string(),
            job.program.clone(),
        ];
        args.extend(job.args.iter().cloned());
        args
    }
}

impl Executor for ClusterExecutor {
    fn queue_status(&mut self) -> Result<String> {
        let (program, args) = match self.status_cmd.split_first() {
            Some(split) => split,
            None => return Ok(String::new()),
        };
        let output = match Command::new(program).args(args).output() {
            Ok(output) => output,
            // not on a cluster login node; nothing can be in flight:
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::warn!("queue status command '{program}' not found; assuming empty queue");
                return Ok(String::new());
            }
            Err(e) => return Err(e).context("running queue status command"),
        };
        if !output.status.success() {
            return Err(Error::QueueQueryFailed(self.status_cmd.join(" "), output.status).into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn describe(&self, job: &Job) -> String {
        let mut line = SUBMIT_CMD.to_owned();
        for arg in self.submit_args(job) {
            line.push(' ');
            line.push_str(&arg);
        }
        line
    }

    fn submit(&mut self, job: &Job, _fs: &Fs) -> Result<()> {
        let status = Command::new(SUBMIT_CMD)
            .args(self.submit_args(job))
            .status()
            .with_context(|| format!("running {SUBMIT_CMD} for job '{}'", job.label))?;
        if !status.success() {
            return Err(Error::SubmissionFailed(job.label.clone(), status).into());
        }
        Ok(())
    }
}
