use std::path::PathBuf;

use anyhow::Result;

use util::HashSet;

use crate::fs::Fs;
use crate::settings::Resources;

/// Submission through the cluster queue
mod cluster;
pub use cluster::ClusterExecutor;

/// Immediate execution on the current host
mod local;
pub use local::LocalExecutor;

/// Run a subprocess
mod run_cmd;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Submission of job '{0}' failed with {1}")]
    SubmissionFailed(String, std::process::ExitStatus),
    #[error("Queue status command '{0}' failed with {1}")]
    QueueQueryFailed(String, std::process::ExitStatus),
    #[error("Cannot attach to child {0}")]
    ChildPipe(&'static str),
    #[error("Thread forwarding child output panicked")]
    OutputThread,
}

/// One unit of work handed to an executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Label the queue shows for this job; also used to detect double submission
    pub label: String,
    /// Executable to run
    pub program: String,
    /// Its arguments
    pub args: Vec<String>,
    /// Where the job's stdout and stderr go
    pub log_file: PathBuf,
    /// Resources requested from the queue
    pub resources: Resources,
}

impl Job {
    /// `program arg1 arg2 ...`
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Something that can run jobs: the cluster queue, or the current host.
///
/// Everything that decides *what* to run lives outside this trait,
/// so the launcher can be driven by a fake executor in tests.
pub trait Executor {
    /// Raw text listing jobs that are queued or running.
    fn queue_status(&mut self) -> Result<String>;

    /// Command line `submit` will run, printed before dispatch.
    fn describe(&self, job: &Job) -> String;

    /// Hand `job` over for execution.
    fn submit(&mut self, job: &Job, fs: &Fs) -> Result<()>;
}

/// Labels of jobs in flight, taken once per launcher run.
#[derive(Debug, Default)]
pub struct QueueSnapshot {
    labels: HashSet<String>,
}

impl QueueSnapshot {
    /// Every whitespace-separated token of the queue listing is a candidate label.
    pub fn parse(text: &str) -> Self {
        Self {
            labels: text.split_whitespace().map(str::to_owned).collect(),
        }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}
