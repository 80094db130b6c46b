use std::path::Path;
use std::thread;

use anyhow::{Context, Result};

use registry::{Mode, Recompute, Registry, Task};
use util::path_str;

use crate::exec::{Executor, Job, QueueSnapshot};
use crate::fs::Fs;
use crate::prep::{shell_quote, ResourceAnnotation, SkipList};
use crate::settings::{ComputeMode, Resources, Settings};
use crate::ui::Ui;

/// Per-pair Cl jobs
mod cls;
/// Covariance jobs, one by one or bundled by workspace
mod cov;
/// Final sacc assembly
mod sacc;
/// Inventory of lock files
mod locks;

const CL_MODULE: &str = "xcell.cls.cl";
const COV_MODULE: &str = "xcell.cls.cov";
const SACC_MODULE: &str = "xcell.cls.to_sacc";
/// Interpreter for generated batch scripts.
const BASH: &str = "/bin/bash";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0} is not implemented yet")]
    Unimplemented(&'static str),
}

/// Decides which units of work to launch, and hands them to an executor.
///
/// The queue is queried once, when the launcher is created; every decision
/// made afterwards is final for this invocation.
pub struct Launcher<'a, E: Executor> {
    settings: &'a Settings,
    fs: &'a Fs,
    registry: &'a Registry,
    /// recompute flags from the data file
    recompute: &'a Recompute,
    executor: &'a mut E,
    ui: &'a Ui,
    /// jobs in flight when we started
    queue: QueueSnapshot,
    skip: SkipList,
    /// submissions so far
    submitted: usize,
    /// reused for script contents
    strbuf: String,
}

impl<'a, E: Executor> Launcher<'a, E> {
    pub fn new(
        settings: &'a Settings,
        fs: &'a Fs,
        registry: &'a Registry,
        recompute: &'a Recompute,
        executor: &'a mut E,
        ui: &'a Ui,
    ) -> Result<Self> {
        let status = executor.queue_status().context("while querying the job queue")?;
        let queue = QueueSnapshot::parse(&status);
        log::debug!("queue snapshot empty: {}", queue.is_empty());
        Ok(Self {
            settings,
            fs,
            registry,
            recompute,
            executor,
            ui,
            queue,
            skip: SkipList::new(&settings.skip),
            submitted: 0,
            strbuf: String::with_capacity(0),
        })
    }

    /// Launch whatever `settings.compute` asks for; returns the number of submissions.
    pub fn launch(&mut self) -> Result<usize> {
        match self.settings.compute {
            ComputeMode::Cls => self.launch_cls(),
            ComputeMode::Cov => self.launch_cov(),
            ComputeMode::ToSacc => self.launch_to_sacc(),
        }
    }

    fn at_cap(&self) -> bool {
        self.submitted >= self.settings.njobs
    }

    fn in_flight(&self, label: &str) -> bool {
        let found = self.queue.contains(label);
        if found {
            log::debug!("skipping {label}: already queued or running");
        }
        found
    }

    fn excluded<const N: usize>(&self, task: &Task<N>) -> bool {
        let excluded = self.skip.excludes(task);
        if excluded {
            log::debug!("skipping {task}: excluded on command line");
        }
        excluded
    }

    /// `-m {module} {config} {args...}` run by the configured interpreter.
    fn python_job(
        &self,
        label: String,
        module: &str,
        args: Vec<String>,
        log_base: &Path,
        resources: Resources,
    ) -> Result<Job> {
        let mut full_args = vec![
            "-m".to_owned(),
            module.to_owned(),
            path_str(&self.settings.config)?.to_owned(),
        ];
        full_args.extend(args);
        Ok(Job {
            log_file: self.fs.log_file(log_base, &label),
            label,
            program: self.settings.python.clone(),
            args: full_args,
            resources,
        })
    }

    /// Same command as `python_job`, as one line of a batch script.
    fn python_command(&self, module: &str, tracers: &[String]) -> Result<String> {
        let mut cmd = shell_quote(&self.settings.python);
        cmd.push_str(" -m ");
        cmd.push_str(module);
        cmd.push(' ');
        cmd.push_str(&shell_quote(path_str(&self.settings.config)?));
        for tr in tracers {
            cmd.push(' ');
            cmd.push_str(&shell_quote(tr));
        }
        Ok(cmd)
    }

    /// Predicted memory of the most expensive of `tasks`.
    fn peak_memory<'t, const N: usize>(
        &self,
        tasks: impl IntoIterator<Item = &'t Task<N>>,
        mode: Mode,
    ) -> Result<u32> {
        let mut peak = 0;
        for task in tasks {
            let mem = self
                .settings
                .memory
                .estimate_memory(self.registry, &task.tracers()[..], mode)?;
            peak = peak.max(mem);
        }
        Ok(peak)
    }

    /// Print the command, submit, and pause before the next submission.
    fn dispatch(&mut self, job: &Job, annotation: ResourceAnnotation) -> Result<()> {
        annotation.check(&job.label, &job.resources);
        if let Some(log_dir) = job.log_file.parent() {
            self.fs.create_dir(log_dir)?;
        }

        self.ui.launch_banner(&self.executor.describe(job));
        self.executor
            .submit(job, self.fs)
            .with_context(|| format!("while submitting job '{}'", job.label))?;
        self.submitted += 1;
        log::info!("submitted {} ({} so far)", job.label, self.submitted);

        if !self.settings.submit_interval.is_zero() {
            thread::sleep(self.settings.submit_interval);
        }
        Ok(())
    }
}
