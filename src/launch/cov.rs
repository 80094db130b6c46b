use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;

use cache::{lock_path, LockFile, LockOutcome};
use registry::{
    group_by_workspace, task_workspace_path, workspace_path, CovTask, Mode, WorkspaceGroup,
    WorkspaceGroups,
};

use crate::exec::{Executor, Job};
use crate::fs::COV_PREFIX;
use crate::prep::{needs_compute, BatchScriptBuilder, ResourceAnnotation};
use crate::settings::CovStrategy;

use super::{Launcher, BASH, COV_MODULE};

/// A workspace script waiting to be bundled onto a node.
struct GroupScript {
    path: PathBuf,
    /// covariance blocks it computes
    ntasks: usize,
    /// handed over to the script once its node job is submitted
    lock: LockFile,
}

/// Remove the locks of scripts that will never run.
fn release_locks(scripts: impl IntoIterator<Item = GroupScript>) {
    for script in scripts {
        release_lock(script.lock);
    }
}

fn release_lock(lock: LockFile) {
    let path = lock.path().to_owned();
    if let Err(e) = lock.release() {
        log::error!("could not release lock {path:?}: {e}");
    }
}

impl<E: Executor> Launcher<'_, E> {
    pub fn launch_cov(&mut self) -> Result<usize> {
        match self.settings.cov_strategy {
            CovStrategy::PerTask => self.launch_cov_per_task(),
            CovStrategy::Grouped => self.launch_cov_grouped(),
            CovStrategy::NodeBatches(nnodes) => self.launch_cov_node_batches(nnodes),
        }
    }

    fn recompute_cov(&self) -> bool {
        self.settings.recompute || self.recompute.cov()
    }

    /// One job per covariance block.
    fn launch_cov_per_task(&mut self) -> Result<usize> {
        let recompute = self.recompute_cov();
        let tasks = self.registry.all_cov_tasks()?;
        log::info!("{} covariance tasks requested", tasks.len());

        for task in &tasks {
            if self.at_cap() {
                break;
            }
            let label = task.label(COV_PREFIX);
            if self.in_flight(&label) || self.excluded(task) {
                continue;
            }
            let output = self.fs.cov_output(task);
            if !needs_compute(self.fs, &output, recompute) {
                log::debug!("skipping {label}: {output:?} exists");
                continue;
            }
            // a node-batch run is writing this block's workspace:
            let workspace = workspace_path(self.registry, task, &self.fs.cov_dir())?;
            if self.fs.is_locked(&workspace) {
                log::debug!("skipping {label}: workspace {workspace:?} is locked");
                continue;
            }

            let job = self.python_job(
                label,
                COV_MODULE,
                task.tracers().to_vec(),
                self.fs.output_prefix(),
                self.settings.resources,
            )?;
            let mem = self.peak_memory([task], Mode::Cov)?;
            self.dispatch(&job, ResourceAnnotation::new(1, mem))?;
        }
        Ok(self.submitted)
    }

    /// One job per covariance workspace, running every block that reuses it.
    fn launch_cov_grouped(&mut self) -> Result<usize> {
        let groups = self.workspace_groups()?;
        self.fs.create_dir(self.fs.run_batches_dir())?;

        for group in &groups {
            if self.at_cap() {
                break;
            }
            let label = group.file_name().to_owned();
            if self.in_flight(&label) || self.claimed(group) {
                continue;
            }
            let pending = self.pending_in_group(group);
            // an empty script would still try to delete the workspace:
            if pending.is_empty() {
                continue;
            }

            let script = self.write_group_script(group, &pending, false)?;
            let job = self.script_job(label, script);
            let mem = self.peak_memory(pending.iter().copied(), Mode::Cov)?;
            self.dispatch(&job, ResourceAnnotation::new(pending.len(), mem))?;
        }
        Ok(self.submitted)
    }

    /// Lock-protected workspace scripts, bundled into one job per node.
    ///
    /// Every lock taken here is either handed to a submitted job or released
    /// before returning.
    fn launch_cov_node_batches(&mut self, nnodes: u32) -> Result<usize> {
        let groups = self.workspace_groups()?;
        self.fs.create_dir(self.fs.run_batches_dir())?;
        // locks live next to the workspaces:
        self.fs.create_dir(self.fs.cov_dir())?;

        let max_scripts = self.settings.njobs.saturating_mul(nnodes as usize);
        let mut scripts = Vec::new();
        let peak_mem = match self.lock_group_scripts(&groups, max_scripts, &mut scripts) {
            Ok(peak_mem) => peak_mem,
            Err(e) => {
                release_locks(scripts);
                return Err(e);
            }
        };
        if scripts.is_empty() {
            return Ok(self.submitted);
        }

        let chunk = chunk_size(scripts.len(), nnodes, self.settings.njobs);
        let timestamp = Utc::now().format("%Y%m%d%H%M%S").to_string();
        log::info!(
            "bundling {} workspace scripts onto {nnodes} node(s), {chunk} per node",
            scripts.len()
        );

        let mut start = 0;
        while start < scripts.len() {
            let end = scripts.len().min(start + chunk);
            let name = format!("batch{}-{chunk}_{timestamp}", start / chunk);
            if let Err(e) = self.dispatch_node(&name, &scripts[start..end], peak_mem) {
                // this node and every later one never got a job to remove their locks:
                release_locks(scripts.drain(start..));
                return Err(e);
            }
            start = end;
        }
        Ok(self.submitted)
    }

    /// Lock each group with work left and write its script, up to `max_scripts`.
    /// Returns the peak predicted memory over everything written.
    fn lock_group_scripts(
        &mut self,
        groups: &WorkspaceGroups,
        max_scripts: usize,
        scripts: &mut Vec<GroupScript>,
    ) -> Result<u32> {
        let mut peak_mem = 0;
        for group in groups {
            if scripts.len() >= max_scripts {
                break;
            }
            if self.claimed(group) {
                continue;
            }
            let pending = self.pending_in_group(group);
            if pending.is_empty() {
                continue;
            }
            let mem = self.peak_memory(pending.iter().copied(), Mode::Cov)?;

            let lock = match self.fs.acquire_lock(&group.path)? {
                LockOutcome::Acquired(lock) => lock,
                LockOutcome::Held => continue,
            };
            let path = match self.write_group_script(group, &pending, true) {
                Ok(path) => path,
                Err(e) => {
                    release_lock(lock);
                    return Err(e);
                }
            };
            peak_mem = peak_mem.max(mem);
            scripts.push(GroupScript {
                path,
                ntasks: pending.len(),
                lock,
            });
        }
        Ok(peak_mem)
    }

    /// Write the outer script running `node_scripts` in turn, and submit it.
    fn dispatch_node(
        &mut self,
        name: &str,
        node_scripts: &[GroupScript],
        peak_mem: u32,
    ) -> Result<()> {
        let ntasks = node_scripts.iter().map(|s| s.ntasks).sum();
        let annotation = ResourceAnnotation::new(ntasks, peak_mem);

        let mut builder = BatchScriptBuilder::new(&mut self.strbuf);
        builder.write_prefix();
        for script in node_scripts {
            builder.write_inner_script(&script.path);
        }
        let outer = self.fs.batch_script(name);
        self.fs.write_script(&outer, &self.strbuf)?;

        let mut job = self.script_job(format!("{name}{annotation}"), outer);
        job.log_file = self.fs.log_file(self.fs.output_prefix(), &format!("{name}.sh"));
        self.dispatch(&job, annotation)
    }

    fn workspace_groups(&self) -> Result<WorkspaceGroups> {
        let tasks = self.registry.all_cov_tasks()?;
        let groups = group_by_workspace(self.registry, &tasks, &self.fs.cov_dir())?;
        log::info!(
            "{} covariance tasks in {} workspace groups",
            tasks.len(),
            groups.len()
        );
        Ok(groups)
    }

    /// Whether another process already owns `group`'s workspace.
    fn claimed(&self, group: &WorkspaceGroup) -> bool {
        let locked = self.fs.is_locked(&group.path);
        if locked {
            log::debug!("skipping {}: workspace is locked", group.file_name());
        }
        locked
    }

    /// Tasks of `group` that are not excluded and not yet computed.
    fn pending_in_group<'g>(&self, group: &'g WorkspaceGroup) -> Vec<&'g CovTask> {
        let recompute = self.recompute_cov();
        group
            .tasks
            .iter()
            .filter(|task| {
                !self.excluded(*task) && needs_compute(self.fs, &self.fs.cov_output(task), recompute)
            })
            .collect()
    }

    /// `$OUTPUT/run_batches/{workspace}.sh`, running `tasks` then cleaning up.
    fn write_group_script(
        &mut self,
        group: &WorkspaceGroup,
        tasks: &[&CovTask],
        locked: bool,
    ) -> Result<PathBuf> {
        let mut commands = Vec::with_capacity(tasks.len());
        for task in tasks {
            commands.push(self.python_command(COV_MODULE, task.tracers())?);
        }
        let lock = locked.then(|| lock_path(&group.path));
        let workspaces = if self.settings.remove_cwsp {
            self.written_workspaces(group, tasks)?
        } else {
            Vec::new()
        };

        let mut builder = BatchScriptBuilder::new(&mut self.strbuf);
        builder.write_prefix();
        for cmd in &commands {
            builder.write_command(cmd);
        }
        builder.write_cleanup_suffix(lock.as_deref(), &workspaces);
        builder.write_finished(&group.path.to_string_lossy());

        let script = self.fs.batch_script(group.file_name());
        self.fs.write_script(&script, &self.strbuf)?;
        log::debug!("wrote {script:?} with {} covariances", tasks.len());
        Ok(script)
    }

    /// The shared workspace, plus the name each job of a collapsed ordering writes.
    fn written_workspaces(
        &self,
        group: &WorkspaceGroup,
        tasks: &[&CovTask],
    ) -> Result<Vec<PathBuf>> {
        let cov_dir = self.fs.cov_dir();
        let mut paths = vec![group.path.clone()];
        for task in tasks {
            let path = task_workspace_path(self.registry, task, &cov_dir)?;
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    fn script_job(&self, label: String, script: PathBuf) -> Job {
        Job {
            log_file: self.fs.log_file(self.fs.output_prefix(), &label),
            label,
            program: BASH.to_owned(),
            args: vec![script.to_string_lossy().into_owned()],
            resources: self.settings.resources,
        }
    }
}

/// Scripts per node: spread evenly, but never more than `njobs`.
fn chunk_size(nscripts: usize, nnodes: u32, njobs: usize) -> usize {
    let nnodes = (nnodes as usize).max(1);
    nscripts.div_ceil(nnodes).min(njobs).max(1)
}
