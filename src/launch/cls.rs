use anyhow::Result;

use registry::Mode;

use crate::exec::Executor;
use crate::fs::CL_PREFIX;
use crate::prep::{needs_compute, ResourceAnnotation};
use crate::settings::{Resources, FIDUCIAL_MEM_PER_CORE};

use super::{Launcher, CL_MODULE};

impl<E: Executor> Launcher<'_, E> {
    /// One job per Cl pair that is not queued, not excluded, and not yet computed.
    pub fn launch_cls(&mut self) -> Result<usize> {
        let fiducial = self.settings.cls_fiducial;
        let base = self.fs.cl_base(fiducial);
        let recompute = self.settings.recompute || self.recompute.cls();
        let resources = if fiducial {
            Resources {
                mem_per_core: FIDUCIAL_MEM_PER_CORE,
                ..self.settings.resources
            }
        } else {
            self.settings.resources
        };

        let tasks = self.registry.all_cl_tasks()?;
        log::info!("{} Cl tasks requested", tasks.len());

        for task in &tasks {
            if self.at_cap() {
                break;
            }
            let label = task.label(CL_PREFIX);
            if self.in_flight(&label) || self.excluded(task) {
                continue;
            }

            let [tr1, tr2] = task.tracers();
            let bare_pair = self.registry.bare_pair(tr1, tr2, '_')?;
            let output = self.fs.cl_output(&base, &bare_pair, task);
            if !needs_compute(self.fs, &output, recompute) {
                log::debug!("skipping {label}: {output:?} exists");
                continue;
            }

            let mut args = vec![tr1.clone(), tr2.clone()];
            if fiducial {
                args.push("--fiducial".to_owned());
            }
            let job = self.python_job(label, CL_MODULE, args, &base, resources)?;
            let mem = self.peak_memory([task], Mode::Cls)?;
            self.dispatch(&job, ResourceAnnotation::new(1, mem))?;
        }
        Ok(self.submitted)
    }
}
