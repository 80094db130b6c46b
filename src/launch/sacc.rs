use anyhow::Result;

use crate::exec::Executor;
use crate::prep::ResourceAnnotation;
use crate::settings::SaccSource;

use super::{Launcher, SACC_MODULE};

const SACC_LABEL: &str = "to_sacc";

impl<E: Executor> Launcher<'_, E> {
    /// Assemble the final sacc file, unless it already exists.
    pub fn launch_to_sacc(&mut self) -> Result<usize> {
        let name = &self.settings.sacc_name;
        let output = self.fs.sacc_output(name);
        if self.fs.exists(&output) {
            log::debug!("skipping {SACC_LABEL}: {output:?} exists");
            return Ok(self.submitted);
        }
        if self.in_flight(SACC_LABEL) {
            return Ok(self.submitted);
        }

        let mut args = vec![name.clone()];
        match self.settings.sacc_source {
            SaccSource::Cls => {}
            SaccSource::Nl => args.push("--use_nl".to_owned()),
            SaccSource::Fiducial => args.push("--use_fiducial".to_owned()),
        }
        let job = self.python_job(
            SACC_LABEL.to_owned(),
            SACC_MODULE,
            args,
            self.fs.output_prefix(),
            self.settings.resources,
        )?;
        self.dispatch(&job, ResourceAnnotation::new(1, 0))?;
        Ok(self.submitted)
    }
}
