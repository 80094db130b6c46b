use std::path::{Path, PathBuf};

use cache::ArtifactCache;
use registry::{ClTask, CovTask};

use super::Fs;

pub const CL_PREFIX: &str = "cl";
pub const COV_PREFIX: &str = "cov";
const NPZ_EXT: &str = "npz";
const LOG_EXT: &str = "log";
const SCRIPT_EXT: &str = "sh";

/// Utility fns for making common types of paths.
impl Fs {
    /// $OUTPUT/cov
    pub fn cov_dir(&self) -> PathBuf {
        self.output_prefix.join(COV_PREFIX)
    }

    /// $OUTPUT/cov/cov_{tr1}_{tr2}_{tr3}_{tr4}.npz
    pub fn cov_output(&self, task: &CovTask) -> PathBuf {
        with_ext(self.cov_dir().join(task.label(COV_PREFIX)), NPZ_EXT)
    }

    /// $OUTPUT, or $OUTPUT/fiducial for fiducial Cls
    pub fn cl_base(&self, fiducial: bool) -> PathBuf {
        if fiducial {
            self.output_prefix.join("fiducial")
        } else {
            self.output_prefix.clone()
        }
    }

    /// $BASE/{bare1}_{bare2}/cl_{tr1}_{tr2}.npz
    pub fn cl_output(&self, base: &Path, bare_pair: &str, task: &ClTask) -> PathBuf {
        let mut path = base.join(bare_pair);
        path.push(task.label(CL_PREFIX));
        with_ext(path, NPZ_EXT)
    }

    /// $OUTPUT/run_batches
    pub fn run_batches_dir(&self) -> PathBuf {
        self.output_prefix.join("run_batches")
    }

    /// $OUTPUT/run_batches/{name}.sh
    pub fn batch_script(&self, name: &str) -> PathBuf {
        with_ext(self.run_batches_dir().join(name), SCRIPT_EXT)
    }

    /// $BASE/log
    pub fn log_dir(&self, base: &Path) -> PathBuf {
        base.join("log")
    }

    /// $BASE/log/{label}.log
    pub fn log_file(&self, base: &Path, label: &str) -> PathBuf {
        with_ext(self.log_dir(base).join(label), LOG_EXT)
    }

    /// $OUTPUT/data.yml
    pub fn data_yml(&self) -> PathBuf {
        self.output_prefix.join("data.yml")
    }

    /// Maps and masks shared between jobs, under $OUTPUT/cache
    pub fn artifact_cache(&self) -> ArtifactCache {
        ArtifactCache::new(self.output_prefix.join("cache"))
    }

    /// $OUTPUT/{name}
    pub fn sacc_output(&self, name: &str) -> PathBuf {
        self.output_prefix.join(name)
    }
}

// labels contain dots ("cw__a__b__c__d.fits"), so we append rather than `set_extension`:
fn with_ext(path: PathBuf, ext: &str) -> PathBuf {
    let mut s = path.into_os_string();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}
