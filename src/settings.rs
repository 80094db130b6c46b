use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;

use registry::{MemoryModel, Mode, Spin};

use crate::args::Args;

/// Memory per core (GB) requested by fiducial Cl jobs.
pub const FIDUCIAL_MEM_PER_CORE: u32 = 2;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Compute value '{0}' not understood (expected cls, cov or to_sacc)")]
    InvalidComputeMode(String),
    #[error("Only one of --to-sacc-use-nl or --to-sacc-use-fiducial can be set")]
    ExclusiveSaccSources,
    #[error("invalid --spin-mem value '{0}' (should be formatted 'cls:2=30' or 'cov:0=16')")]
    InvalidSpinMem(String),
    #[error("Data file \"{0}\" does not exist")]
    ConfigNotFound(String),
    #[error("Invalid config path has no parent (should not happen)")]
    ConfigHasNoParent,
    #[error("--queue-status-cmd must not be empty")]
    EmptyQueueStatusCmd,
}

/// What this invocation computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeMode {
    Cls,
    Cov,
    ToSacc,
}

/// Which estimates the sacc file is assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaccSource {
    Cls,
    Nl,
    Fiducial,
}

/// How covariance jobs are bundled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CovStrategy {
    /// One job per covariance block
    PerTask,
    /// One job per covariance workspace
    Grouped,
    /// Lock-protected workspace scripts, bundled onto this many nodes
    NodeBatches(u32),
}

/// Resources requested from the queue for each job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resources {
    pub cores: u32,
    pub mem_per_core: u32,
}

/// Settings are like Args, except all the logic has
/// been applied so e.g. defaults are added in.
#[derive(Debug)]
pub struct Settings {
    pub config: PathBuf,
    pub compute: ComputeMode,
    pub resources: Resources,
    pub queue: String,
    pub njobs: usize,
    pub cov_strategy: CovStrategy,
    pub sacc_name: String,
    pub sacc_source: SaccSource,
    pub cls_fiducial: bool,
    pub onlogin: bool,
    pub skip: Vec<String>,
    pub recompute: bool,
    pub override_yaml: bool,
    pub remove_cwsp: bool,
    pub clean_lock: bool,
    pub memory: MemoryModel,
    pub submit_interval: Duration,
    pub queue_status_cmd: Vec<String>,
    pub python: String,
    pub verbose: u8,
}

impl Settings {
    /// Get canonicalized parent dir of config file:
    pub fn config_parent_dir(&self) -> Result<&Path, Error> {
        let parent_dir = self.config.parent().ok_or(Error::ConfigHasNoParent)?;
        Ok(parent_dir)
    }
}

impl TryFrom<Args> for Settings {
    type Error = anyhow::Error;
    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let compute = match args.compute.as_str() {
            "cls" => ComputeMode::Cls,
            "cov" => ComputeMode::Cov,
            "to_sacc" => ComputeMode::ToSacc,
            other => return Err(Error::InvalidComputeMode(other.to_owned()).into()),
        };

        let sacc_source = match (args.to_sacc_use_nl, args.to_sacc_use_fiducial) {
            (true, true) => return Err(Error::ExclusiveSaccSources.into()),
            (true, false) => SaccSource::Nl,
            (false, true) => SaccSource::Fiducial,
            (false, false) => SaccSource::Cls,
        };

        let cov_strategy = match (args.batches, args.nnodes) {
            (false, _) => CovStrategy::PerTask,
            (true, 0) => CovStrategy::Grouped,
            (true, n) => CovStrategy::NodeBatches(n),
        };

        let mut memory = MemoryModel::default();
        for spin_mem in &args.spin_mem {
            let (mode, spin, gb) = parse_spin_mem(spin_mem)?;
            memory.set_cost(mode, spin, gb);
        }
        memory.validate()?;

        let queue_status_cmd: Vec<String> = args
            .queue_status_cmd
            .split_whitespace()
            .map(str::to_owned)
            .collect();
        if queue_status_cmd.is_empty() {
            return Err(Error::EmptyQueueStatusCmd.into());
        }

        let config = PathBuf::from(&args.input);
        if !config.exists() {
            return Err(Error::ConfigNotFound(args.input).into());
        }
        let config = config.canonicalize()?;

        Ok(Self {
            config,
            compute,
            resources: Resources {
                cores: args.nc,
                mem_per_core: args.mem,
            },
            queue: args.queue,
            njobs: args.njobs,
            cov_strategy,
            sacc_name: args.to_sacc_name,
            sacc_source,
            cls_fiducial: args.cls_fiducial,
            onlogin: args.onlogin,
            skip: args.skip,
            recompute: args.recompute,
            override_yaml: args.override_yaml,
            remove_cwsp: args.remove_cwsp,
            clean_lock: args.clean_lock,
            memory,
            submit_interval: Duration::from_millis(args.submit_interval_ms),
            queue_status_cmd,
            python: args.python,
            verbose: args.verbose,
        })
    }
}

/// "cov:2=60" -> (Cov, Two, 60)
fn parse_spin_mem(s: &str) -> Result<(Mode, Spin, u32)> {
    let invalid = || Error::InvalidSpinMem(s.to_owned());
    let (mode, rest) = s.split_once(':').ok_or_else(invalid)?;
    let (spin, gb) = rest.split_once('=').ok_or_else(invalid)?;
    let mode: Mode = mode.parse()?;
    let spin = Spin::try_from(spin.parse::<u8>().map_err(|_| invalid())?)?;
    let gb = gb.parse::<u32>().map_err(|_| invalid())?;
    Ok((mode, spin, gb))
}
