mod config;
pub use config::{ClCompute, ClsEntry, Config, Recompute, Sphere, TracerConfig};

mod mapper;
pub use mapper::{FieldKind, Mapper, MapperClass, NoiseModel};

mod tracer;
pub use tracer::{bare_name, Spin, Tracer};

mod task;
pub use task::{canonicalize, ClTask, CovTask, Task};

mod tracer_registry;
pub use tracer_registry::Registry;

mod grouping;
pub use grouping::{
    canonical_masks, group_by_workspace, task_workspace_path, workspace_file_name, workspace_path,
    WorkspaceGroup, WorkspaceGroups,
};

mod estimate;
pub use estimate::{MemoryModel, Mode, SpinCosts};

/// Separates a tracer's bare (survey) name from its bin, e.g. "DESgc__0".
pub const BARE_DELIM: &str = "__";
/// Separates the two bare names of a `cls` entry, e.g. "DESgc-DESwl".
pub const PAIR_DELIM: char = '-';

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Tracer \"{0}\" not found in configuration")]
    UnknownTracer(String),
    #[error("Unknown mapper class \"{0}\"")]
    UnknownMapperClass(String),
    #[error("Invalid cls entry '{0}' (should be formatted 'Bare1-Bare2')")]
    InvalidClsPair(String),
    #[error("Tracer names in configuration must be strings")]
    InvalidTracerKey,
    #[error("Compute '{0}' not defined (expected 'cls' or 'cov')")]
    InvalidMode(String),
    #[error("Spin {0} is not supported (expected 0 or 2)")]
    UnsupportedSpin(u8),
    #[error("Covariance memory cost for spin {0} is smaller than the Cl cost")]
    InconsistentCosts(u8),
    #[error("Invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
