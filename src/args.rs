use clap::Parser;

const CMD_NAME: &str = "xcl";
const DEFAULT_QUEUE: &str = "berg";
const DEFAULT_SACC_NAME: &str = "cls_cov.fits";
const DEFAULT_QUEUE_STATUS: &str = "q -tn";
const DEFAULT_PYTHON: &str = "/usr/bin/python3";

/// Stores our command-line args format.
#[derive(Parser)]
#[command(name = CMD_NAME, version, about = "Compute Cls and cov from data.yml file", long_about = None)]
pub struct Args {
    /// Input YAML data file
    #[arg(value_name = "INPUT")]
    pub input: String,

    /// Compute: cls, cov or to_sacc
    #[arg(value_name = "COMPUTE")]
    pub compute: String,

    /// Number of cores to use
    #[arg(short = 'n', long, default_value_t = 28)]
    pub nc: u32,

    /// Memory (in GB) per core to use
    #[arg(short, long, default_value_t = 7)]
    pub mem: u32,

    /// Queue to submit to
    #[arg(short, long, default_value = DEFAULT_QUEUE)]
    #[arg(env = "XCELL_LAUNCH_QUEUE")]
    pub queue: String,

    /// Number of nodes to spread covariance batches over (0: one job per workspace)
    #[arg(short = 'N', long, default_value_t = 1)]
    pub nnodes: u32,

    /// Maximum number of jobs to launch
    #[arg(short = 'j', long, default_value_t = 100_000)]
    pub njobs: usize,

    /// Sacc file name
    #[arg(long, default_value = DEFAULT_SACC_NAME)]
    pub to_sacc_name: String,

    /// Use nl and cov extra (if present) instead of cls and covG
    #[arg(long)]
    pub to_sacc_use_nl: bool,

    /// Use the fiducial Cl and covG instead of data cls
    #[arg(long)]
    pub to_sacc_use_fiducial: bool,

    /// Compute the fiducial cls
    #[arg(long)]
    pub cls_fiducial: bool,

    /// Run the jobs on this host instead of appending them to the queue
    #[arg(long)]
    pub onlogin: bool,

    /// Skip tracers: DELS__0 skips that tracer only, DELS skips all DELS tracers
    #[arg(long, num_args = 1.., value_name = "TRACER")]
    pub skip: Vec<String>,

    /// Recompute outputs even if present
    #[arg(long)]
    pub recompute: bool,

    /// Replace the stored copy of the data file if it differs
    #[arg(long)]
    pub override_yaml: bool,

    /// Run all covariance blocks sharing a workspace in a single job
    #[arg(long)]
    pub batches: bool,

    /// Remove the covariance workspace once its batch job has finished
    #[arg(long)]
    pub remove_cwsp: bool,

    /// Remove lock files from failed runs
    #[arg(long)]
    pub clean_lock: bool,

    /// Override the memory model, e.g. 'cov:2=60'
    #[arg(long, value_name = "MODE:SPIN=GB")]
    pub spin_mem: Vec<String>,

    /// Pause between submissions, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    pub submit_interval_ms: u64,

    /// Command listing queued and running jobs
    #[arg(long, value_name = "CMD", default_value = DEFAULT_QUEUE_STATUS)]
    pub queue_status_cmd: String,

    /// Python interpreter used by the jobs
    #[arg(long, value_name = "PATH", default_value = DEFAULT_PYTHON)]
    #[arg(env = "XCELL_LAUNCH_PYTHON")]
    pub python: String,

    /// Print additional debugging info (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
