use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};
use xcell_launch::exec::{Executor, Job};
use xcell_launch::fs::Fs;
use xcell_launch::{App, Args, Settings};

/// Records submissions instead of running them.
#[derive(Default)]
struct FakeExecutor {
    queue: String,
    jobs: Vec<Job>,
}

impl Executor for FakeExecutor {
    fn queue_status(&mut self) -> Result<String> {
        Ok(self.queue.clone())
    }

    fn describe(&self, job: &Job) -> String {
        job.command_line()
    }

    fn submit(&mut self, job: &Job, _fs: &Fs) -> Result<()> {
        self.jobs.push(job.clone());
        Ok(())
    }
}

/// A scheduler that turns every job down.
struct FailingExecutor;

impl Executor for FailingExecutor {
    fn queue_status(&mut self) -> Result<String> {
        Ok(String::new())
    }

    fn describe(&self, job: &Job) -> String {
        job.command_line()
    }

    fn submit(&mut self, job: &Job, _fs: &Fs) -> Result<()> {
        anyhow::bail!("rejected {}", job.label)
    }
}

const A0_B2: &str = "
tracers:
  A__0: {mapper_class: MapperNVSS, mask_name: mA}
  B__2: {mapper_class: MapperDESY1wl, mask_name: mB}
cls:
  A-B: {compute: all}
";

const SHARED_MASK: &str = "
tracers:
  A__0: {mapper_class: MapperNVSS, mask_name: mA}
  A__1: {mapper_class: MapperNVSS, mask_name: mA}
cls:
  A-A: {compute: auto}
";

const B2_FIRST: &str = "
tracers:
  B__2: {mapper_class: MapperDESY1wl, mask_name: mB}
  A__0: {mapper_class: MapperNVSS, mask_name: mA}
cls:
  A-B: {compute: all}
";

const TWO_MASKS_ALL: &str = "
tracers:
  A__0: {mapper_class: MapperNVSS, mask_name: mA}
  B__2: {mapper_class: MapperDESY1wl, mask_name: mB}
cls:
  A-A: {compute: all}
  A-B: {compute: all}
  B-B: {compute: all}
";

const FOUR_BINS: &str = "
tracers:
  A__0: {mapper_class: MapperDELS, mask_name: mA}
  A__1: {mapper_class: MapperDELS, mask_name: mA}
  A__2: {mapper_class: MapperDELS, mask_name: mA}
  A__3: {mapper_class: MapperDELS, mask_name: mA}
cls:
  A-A: {compute: all}
";

/// A data file in a temp dir, with its output dir next to it.
struct Fixture {
    dir: TempDir,
    config: PathBuf,
}

impl Fixture {
    fn new(body: &str) -> Result<Self> {
        let dir = tempdir()?;
        let config = dir.path().join("data.yml");
        std::fs::write(&config, format!("output: out\n{body}"))?;
        Ok(Self { dir, config })
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    fn args(&self, compute: &str) -> Args {
        Args {
            input: self.config.to_str().unwrap().to_owned(),
            compute: compute.to_owned(),
            nc: 28,
            mem: 7,
            queue: "berg".to_owned(),
            nnodes: 1,
            njobs: 100_000,
            to_sacc_name: "cls_cov.fits".to_owned(),
            to_sacc_use_nl: false,
            to_sacc_use_fiducial: false,
            cls_fiducial: false,
            onlogin: false,
            skip: Vec::with_capacity(0),
            recompute: false,
            override_yaml: false,
            batches: false,
            remove_cwsp: false,
            clean_lock: false,
            spin_mem: Vec::with_capacity(0),
            submit_interval_ms: 0,
            queue_status_cmd: "q -tn".to_owned(),
            python: "/usr/bin/python3".to_owned(),
            verbose: 1,
        }
    }

    fn run(&self, args: Args, queue: &str) -> Result<Vec<Job>> {
        let settings: Settings = args.try_into()?;
        let executor = FakeExecutor {
            queue: queue.to_owned(),
            jobs: Vec::new(),
        };
        let mut app = App::new(settings, executor);
        let n = app.run()?;
        let jobs = app.executor().jobs.clone();
        assert_eq!(n, jobs.len());
        Ok(jobs)
    }
}

fn labels(jobs: &[Job]) -> Vec<&str> {
    jobs.iter().map(|j| j.label.as_str()).collect()
}

fn touch(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path.parent().unwrap())?;
    std::fs::write(path, "")?;
    Ok(())
}

#[test]
fn cls_launch_then_nothing_once_output_exists() -> Result<()> {
    let fx = Fixture::new(A0_B2)?;
    let jobs = fx.run(fx.args("cls"), "")?;
    assert_eq!(labels(&jobs), ["cl_A__0_B__2"]);

    let job = &jobs[0];
    assert_eq!(job.program, "/usr/bin/python3");
    assert_eq!(job.args[..2], ["-m", "xcell.cls.cl"]);
    assert_eq!(job.args[3..], ["A__0", "B__2"]);
    assert!(job.log_file.ends_with("out/log/cl_A__0_B__2.log"));
    assert!(fx.output().join("data.yml").exists());

    touch(&fx.output().join("A_B/cl_A__0_B__2.npz"))?;
    assert!(fx.run(fx.args("cls"), "")?.is_empty());

    let mut forced = fx.args("cls");
    forced.recompute = true;
    assert_eq!(fx.run(forced, "")?.len(), 1);
    Ok(())
}

#[test]
fn fiducial_cls_go_to_their_own_dir() -> Result<()> {
    let fx = Fixture::new(A0_B2)?;
    touch(&fx.output().join("A_B/cl_A__0_B__2.npz"))?;

    let mut args = fx.args("cls");
    args.cls_fiducial = true;
    let jobs = fx.run(args, "")?;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].resources.mem_per_core, 2);
    assert_eq!(jobs[0].args.last().map(String::as_str), Some("--fiducial"));
    assert!(jobs[0].log_file.ends_with("out/fiducial/log/cl_A__0_B__2.log"));
    Ok(())
}

#[test]
fn job_cap_is_exact_and_ordered() -> Result<()> {
    let fx = Fixture::new(FOUR_BINS)?;
    let mut args = fx.args("cls");
    args.njobs = 3;
    let jobs = fx.run(args, "")?;
    assert_eq!(
        labels(&jobs),
        ["cl_A__0_A__0", "cl_A__0_A__1", "cl_A__0_A__2"]
    );
    Ok(())
}

#[test]
fn skip_list_matches_full_or_bare_name() -> Result<()> {
    let fx = Fixture::new(A0_B2)?;

    let mut args = fx.args("cls");
    args.skip = vec!["B".to_owned()];
    assert!(fx.run(args, "")?.is_empty());

    let mut args = fx.args("cls");
    args.skip = vec!["A__0".to_owned()];
    assert!(fx.run(args, "")?.is_empty());

    let mut args = fx.args("cls");
    args.skip = vec!["A__1".to_owned()];
    assert_eq!(fx.run(args, "")?.len(), 1);
    Ok(())
}

#[test]
fn queued_jobs_are_not_resubmitted() -> Result<()> {
    let fx = Fixture::new(A0_B2)?;
    let queue = "  JOBID QUEUE STATE COMMENT\n  4242 berg R cl_A__0_B__2\n";
    assert!(fx.run(fx.args("cls"), queue)?.is_empty());
    // a longer label is a different job:
    assert_eq!(fx.run(fx.args("cls"), "4242 berg R cl_A__0_B__2x")?.len(), 1);
    Ok(())
}

#[test]
fn cov_per_task() -> Result<()> {
    let fx = Fixture::new(SHARED_MASK)?;
    let jobs = fx.run(fx.args("cov"), "")?;
    assert_eq!(
        labels(&jobs),
        [
            "cov_A__0_A__0_A__0_A__0",
            "cov_A__0_A__0_A__1_A__1",
            "cov_A__1_A__1_A__1_A__1",
        ]
    );
    assert_eq!(jobs[0].args[1], "xcell.cls.cov");

    touch(&fx.output().join("cov/cov_A__0_A__0_A__1_A__1.npz"))?;
    assert_eq!(fx.run(fx.args("cov"), "")?.len(), 2);
    Ok(())
}

#[test]
fn shared_workspace_collapses_to_one_job() -> Result<()> {
    let fx = Fixture::new(SHARED_MASK)?;
    let mut args = fx.args("cov");
    args.batches = true;
    args.nnodes = 0;
    args.remove_cwsp = true;
    let jobs = fx.run(args, "")?;

    assert_eq!(labels(&jobs), ["cw__mA__mA__mA__mA.fits"]);
    assert_eq!(jobs[0].program, "/bin/bash");

    let script = fx.output().join("run_batches/cw__mA__mA__mA__mA.fits.sh");
    let text = std::fs::read_to_string(&script)?;
    assert_eq!(text.matches("\n/usr/bin/python3 -m xcell.cls.cov").count(), 3);
    assert!(text.contains("rm -f "));
    assert!(!text.contains(".lock"));
    assert!(!fx.output().join("cov/cw__mA__mA__mA__mA.fits.lock").exists());
    Ok(())
}

#[test]
fn node_batches_lock_their_workspaces() -> Result<()> {
    let fx = Fixture::new(A0_B2)?;
    let mut args = fx.args("cov");
    args.batches = true;
    let jobs = fx.run(args, "")?;

    assert_eq!(jobs.len(), 1);
    assert!(jobs[0].label.starts_with("batch0-1_"));
    assert!(jobs[0].label.ends_with("(~0.0days)"));
    assert!(jobs[0].log_file.to_str().unwrap().ends_with(".sh.log"));

    let out = fx.output();
    let lock = out.join("cov/cw__mA__mB__mA__mB.fits.lock");
    assert!(lock.exists());

    let inner = out.join("run_batches/cw__mA__mB__mA__mB.fits.sh");
    let text = std::fs::read_to_string(&inner)?;
    assert!(text.contains(&format!("rm -f {}", lock.canonicalize()?.display())));
    let outer = std::fs::read_to_string(&jobs[0].args[0])?;
    assert!(outer.contains(&format!("/bin/bash {}", inner.canonicalize()?.display())));

    // the lock now belongs to the submitted job:
    let mut again = fx.args("cov");
    again.batches = true;
    assert!(fx.run(again, "")?.is_empty());
    Ok(())
}

#[test]
fn existing_lock_skips_whole_group() -> Result<()> {
    let fx = Fixture::new(SHARED_MASK)?;
    touch(&fx.output().join("cov/cw__mA__mA__mA__mA.fits.lock"))?;

    for (batches, nnodes) in [(false, 1), (true, 0), (true, 2)] {
        let mut args = fx.args("cov");
        args.batches = batches;
        args.nnodes = nnodes;
        assert!(fx.run(args, "")?.is_empty());
    }
    Ok(())
}

#[test]
fn collapsed_orderings_remove_every_workspace_written() -> Result<()> {
    let fx = Fixture::new(B2_FIRST)?;
    let mut args = fx.args("cov");
    args.batches = true;
    args.nnodes = 0;
    args.remove_cwsp = true;
    let jobs = fx.run(args, "")?;
    assert!(labels(&jobs).contains(&"cw__mA__mB__mA__mB.fits"));

    let script = fx.output().join("run_batches/cw__mA__mB__mA__mB.fits.sh");
    let text = std::fs::read_to_string(&script)?;
    let removed: Vec<&str> = text.lines().filter(|l| l.starts_with("rm -f ")).collect();
    assert_eq!(removed.len(), 2);
    assert!(removed[0].ends_with("cw__mA__mB__mA__mB.fits"));
    assert!(removed[1].ends_with("cw__mB__mA__mB__mA.fits"));
    Ok(())
}

#[test]
fn failed_submission_releases_node_locks() -> Result<()> {
    let fx = Fixture::new(TWO_MASKS_ALL)?;
    let node_batches = || {
        let mut args = fx.args("cov");
        args.batches = true;
        args.nnodes = 2;
        args
    };

    let mut app = App::new(node_batches().try_into()?, FailingExecutor);
    assert!(app.run().is_err());
    let cov = fx.output().join("cov");
    let locks: Vec<_> = std::fs::read_dir(&cov)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "lock"))
        .collect();
    assert!(locks.is_empty(), "left behind: {locks:?}");

    // nothing is stuck, so a retry picks every workspace up again:
    let jobs = fx.run(node_batches(), "")?;
    assert_eq!(jobs.len(), 2);
    Ok(())
}

#[test]
fn to_sacc_once() -> Result<()> {
    let fx = Fixture::new(A0_B2)?;
    let mut args = fx.args("to_sacc");
    args.to_sacc_use_nl = true;
    let jobs = fx.run(args, "")?;
    assert_eq!(labels(&jobs), ["to_sacc"]);
    assert_eq!(jobs[0].args[3..], ["cls_cov.fits", "--use_nl"]);

    touch(&fx.output().join("cls_cov.fits"))?;
    assert!(fx.run(fx.args("to_sacc"), "")?.is_empty());
    Ok(())
}

#[test]
fn exclusive_sacc_sources_fail_fast() -> Result<()> {
    let fx = Fixture::new(A0_B2)?;
    let mut args = fx.args("to_sacc");
    args.to_sacc_use_nl = true;
    args.to_sacc_use_fiducial = true;
    assert!(Settings::try_from(args).is_err());
    assert!(!fx.output().exists());
    Ok(())
}

#[test]
fn unknown_compute_mode() -> Result<()> {
    let fx = Fixture::new(A0_B2)?;
    assert!(Settings::try_from(fx.args("covariance")).is_err());
    Ok(())
}

#[test]
fn unknown_tracer_class_fails_before_launch() -> Result<()> {
    let fx = Fixture::new(&A0_B2.replace("MapperDESY1wl", "MapperNope"))?;
    assert!(fx.run(fx.args("cls"), "").is_err());
    assert!(!fx.output().exists());
    Ok(())
}

#[test]
fn changed_data_file_needs_override() -> Result<()> {
    let fx = Fixture::new(A0_B2)?;
    fx.run(fx.args("cls"), "")?;

    std::fs::write(&fx.config, format!("output: out\n{SHARED_MASK}"))?;
    assert!(fx.run(fx.args("cls"), "").is_err());

    let mut args = fx.args("cls");
    args.override_yaml = true;
    assert_eq!(fx.run(args, "")?.len(), 2);
    Ok(())
}

#[test]
fn clean_lock_is_unimplemented() -> Result<()> {
    let fx = Fixture::new(A0_B2)?;
    touch(&fx.output().join("cov/cw__mA__mB__mA__mB.fits.lock"))?;
    let mut args = fx.args("cov");
    args.clean_lock = true;
    let err = fx.run(args, "").unwrap_err();
    assert!(err.to_string().contains("not implemented"));
    // nothing was removed:
    assert!(fx.output().join("cov/cw__mA__mB__mA__mB.fits.lock").exists());
    Ok(())
}
