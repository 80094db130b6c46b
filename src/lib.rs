/// High-level command line app
mod app;
/// Definition of command-line args
mod args;
/// Job execution: cluster queue or current host
pub mod exec;
/// Filesystem operations
pub mod fs;
/// Deciding what to launch
mod launch;
/// Structs for preparing jobs and their scripts
mod prep;
/// Interpreted command-line settings
mod settings;
/// Text UI
mod ui;

// exported for tests:
pub use app::App;
pub use args::Args;
pub use settings::{Resources, Settings};

use exec::{ClusterExecutor, LocalExecutor};

/// Run the command-line app.
pub fn run() -> Result<(), anyhow::Error> {
    use clap::Parser;
    let args = Args::parse();

    // INTERPRET SETTINGS ///////////////
    let settings: Settings = args.try_into()?;

    let log_level = match settings.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    simple_logging::log_to_stderr(log_level);

    // RUN THE THING /////////////////
    if settings.onlogin {
        let mut app = App::new(settings, LocalExecutor::new());
        app.run()?;
        let failures = app.executor().failures;
        if failures > 0 {
            log::warn!("{failures} job(s) failed on this host");
        }
    } else {
        let executor = ClusterExecutor::new(&settings.queue, &settings.queue_status_cmd);
        App::new(settings, executor).run()?;
    }

    Ok(())
}
