use anyhow::{Context, Result};
use colored::Colorize;

use registry::{Config, Mapper, Registry};

use crate::exec::Executor;
use crate::fs::Fs;
use crate::launch::Launcher;
use crate::settings::Settings;
use crate::ui::Ui;

/// This struct actually runs the command-line app.
pub struct App<E: Executor> {
    /// Interpreted command line settings
    settings: Settings,
    /// Where jobs go
    executor: E,
    /// User interface
    ui: Ui,
}

impl<E: Executor> App<E> {
    /// Create a new `App`.
    pub fn new(settings: Settings, executor: E) -> Self {
        let ui = Ui::new(&settings);
        Self {
            settings,
            executor,
            ui,
        }
    }

    /// The executor jobs were handed to.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run the app; returns the number of jobs submitted.
    pub fn run(&mut self) -> Result<usize> {
        let mut strbuf = String::with_capacity(0); // will be resized later.
        self.read_config_to_buf(&mut strbuf)?;
        let config = self.parse_config(&strbuf)?;
        let registry = Registry::new(&config)
            .with_context(|| format!("while resolving tracers in {:?}", self.settings.config))?;

        let mut fs = Fs::new(&config.output);
        self.ui.verbose_msg(&format!("Using output directory {:?}", config.output));
        fs.ensure_output_dir_exists()?;
        self.print_tracers(&registry, &fs);

        let mut snapshot_buf = String::new();
        fs.store_config_snapshot(&strbuf, self.settings.override_yaml, &mut snapshot_buf)?;

        self.ui.start_timer();
        let mut launcher = Launcher::new(
            &self.settings,
            &fs,
            &registry,
            &config.recompute,
            &mut self.executor,
            &self.ui,
        )?;
        let launched = if self.settings.clean_lock {
            launcher.clean_lock()?
        } else {
            launcher.launch()?
        };
        self.ui.print_elapsed("Launching");
        self.ui.launched(launched);

        Ok(launched)
    }

    fn read_config_to_buf(&self, strbuf: &mut String) -> Result<()> {
        self.ui.verbose_progress_debug("Reading data file", &self.settings.config);
        Fs::read_config(&self.settings.config, strbuf)
            .with_context(|| format!("while reading data file {:?}", self.settings.config))?;
        self.ui.done();
        Ok(())
    }

    fn parse_config(&self, text: &str) -> Result<Config> {
        self.ui.verbose_progress("Parsing data file");
        let config = Config::from_yaml(text, self.settings.config_parent_dir()?)
            .with_context(|| format!("while parsing data file {:?}", self.settings.config))?;
        self.ui.done();
        Ok(config)
    }

    fn print_tracers(&self, registry: &Registry, fs: &Fs) {
        if !self.ui.verbose {
            return;
        }
        let cache = fs.artifact_cache();
        let cached = |hit: bool| if hit { "cached".green() } else { "missing".yellow() };
        eprintln!("{} {} tracers:", "Resolved".magenta(), registry.tracers().len());
        for tracer in registry.tracers() {
            eprintln!(
                "  {} ({}, spin {}, noise {:?}) map {}, mask {} {}",
                tracer.name(),
                tracer.class().class_name(),
                tracer.spin(),
                tracer.noise(),
                cached(cache.contains(&tracer.signal_key())),
                tracer.mask_name(),
                cached(cache.contains(&tracer.mask_key())),
            );
        }
    }
}
