use colored::Colorize;

use util::Timer;

use crate::settings::Settings;

const BANNER: &str = "##################################";

/// All interactions with the text UI should go through this struct.
pub struct Ui {
    /// -v setting, displays extra text info to user
    pub verbose: bool,
    /// keeps track of time for each step
    timer: Timer,
}

impl Ui {
    pub fn new(settings: &Settings) -> Self {
        Self {
            verbose: settings.verbose > 0,
            timer: Timer::now(),
        }
    }

    pub fn start_timer(&mut self) {
        if self.verbose {
            self.timer.reset();
        }
    }

    pub fn print_elapsed(&self, step: &str) {
        if self.verbose {
            self.timer.print_elapsed(step);
        }
    }

    pub fn verbose_msg(&self, msg: &str) {
        if self.verbose {
            eprintln!("{}", msg);
        }
    }

    pub fn verbose_progress(&self, msg: &str) {
        if self.verbose {
            eprint!("{}... ", msg.magenta());
        }
    }

    pub fn verbose_progress_debug<T: std::fmt::Debug>(&self, msg: &str, arg: T) {
        if self.verbose {
            eprint!("{} {:?}... ", msg.magenta(), arg);
        }
    }

    pub fn done(&self) {
        if self.verbose {
            eprintln!("{}.", "done".green());
        }
    }

    /// Printed before every submission, so the exact command is on record.
    pub fn launch_banner(&self, cmd: &str) {
        eprintln!("{}", BANNER.cyan());
        eprintln!("{}", cmd);
        eprintln!("{}\n", BANNER.cyan());
    }

    /// End-of-run summary.
    pub fn launched(&self, n: usize) {
        if n == 0 {
            eprintln!("{}", "No jobs to launch; exiting.".green());
        } else {
            eprintln!("{} {n} job{}.", "Launched".green(), if n == 1 { "" } else { "s" });
        }
    }
}
