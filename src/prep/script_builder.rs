use std::path::Path;

/// Utility for building the contents of a batch script.
/// Note that it modifies a String reference held internally;
/// read that String to get the script's contents.
///
/// Scripts never use `set -e`: cleanup lines must run even when a command fails.
#[derive(Debug)]
pub struct BatchScriptBuilder<'a> {
    strbuf: &'a mut String,
}

impl<'a> BatchScriptBuilder<'a> {
    pub fn new(strbuf: &'a mut String) -> Self {
        Self { strbuf }
    }
}

impl BatchScriptBuilder<'_> {
    /// shebang line
    pub fn write_prefix(&mut self) {
        self.strbuf.clear();
        self.strbuf.push_str("#!/usr/bin/env bash\n\n");
    }

    /// announce and run one unit of work.
    pub fn write_command(&mut self, cmd: &str) {
        self.write_echo("Running", cmd);
        self.strbuf.push_str(cmd);
        self.strbuf.push('\n');
    }

    /// run an inner script, logging when it starts and finishes.
    pub fn write_inner_script(&mut self, script: &Path) {
        let cmd = format!("/bin/bash {}", shell_quote(&script.to_string_lossy()));
        self.write_command(&cmd);
        self.write_echo("Finished", &cmd);
        self.strbuf.push('\n');
    }

    /// release `lock`, then delete the consumed `workspaces`.
    pub fn write_cleanup_suffix<P: AsRef<Path>>(&mut self, lock: Option<&Path>, workspaces: &[P]) {
        self.strbuf.push('\n');
        if let Some(lock) = lock {
            let lock = shell_quote(&lock.to_string_lossy());
            self.write_echo("Removing lock file:", &lock);
            self.write_rm(&lock);
        }
        for workspace in workspaces {
            let workspace = shell_quote(&workspace.as_ref().to_string_lossy());
            self.write_echo("Removing", &workspace);
            self.write_rm(&workspace);
        }
    }

    /// final log line.
    pub fn write_finished(&mut self, what: &str) {
        self.write_echo("Finished", what);
    }

    fn write_echo(&mut self, verb: &str, what: &str) {
        self.strbuf.push_str("echo ");
        self.strbuf.push_str(&shell_quote(&format!("{verb} {what}")));
        self.strbuf.push('\n');
    }

    fn write_rm(&mut self, quoted: &str) {
        self.strbuf.push_str("rm -f ");
        self.strbuf.push_str(quoted);
        self.strbuf.push('\n');
    }
}

/// Quote `s` for bash if it contains anything outside a conservative safe set.
pub fn shell_quote(s: &str) -> String {
    let safe = |c: char| c.is_ascii_alphanumeric() || "_-./=:,+@%".contains(c);
    if !s.is_empty() && s.chars().all(safe) {
        s.to_owned()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}
