use std::path::Path;

use registry::{bare_name, Task};
use util::HashSet;

use crate::fs::Fs;

/// Tracers excluded on the command line, by full name (`DELS__0`) or bare name (`DELS`).
#[derive(Debug, Default)]
pub struct SkipList {
    names: HashSet<String>,
}

impl SkipList {
    pub fn new(names: &[String]) -> Self {
        Self {
            names: names.iter().cloned().collect(),
        }
    }

    /// Whether `tracer` was excluded, either itself or through its bare name.
    pub fn excludes_tracer(&self, tracer: &str) -> bool {
        self.names.contains(tracer) || self.names.contains(bare_name(tracer))
    }

    /// Whether any tracer of `task` was excluded.
    pub fn excludes<const N: usize>(&self, task: &Task<N>) -> bool {
        !self.names.is_empty() && task.tracers().iter().any(|tr| self.excludes_tracer(tr))
    }
}

/// An output still needs computing if it is missing or recomputation is forced.
pub fn needs_compute(fs: &Fs, output: &Path, recompute: bool) -> bool {
    recompute || !fs.exists(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry::ClTask;

    #[test]
    fn skip_by_full_or_bare_name() {
        let skip = SkipList::new(&["SURVEY__0".to_owned(), "DELS".to_owned()]);
        assert!(skip.excludes_tracer("SURVEY__0"));
        assert!(!skip.excludes_tracer("SURVEY__1"));
        assert!(skip.excludes_tracer("DELS__3"));
        assert!(skip.excludes(&ClTask::pair("KiDS__0", "DELS__1")));
        assert!(!skip.excludes(&ClTask::pair("KiDS__0", "SURVEY__1")));

        let bare = SkipList::new(&["SURVEY".to_owned()]);
        assert!(bare.excludes_tracer("SURVEY__0"));
        assert!(!SkipList::default().excludes(&ClTask::pair("SURVEY__0", "SURVEY__0")));
    }

    #[test]
    fn existing_output_is_done_unless_forced() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let fs = Fs::new(dir.path());
        let out = dir.path().join("cl_A__0_B__2.npz");
        assert!(needs_compute(&fs, &out, false));
        std::fs::write(&out, "")?;
        assert!(!needs_compute(&fs, &out, false));
        assert!(needs_compute(&fs, &out, true));
        Ok(())
    }
}
