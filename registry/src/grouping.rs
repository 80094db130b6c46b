use std::path::{Path, PathBuf};

use util::HashMap;

use crate::{CovTask, Error, Registry};

/// Prefix of covariance workspace file names.
const CWSP_PREFIX: &str = "cw";
/// Extension of covariance workspace files.
const CWSP_EXT: &str = "fits";

/// Covariance tasks that share one covariance workspace file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceGroup {
    /// Full path of the shared workspace artifact
    pub path: PathBuf,
    /// Tasks that reuse it, in input order
    pub tasks: Vec<CovTask>,
}

impl WorkspaceGroup {
    /// Workspace file name, e.g. "cw__mA__mB__mA__mB.fits"; used as a job label.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }
}

/// Covariance tasks partitioned by workspace artifact.
///
/// Groups are kept in the order their first task appears, so the result is
/// fully determined by the task list. Nothing about groups is stored between runs.
#[derive(Debug, Default)]
pub struct WorkspaceGroups {
    groups: Vec<WorkspaceGroup>,
    /// workspace path -> index into `groups`
    index: HashMap<PathBuf, usize>,
}

impl WorkspaceGroups {
    /// Add `task` to the group owning `path`, creating the group if necessary.
    pub fn insert(&mut self, path: PathBuf, task: CovTask) {
        if let Some(i) = self.index.get(&path) {
            self.groups[*i].tasks.push(task);
        } else {
            self.index.insert(path.clone(), self.groups.len());
            self.groups.push(WorkspaceGroup {
                path,
                tasks: vec![task],
            });
        }
    }

    pub fn get(&self, path: &Path) -> Option<&WorkspaceGroup> {
        self.index.get(path).map(|i| &self.groups[*i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WorkspaceGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl<'a> IntoIterator for &'a WorkspaceGroups {
    type Item = &'a WorkspaceGroup;
    type IntoIter = std::slice::Iter<'a, WorkspaceGroup>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Canonical ordering of the four masks of a covariance block.
///
/// The coupling coefficients of (a1, a2, b1, b2) are unchanged by swapping the
/// two spectra or by swapping both spectra's tracers at once, so of those four
/// orderings we keep the lexicographically smallest.
pub fn canonical_masks<'a>(masks: [&'a str; 4]) -> [&'a str; 4] {
    let [m1, m2, m3, m4] = masks;
    [
        [m1, m2, m3, m4],
        [m3, m4, m1, m2],
        [m2, m1, m4, m3],
        [m4, m3, m2, m1],
    ]
    .into_iter()
    .min()
    .unwrap_or(masks)
}

/// `cw__{mask1}__{mask2}__{mask3}__{mask4}.fits`, masks in canonical order.
pub fn workspace_file_name(masks: [&str; 4]) -> String {
    cwsp_file_name(canonical_masks(masks))
}

fn cwsp_file_name([m1, m2, m3, m4]: [&str; 4]) -> String {
    format!("{CWSP_PREFIX}__{m1}__{m2}__{m3}__{m4}.{CWSP_EXT}")
}

fn task_masks<'r>(registry: &'r Registry, task: &CovTask) -> Result<[&'r str; 4], Error> {
    let [t1, t2, t3, t4] = task.tracers();
    Ok([
        registry.mask_name(t1)?,
        registry.mask_name(t2)?,
        registry.mask_name(t3)?,
        registry.mask_name(t4)?,
    ])
}

/// Shared workspace (under `cov_dir`) that owns `task`; also the path its lock derives from.
pub fn workspace_path(registry: &Registry, task: &CovTask, cov_dir: &Path) -> Result<PathBuf, Error> {
    Ok(cov_dir.join(workspace_file_name(task_masks(registry, task)?)))
}

/// Workspace file the covariance job for `task` writes itself: masks in task order.
/// Differs from [`workspace_path`] for orderings that were collapsed.
pub fn task_workspace_path(
    registry: &Registry,
    task: &CovTask,
    cov_dir: &Path,
) -> Result<PathBuf, Error> {
    Ok(cov_dir.join(cwsp_file_name(task_masks(registry, task)?)))
}

/// Partition covariance `tasks` by the workspace file (under `cov_dir`) they need.
pub fn group_by_workspace(
    registry: &Registry,
    tasks: &[CovTask],
    cov_dir: &Path,
) -> Result<WorkspaceGroups, Error> {
    let mut groups = WorkspaceGroups::default();
    for task in tasks {
        groups.insert(workspace_path(registry, task, cov_dir)?, task.clone());
    }
    log::debug!(
        "{} covariance tasks share {} workspaces",
        tasks.len(),
        groups.len()
    );
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracer_registry::tests::{registry, TWO_SURVEYS};

    fn cov(t: [&str; 4]) -> CovTask {
        CovTask::new(t.map(str::to_owned))
    }

    #[test]
    fn identical_masks_share_a_workspace() -> Result<(), Error> {
        let reg = registry(TWO_SURVEYS);
        // A__0 and A__1 both use mask mA:
        let tasks = [
            cov(["A__0", "B__2", "A__0", "B__2"]),
            cov(["A__1", "B__2", "A__0", "B__2"]),
            cov(["A__0", "A__0", "B__2", "B__2"]),
        ];
        let groups = group_by_workspace(&reg, &tasks, Path::new("/out/cov"))?;
        assert_eq!(groups.len(), 2);

        let shared = groups
            .get(Path::new("/out/cov/cw__mA__mB__mA__mB.fits"))
            .expect("group for (mA, mB, mA, mB)");
        assert_eq!(shared.tasks, tasks[..2].to_vec());
        assert_eq!(shared.file_name(), "cw__mA__mB__mA__mB.fits");

        let other: Vec<_> = groups.iter().map(|g| g.path.clone()).collect();
        assert_eq!(other[1], PathBuf::from("/out/cov/cw__mA__mA__mB__mB.fits"));
        Ok(())
    }

    #[test]
    fn equivalent_orderings_collapse() -> Result<(), Error> {
        let reg = registry(TWO_SURVEYS);
        let tasks = [
            cov(["A__0", "B__2", "A__0", "B__2"]),
            cov(["B__2", "A__0", "B__2", "A__0"]),
        ];
        let groups = group_by_workspace(&reg, &tasks, Path::new("cov"))?;
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.iter().next().map(|g| g.tasks.len()), Some(2));
        Ok(())
    }

    #[test]
    fn jobs_write_task_order_workspaces() -> Result<(), Error> {
        let reg = registry(TWO_SURVEYS);
        let task = cov(["B__2", "A__0", "B__2", "A__0"]);
        let dir = Path::new("/out/cov");
        assert_eq!(
            workspace_path(&reg, &task, dir)?,
            PathBuf::from("/out/cov/cw__mA__mB__mA__mB.fits")
        );
        assert_eq!(
            task_workspace_path(&reg, &task, dir)?,
            PathBuf::from("/out/cov/cw__mB__mA__mB__mA.fits")
        );
        Ok(())
    }

    #[test]
    fn canonical_masks_is_invariant_under_symmetries() {
        let base = ["m1", "m2", "m3", "m4"];
        let expected = canonical_masks(base);
        for perm in [
            ["m3", "m4", "m1", "m2"],
            ["m2", "m1", "m4", "m3"],
            ["m4", "m3", "m2", "m1"],
        ] {
            assert_eq!(canonical_masks(perm), expected);
        }
        // a single swap inside one spectrum is a different block:
        assert_ne!(canonical_masks(["m2", "m1", "m3", "m4"]), expected);
    }

    #[test]
    fn unknown_tracer_fails() {
        let reg = registry(TWO_SURVEYS);
        let tasks = [cov(["A__0", "B__2", "A__0", "Z__9"])];
        let err = group_by_workspace(&reg, &tasks, Path::new("cov")).unwrap_err();
        assert!(matches!(err, Error::UnknownTracer(name) if name == "Z__9"));
    }
}
