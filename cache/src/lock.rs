use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::Error;

/// Extension appended to an artifact path to form its lock file.
pub const LOCK_EXT: &str = "lock";

/// Result of trying to take ownership of an artifact.
#[derive(Debug)]
pub enum LockOutcome {
    /// We created the lock file and now own the artifact.
    Acquired(LockFile),
    /// Some other process already holds the lock; try again next time.
    Held,
}

/// Handle on a lock file created by [`try_acquire`].
///
/// Dropping the handle does *not* remove the file: the launcher creates locks
/// that are removed later by the job script it submits, in a different process.
/// In-process owners call [`LockFile::release`] explicitly.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Path of the lock file on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the lock file. A lock that is already gone is not an error.
    pub fn release(self) -> Result<(), Error> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::warn!("lock {:?} was already removed", self.path);
                Ok(())
            }
            Err(e) => Err(Error::io(self.path, e)),
        }
    }
}

/// `artifact` + ".lock", e.g. `cov/cw__a__b__a__b.fits.lock`.
pub fn lock_path(artifact: &Path) -> PathBuf {
    let mut s = OsString::from(artifact.as_os_str());
    s.push(".");
    s.push(LOCK_EXT);
    PathBuf::from(s)
}

/// true if a lock file exists for `artifact`.
pub fn is_locked(artifact: &Path) -> bool {
    lock_path(artifact).exists()
}

/// Atomically create the lock file for `artifact`.
///
/// Uses exclusive create, so of two processes racing for the same artifact
/// exactly one sees `Acquired`.
pub fn try_acquire(artifact: &Path) -> Result<LockOutcome, Error> {
    let path = lock_path(artifact);
    match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(_) => {
            log::debug!("acquired lock {path:?}");
            Ok(LockOutcome::Acquired(LockFile { path }))
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            log::debug!("lock {path:?} is held elsewhere");
            Ok(LockOutcome::Held)
        }
        Err(e) => Err(Error::io(path, e)),
    }
}

/// All lock files directly inside `dir`, sorted by path.
pub fn find_locks(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut locks = Vec::new();
    if !dir.is_dir() {
        return Ok(locks);
    }
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == LOCK_EXT) {
            locks.push(path);
        }
    }
    locks.sort();
    Ok(locks)
}
