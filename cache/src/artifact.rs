use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::Error;

/// Message fragment the numeric library uses when a write aborts midway.
const WRITE_FAILURE: &str = "Error writing";
/// Message fragment the numeric library uses when a file cannot be decoded.
const READ_FAILURE: &str = "Error reading";

/// Error raised by the library that serializes an artifact.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct LibraryError(pub String);

impl LibraryError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// The write was interrupted and the file on disk is truncated.
    pub fn is_partial_write(&self) -> bool {
        self.0.contains(WRITE_FAILURE)
    }

    /// The file on disk could not be decoded.
    pub fn is_corrupt_read(&self) -> bool {
        self.0.contains(READ_FAILURE)
    }
}

/// Something expensive that is computed once and stored on disk,
/// e.g. a coupling workspace or a covariance workspace.
pub trait Artifact: Sized {
    fn write_to(&self, path: &Path) -> Result<(), LibraryError>;
    fn read_from(path: &Path) -> Result<Self, LibraryError>;
}

/// Write `artifact` to `path` unless a file is already there.
///
/// A partial write is deleted and retried exactly once. A second failure
/// (or any other library error) is returned to the caller.
pub fn save_artifact<A: Artifact>(artifact: &A, path: &Path) -> Result<(), Error> {
    // another process may have finished writing it in the meantime:
    if path.exists() {
        log::debug!("{path:?} already exists; not writing");
        return Ok(());
    }

    match artifact.write_to(path) {
        Ok(()) => Ok(()),
        Err(e) if e.is_partial_write() => {
            log::warn!("partial write of {path:?} ({e}); removing and retrying once");
            remove_if_exists(path)?;
            artifact.write_to(path).map_err(|source| {
                if let Err(cleanup) = remove_if_exists(path) {
                    log::error!("could not remove failed artifact: {cleanup}");
                }
                Error::ArtifactWrite {
                    path: path.to_path_buf(),
                    source,
                }
            })
        }
        Err(source) => Err(Error::ArtifactWrite {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Read an artifact from `path`. A corrupt file is deleted before the
/// error is returned, so the next run recomputes it.
pub fn read_artifact<A: Artifact>(path: &Path) -> Result<A, Error> {
    A::read_from(path).map_err(|source| {
        if source.is_corrupt_read() {
            log::warn!("removing corrupt artifact {path:?}");
            if let Err(cleanup) = remove_if_exists(path) {
                log::error!("could not remove corrupt artifact: {cleanup}");
            }
        }
        Error::ArtifactRead {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn remove_if_exists(path: &Path) -> Result<(), Error> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::tempdir;

    /// Writes a truncated file and fails for the first `fail_writes` attempts.
    #[derive(Debug)]
    struct Flaky {
        fail_writes: Cell<u32>,
        attempts: Cell<u32>,
    }

    impl Flaky {
        fn failing(n: u32) -> Self {
            Self {
                fail_writes: Cell::new(n),
                attempts: Cell::new(0),
            }
        }
    }

    impl Artifact for Flaky {
        fn write_to(&self, path: &Path) -> Result<(), LibraryError> {
            self.attempts.set(self.attempts.get() + 1);
            if self.fail_writes.get() > 0 {
                self.fail_writes.set(self.fail_writes.get() - 1);
                fs::write(path, "trunc").map_err(|e| LibraryError::new(e.to_string()))?;
                return Err(LibraryError::new("Error writing file: disk quota"));
            }
            fs::write(path, "complete").map_err(|e| LibraryError::new(e.to_string()))
        }

        fn read_from(path: &Path) -> Result<Self, LibraryError> {
            match fs::read_to_string(path) {
                Ok(s) if s == "complete" => Ok(Flaky::failing(0)),
                _ => Err(LibraryError::new("Error reading file")),
            }
        }
    }

    #[test]
    fn partial_write_is_retried_once() -> Result<(), Error> {
        let dir = tempdir().map_err(|e| Error::io("tempdir", e))?;
        let path = dir.path().join("cw.fits");

        let flaky = Flaky::failing(1);
        save_artifact(&flaky, &path)?;
        assert_eq!(flaky.attempts.get(), 2);
        assert_eq!(fs::read_to_string(&path).ok().as_deref(), Some("complete"));
        Ok(())
    }

    #[test]
    fn second_partial_write_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cw.fits");

        let flaky = Flaky::failing(2);
        let err = save_artifact(&flaky, &path).unwrap_err();
        assert!(matches!(err, Error::ArtifactWrite { .. }));
        assert_eq!(flaky.attempts.get(), 2);
        assert!(!path.exists());
    }

    #[test]
    fn other_library_errors_are_not_retried() {
        struct Broken;
        impl Artifact for Broken {
            fn write_to(&self, _: &Path) -> Result<(), LibraryError> {
                Err(LibraryError::new("unsupported spin"))
            }
            fn read_from(_: &Path) -> Result<Self, LibraryError> {
                Ok(Broken)
            }
        }
        let dir = tempdir().unwrap();
        let err = save_artifact(&Broken, &dir.path().join("x")).unwrap_err();
        assert!(matches!(err, Error::ArtifactWrite { .. }));
    }

    #[test]
    fn existing_artifact_is_not_rewritten() -> Result<(), Error> {
        let dir = tempdir().map_err(|e| Error::io("tempdir", e))?;
        let path = dir.path().join("cw.fits");
        fs::write(&path, "complete").map_err(|e| Error::io(&path, e))?;

        let flaky = Flaky::failing(0);
        save_artifact(&flaky, &path)?;
        assert_eq!(flaky.attempts.get(), 0);
        Ok(())
    }

    #[test]
    fn corrupt_read_deletes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cw.fits");
        fs::write(&path, "trunc").unwrap();

        let err = read_artifact::<Flaky>(&path).unwrap_err();
        assert!(matches!(err, Error::ArtifactRead { .. }));
        assert!(!path.exists());
    }
}
