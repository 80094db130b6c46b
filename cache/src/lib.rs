//! Filesystem coordination shared between the launcher and the jobs it spawns.
//!
//! Nothing here talks to a scheduler. Cooperation between processes is purely
//! advisory: a zero-byte `.lock` file next to an artifact means some process has
//! taken ownership of computing it, and artifacts that fail mid-write are removed
//! so the next reader never sees a truncated file.

/// Zero-byte lock files next to artifacts
mod lock;
pub use lock::{find_locks, is_locked, lock_path, try_acquire, LockFile, LockOutcome, LOCK_EXT};

/// Save/read with partial-write recovery
mod artifact;
pub use artifact::{read_artifact, save_artifact, Artifact, LibraryError};

/// Fingerprint-keyed artifact store
mod store;
pub use store::{ArtifactCache, CacheKey};

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to write artifact {path:?}: {source}")]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: LibraryError,
    },
    #[error("Failed to read artifact {path:?}: {source}")]
    ArtifactRead {
        path: PathBuf,
        #[source]
        source: LibraryError,
    },
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
