use std::fmt::Display;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::artifact::{read_artifact, save_artifact, Artifact, LibraryError};
use crate::lock::{try_acquire, LockOutcome};
use crate::Error;

/// Number of hex digits of the fingerprint shown in logs.
const FINGERPRINT_LEN: usize = 16;

/// Identifies a cached artifact by what it was computed from,
/// not by the object that computed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    name: String,
    /// in the order they were added; file names follow this order
    params: Vec<(String, String)>,
    ext: String,
}

impl CacheKey {
    /// Create a key with a human-readable `name` and file extension `ext`.
    pub fn new(name: impl Into<String>, ext: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            ext: ext.into(),
        }
    }

    /// Add a parameter the artifact depends on. Setting a key twice keeps the last value.
    pub fn param(mut self, k: impl Into<String>, v: impl Display) -> Self {
        let (k, v) = (k.into(), v.to_string());
        match self.params.iter_mut().find(|(key, _)| *key == k) {
            Some(existing) => existing.1 = v,
            None => self.params.push((k, v)),
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hex SHA-256 over name and parameters. Parameter order does not matter.
    pub fn fingerprint(&self) -> String {
        let mut params: Vec<_> = self.params.iter().collect();
        params.sort();
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        for (k, v) in params {
            hasher.update(b"\0");
            hasher.update(k.as_bytes());
            hasher.update(b"=");
            hasher.update(v.as_bytes());
        }
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    /// `{name}_{k1}{v1}_{k2}{v2}.{ext}`, e.g. `mask_mA_coordC_ns4096.fits.gz`;
    /// the names the jobs themselves write.
    pub fn file_name(&self) -> String {
        let mut name = self.name.clone();
        for (k, v) in &self.params {
            name.push('_');
            name.push_str(k);
            name.push_str(v);
        }
        name.push('.');
        name.push_str(&self.ext);
        name
    }

    fn short_fingerprint(&self) -> String {
        let mut fp = self.fingerprint();
        fp.truncate(FINGERPRINT_LEN);
        fp
    }
}

/// Directory of artifacts addressed by [`CacheKey`].
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    root: PathBuf,
}

impl ArtifactCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the artifact for `key` lives.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.path_for(key).exists()
    }

    /// Return the stored artifact for `key`, or compute and store it.
    ///
    /// If another process holds the lock for this artifact the computed value
    /// is returned without being written; the lock owner writes it.
    pub fn fetch_or_compute<A, F>(&self, key: &CacheKey, compute: F) -> Result<A, Error>
    where
        A: Artifact,
        F: FnOnce() -> Result<A, LibraryError>,
    {
        let path = self.path_for(key);
        if path.exists() {
            log::debug!("cache hit for {} [{}] at {path:?}", key.name(), key.short_fingerprint());
            return read_artifact(&path);
        }

        log::debug!("cache miss for {} [{}]; computing", key.name(), key.short_fingerprint());
        let artifact = compute().map_err(|source| Error::ArtifactWrite {
            path: path.clone(),
            source,
        })?;

        std::fs::create_dir_all(&self.root).map_err(|e| Error::io(&self.root, e))?;
        match try_acquire(&path)? {
            LockOutcome::Acquired(lock) => {
                let saved = save_artifact(&artifact, &path);
                lock.release()?;
                saved?;
            }
            LockOutcome::Held => {
                log::info!("{path:?} is being written by another process; not saving");
            }
        }
        Ok(artifact)
    }
}
