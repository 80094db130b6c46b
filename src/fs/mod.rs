use std::path::{Path, PathBuf};
use std::fs;

use anyhow::{Context, Result};

use cache::LockOutcome;
use util::{path_str, PathEncodingError};

/// Utility fns
mod ops;

/// Defines fns for creating common paths in the output directory
mod paths;
pub use paths::{CL_PREFIX, COV_PREFIX};

/// Dealing with the stored copy of the data file
mod config_snapshot;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Specified output directory \"{0}\" is not a directory")]
    NotDirectory(String),
    #[error("Can't perform IO operation: \"{0}\" is not whitelisted")]
    NotWhitelisted(String),
    #[error("Data file differs from the copy stored in {0}; pass --override-yaml to replace it")]
    ConfigChanged(String),
}

/// All file operations in the crate should go through this struct.
///
/// All destructive operations check that the path in question is a child of the
/// single whitelisted prefix (the output dir), otherwise they will not be performed.
/// Note that generated batch scripts can break this rule when they run; what they
/// delete is limited to lock files and workspaces we derived ourselves.
#[derive(Debug)]
pub struct Fs {
    /// The directory we are allowed to modify
    output_prefix: PathBuf,
}

impl Fs {
    /// Create a new `Fs` with the given output directory.
    pub fn new(output_prefix: &Path) -> Self {
        Self {
            output_prefix: output_prefix.to_path_buf(),
        }
    }

    /// The (canonicalized, once `ensure_output_dir_exists` has run) output directory.
    pub fn output_prefix(&self) -> &Path {
        &self.output_prefix
    }

    /// Check whether output dir exists, and create it if not.
    pub fn ensure_output_dir_exists(&mut self) -> Result<()> {
        if !self.output_prefix.exists() {
            log::info!(
                "Output directory {:?} doesn't exist. Creating.",
                self.output_prefix
            );
            fs::create_dir_all(&self.output_prefix).context("creating output directory")?;
        } else if !self.output_prefix.is_dir() {
            return Err(Error::NotDirectory(path_str(&self.output_prefix)?.to_owned()).into());
        } else {
            log::debug!("Output directory {:?} already exists.", self.output_prefix);
        }

        self.output_prefix = self.output_prefix.canonicalize()?;
        Ok(())
    }

    /// Check if path exists on disk.
    pub fn exists<T: AsRef<Path>>(&self, path: T) -> bool {
        let path = path.as_ref();
        path.exists() || path.is_symlink()
    }

    /// Create a directory (uses `std::fs::create_dir_all`, so an entire tree of dirs can be created).
    pub fn create_dir<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        let path = path.as_ref();
        self.check_whitelist(path)?;
        fs::create_dir_all(path).context("creating dir")?;
        Ok(())
    }

    /// Write entire str to a file.
    pub fn write_file<T: AsRef<Path>>(&self, path: T, text: &str) -> Result<()> {
        let path = path.as_ref();
        self.check_whitelist(path)?;
        fs::write(path, text).context("writing file")?;
        Ok(())
    }

    /// Write a script and mark it executable.
    pub fn write_script<T: AsRef<Path>>(&self, path: T, text: &str) -> Result<()> {
        let path = path.as_ref();
        self.write_file(path, text)?;
        ops::make_executable(path).with_context(|| format!("making {path:?} executable"))?;
        Ok(())
    }

    /// Create a file, and return a writable `File` handle.
    pub fn create_file<T: AsRef<Path>>(&self, path: T) -> Result<fs::File> {
        let path = path.as_ref();
        self.check_whitelist(path)?;
        let f = fs::File::create(path).context("creating file")?;
        Ok(f)
    }

    /// Delete a file.
    pub fn delete_file<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        let path = path.as_ref();
        self.check_whitelist(path)?;
        fs::remove_file(path).context("deleting file")?;
        Ok(())
    }

    /// Read entire file into a String.
    pub fn read_to_buf<T: AsRef<Path>>(&self, path: T, strbuf: &mut String) -> Result<()> {
        read_into(path.as_ref(), strbuf)
    }

    /// Read the data file. It may live anywhere, so this needs no `Fs` yet.
    pub fn read_config(path: &Path, strbuf: &mut String) -> Result<()> {
        read_into(path, strbuf)
    }

    /// Try to take ownership of `artifact` by exclusively creating its lock file.
    pub fn acquire_lock<T: AsRef<Path>>(&self, artifact: T) -> Result<LockOutcome> {
        let artifact = artifact.as_ref();
        self.check_whitelist(artifact)?;
        Ok(cache::try_acquire(artifact)?)
    }

    /// Lock files directly inside `dir`.
    pub fn find_locks<T: AsRef<Path>>(&self, dir: T) -> Result<Vec<PathBuf>> {
        Ok(cache::find_locks(dir.as_ref())?)
    }

    /// Whether some process has claimed `artifact`.
    pub fn is_locked<T: AsRef<Path>>(&self, artifact: T) -> bool {
        cache::is_locked(artifact.as_ref())
    }

    fn is_whitelisted<T: AsRef<Path>>(&self, path: T) -> bool {
        path.as_ref().starts_with(&self.output_prefix)
    }

    fn check_whitelist(&self, path: &Path) -> Result<()> {
        if !self.is_whitelisted(path) {
            Err(Error::NotWhitelisted(path.to_str().ok_or(PathEncodingError)?.to_owned()).into())
        } else {
            Ok(())
        }
    }
}

fn read_into(path: &Path, strbuf: &mut String) -> Result<()> {
    use std::io::Read;
    strbuf.clear();
    let cap = fs::metadata(path)?.len() as usize;
    if cap > strbuf.len() {
        strbuf.reserve(cap - strbuf.len());
    }
    let mut f = fs::File::open(path)?;
    f.read_to_string(strbuf)?;
    Ok(())
}
