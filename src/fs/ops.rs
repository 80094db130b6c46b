use std::path::Path;

use anyhow::Result;

/// Add execute permission for everyone who can read `path`; works for unix and windows.
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)?.permissions();
        let mode = perms.mode();
        // copy each read bit into the matching execute bit:
        perms.set_mode(mode | ((mode & 0o444) >> 2));
        std::fs::set_permissions(path, perms)?;
    }

    // windows runs scripts by interpreter, there is no execute bit to set.
    #[cfg(windows)]
    let _ = path;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[cfg(unix)]
    #[test]
    fn test_make_executable() -> Result<()> {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir()?;
        let script = dir.path().join("batch.sh");
        fs::write(&script, "#!/usr/bin/env bash\n")?;
        fs::set_permissions(&script, fs::Permissions::from_mode(0o640))?;

        make_executable(&script)?;

        let mode = fs::metadata(&script)?.permissions().mode() & 0o777;
        assert_eq!(mode, 0o750);
        Ok(())
    }
}
