//! Utility functions for dealing with the stored copy of the data file.

use anyhow::Result;

use util::path_str;

use super::{Error, Fs};

impl Fs {
    /// Store `config_text` as `$OUTPUT/data.yml`.
    ///
    /// Every job reads its configuration from the data file, so outputs written
    /// under one configuration must not be mixed with another. If a different copy
    /// is already stored we fail, unless `override_yaml` is set.
    pub fn store_config_snapshot(
        &self,
        config_text: &str,
        override_yaml: bool,
        strbuf: &mut String,
    ) -> Result<()> {
        let snapshot = self.data_yml();
        if self.exists(&snapshot) {
            self.read_to_buf(&snapshot, strbuf)?;
            if strbuf.as_str() == config_text {
                log::debug!("stored data file is up to date");
                return Ok(());
            }
            if !override_yaml {
                return Err(Error::ConfigChanged(path_str(&snapshot)?.to_owned()).into());
            }
            log::warn!("overriding stored data file {snapshot:?}");
            self.delete_file(&snapshot)?;
        }
        self.write_file(&snapshot, config_text)?;
        Ok(())
    }
}
