//! Serde model of the YAML data file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use crate::{Error, MapperClass};

const DEFAULT_NSIDE: u32 = 4096;
const DEFAULT_COORDS: &str = "C";

/// Top-level data configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Root of every artifact the launcher and its jobs produce
    pub output: PathBuf,
    /// Tracers in the order they appear in the file
    #[serde(deserialize_with = "ordered_tracers")]
    pub tracers: Vec<(String, TracerConfig)>,
    /// Requested Cls, keyed by "Bare1-Bare2"
    #[serde(default)]
    pub cls: BTreeMap<String, ClsEntry>,
    #[serde(default)]
    pub recompute: Recompute,
    #[serde(default)]
    pub sphere: Sphere,
}

impl Config {
    /// Parse a YAML document. A relative `output` is resolved against `base_dir`.
    pub fn from_yaml(text: &str, base_dir: &Path) -> Result<Self, Error> {
        let mut config: Config = serde_yaml::from_str(text)?;
        if config.output.is_relative() {
            config.output = base_dir.join(&config.output);
        }
        Ok(config)
    }
}

/// Configuration of a single tracer.
#[derive(Debug, Clone, Deserialize)]
pub struct TracerConfig {
    pub mapper_class: MapperClass,
    pub mask_name: String,
    pub nside: Option<u32>,
    pub coords: Option<String>,
    /// mapper-specific settings the launcher passes through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClCompute {
    All,
    Auto,
    Cross,
    None,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClsEntry {
    pub compute: ClCompute,
}

/// Flags forcing outputs to be recomputed even if present.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct Recompute {
    pub cls: bool,
    pub cov: bool,
    pub mcm: bool,
    pub cmcm: bool,
}

impl Recompute {
    /// Cls are recomputed if they or their mode-coupling matrices are.
    pub fn cls(&self) -> bool {
        self.cls || self.mcm
    }

    /// Covariances are recomputed if they or their covariance workspaces are.
    pub fn cov(&self) -> bool {
        self.cov || self.cmcm
    }
}

/// Pixelization defaults for tracers that don't set their own.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Sphere {
    pub nside: u32,
    pub coords: String,
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            nside: DEFAULT_NSIDE,
            coords: DEFAULT_COORDS.to_owned(),
        }
    }
}

// serde_yaml::Mapping keeps insertion order, a plain map would not:
fn ordered_tracers<'de, D>(d: D) -> Result<Vec<(String, TracerConfig)>, D::Error>
where
    D: Deserializer<'de>,
{
    let mapping = serde_yaml::Mapping::deserialize(d)?;
    let mut tracers = Vec::with_capacity(mapping.len());
    for (k, v) in mapping {
        let name = k
            .as_str()
            .ok_or_else(|| D::Error::custom(Error::InvalidTracerKey))?
            .to_owned();
        let tracer = serde_yaml::from_value(v)
            .map_err(|e| D::Error::custom(format!("tracer {name}: {e}")))?;
        tracers.push((name, tracer));
    }
    Ok(tracers)
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = "
output: out
tracers:
  Z__1: {mapper_class: MapperNVSS, mask_name: mZ, data_catalog: nvss.fits}
  A__0: {mapper_class: MapperDESY1wl, mask_name: mA, nside: 1024}
cls:
  Z-A: {compute: all}
recompute: {cmcm: true}
";

    #[test]
    fn parses_in_file_order() -> Result<(), Error> {
        let config = Config::from_yaml(YAML, Path::new("/data"))?;
        assert_eq!(config.output, PathBuf::from("/data/out"));
        let names: Vec<&str> = config.tracers.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["Z__1", "A__0"]);
        assert_eq!(config.tracers[1].1.nside, Some(1024));
        assert!(config.tracers[0].1.extra.contains_key("data_catalog"));
        assert_eq!(config.cls["Z-A"].compute, ClCompute::All);
        assert!(config.recompute.cov());
        assert!(!config.recompute.cls());
        assert_eq!(config.sphere.nside, 4096);
        Ok(())
    }

    #[test]
    fn rejects_unknown_compute() {
        let yaml = YAML.replace("compute: all", "compute: some");
        assert!(Config::from_yaml(&yaml, Path::new("/")).is_err());
    }

    #[test]
    fn rejects_unknown_mapper() {
        let yaml = YAML.replace("MapperNVSS", "MapperFoo");
        let err = Config::from_yaml(&yaml, Path::new("/")).unwrap_err();
        assert!(err.to_string().contains("MapperFoo"));
    }
}
