use std::fmt;

use crate::{Error, Mapper, MapperClass, Sphere, TracerConfig, BARE_DELIM};

/// Tensor rank of a field; spin-2 fields cost more to process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Spin {
    Zero,
    Two,
}

impl Spin {
    pub fn as_int(self) -> u8 {
        match self {
            Self::Zero => 0,
            Self::Two => 2,
        }
    }
}

impl TryFrom<u8> for Spin {
    type Error = Error;
    fn try_from(s: u8) -> Result<Self, Self::Error> {
        match s {
            0 => Ok(Self::Zero),
            2 => Ok(Self::Two),
            other => Err(Error::UnsupportedSpin(other)),
        }
    }
}

impl fmt::Display for Spin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_int())
    }
}

/// "DESgc__0" -> "DESgc". Names without a bin are their own bare name.
pub fn bare_name(name: &str) -> &str {
    name.split(BARE_DELIM).next().unwrap_or(name)
}

/// A resolved tracer. Immutable once built from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracer {
    name: String,
    class: MapperClass,
    mask_name: String,
    nside: u32,
    coords: String,
}

impl Tracer {
    pub fn new(name: &str, config: &TracerConfig, sphere: &Sphere) -> Self {
        Self {
            name: name.to_owned(),
            class: config.mapper_class,
            mask_name: config.mask_name.clone(),
            nside: config.nside.unwrap_or(sphere.nside),
            coords: config.coords.clone().unwrap_or_else(|| sphere.coords.clone()),
        }
    }

    /// Full identifier, e.g. "DESgc__0".
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Survey-level identity, e.g. "DESgc".
    pub fn bare_name(&self) -> &str {
        bare_name(&self.name)
    }
}

impl Mapper for Tracer {
    fn class(&self) -> MapperClass {
        self.class
    }

    fn mask_name(&self) -> &str {
        &self.mask_name
    }

    fn nside(&self) -> u32 {
        self.nside
    }

    fn coords(&self) -> &str {
        &self.coords
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_names() {
        assert_eq!(bare_name("DESgc__0"), "DESgc");
        assert_eq!(bare_name("DESwl__3"), "DESwl");
        assert_eq!(bare_name("P18kappa"), "P18kappa");
    }

    #[test]
    fn spin_from_int() {
        assert_eq!(Spin::try_from(2).ok(), Some(Spin::Two));
        assert!(matches!(Spin::try_from(1), Err(Error::UnsupportedSpin(1))));
    }
}
