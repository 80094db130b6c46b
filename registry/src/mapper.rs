use cache::CacheKey;
use serde::Deserialize;

use crate::{Error, Spin};

/// Physical kind of field a mapper produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Galaxy or radio source number counts
    Density,
    /// Cosmic shear from galaxy shapes
    Shear,
    /// CMB lensing convergence
    Convergence,
    /// Thermal Sunyaev-Zel'dovich Compton-y
    Tsz,
}

impl FieldKind {
    pub fn spin(self) -> Spin {
        match self {
            Self::Shear => Spin::Two,
            Self::Density | Self::Convergence | Self::Tsz => Spin::Zero,
        }
    }

    pub fn noise(self) -> NoiseModel {
        match self {
            Self::Density => NoiseModel::ShotNoise,
            Self::Shear => NoiseModel::ShapeNoise,
            Self::Convergence => NoiseModel::Reconstruction,
            Self::Tsz => NoiseModel::HalfMissionDifference,
        }
    }
}

/// How a mapper estimates the noise bias of its map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseModel {
    /// Analytic Poisson noise from source counts
    ShotNoise,
    /// Analytic noise from intrinsic ellipticity dispersion
    ShapeNoise,
    /// Read from the released reconstruction noise curve
    Reconstruction,
    /// Estimated from the difference of half-mission maps
    HalfMissionDifference,
}

/// Every mapper the launcher knows how to schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum MapperClass {
    Nvss,
    DesY1Gc,
    Dels,
    EBoss,
    DesY1Wl,
    Kids1000,
    P18Cmbk,
    ActK,
    NpipeTsz,
    P15Tsz,
}

const CLASS_PREFIX: &str = "Mapper";

impl MapperClass {
    const ALL: [MapperClass; 10] = [
        Self::Nvss,
        Self::DesY1Gc,
        Self::Dels,
        Self::EBoss,
        Self::DesY1Wl,
        Self::Kids1000,
        Self::P18Cmbk,
        Self::ActK,
        Self::NpipeTsz,
        Self::P15Tsz,
    ];

    pub fn field(self) -> FieldKind {
        use MapperClass::*;
        match self {
            Nvss | DesY1Gc | Dels | EBoss => FieldKind::Density,
            DesY1Wl | Kids1000 => FieldKind::Shear,
            P18Cmbk | ActK => FieldKind::Convergence,
            NpipeTsz | P15Tsz => FieldKind::Tsz,
        }
    }

    /// Name of the class in configuration files, e.g. "MapperNVSS".
    pub fn class_name(self) -> &'static str {
        use MapperClass::*;
        match self {
            Nvss => "MapperNVSS",
            DesY1Gc => "MapperDESY1gc",
            Dels => "MapperDELS",
            EBoss => "MappereBOSS",
            DesY1Wl => "MapperDESY1wl",
            Kids1000 => "MapperKiDS1000",
            P18Cmbk => "MapperP18CMBK",
            ActK => "MapperACTk",
            NpipeTsz => "MapperNPIPEtSZ",
            P15Tsz => "MapperP15tSZ",
        }
    }

    /// Short name used in cached map file names, e.g. "NVSS".
    pub fn map_name(self) -> &'static str {
        let name = self.class_name();
        name.strip_prefix(CLASS_PREFIX).unwrap_or(name)
    }
}

impl TryFrom<String> for MapperClass {
    type Error = Error;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|c| c.class_name() == s)
            .ok_or(Error::UnknownMapperClass(s))
    }
}

/// What the orchestration layer needs to know about a tracer's mapper.
/// Map I/O itself happens in the spawned jobs.
pub trait Mapper {
    fn class(&self) -> MapperClass;
    fn mask_name(&self) -> &str;
    fn nside(&self) -> u32;
    fn coords(&self) -> &str;

    fn spin(&self) -> Spin {
        self.class().field().spin()
    }

    fn noise(&self) -> NoiseModel {
        self.class().field().noise()
    }

    /// Cache key of the pixelized signal map.
    fn signal_key(&self) -> CacheKey {
        CacheKey::new(format!("{}_signal_map", self.class().map_name()), "fits.gz")
            .param("coord", self.coords())
            .param("ns", self.nside())
    }

    /// Cache key of the pixelized mask.
    fn mask_key(&self) -> CacheKey {
        CacheKey::new(format!("mask_{}", self.mask_name()), "fits.gz")
            .param("coord", self.coords())
            .param("ns", self.nside())
    }
}
