//! Memory model for sizing job submissions.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Registry, Spin};

/// Which kind of job is being sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Cls,
    Cov,
}

impl FromStr for Mode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cls" => Ok(Self::Cls),
            "cov" => Ok(Self::Cov),
            other => Err(Error::InvalidMode(other.to_owned())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cls => write!(f, "cls"),
            Self::Cov => write!(f, "cov"),
        }
    }
}

/// Memory in GB contributed by one tracer of each spin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinCosts {
    pub spin0: u32,
    pub spin2: u32,
}

impl SpinCosts {
    pub fn get(&self, spin: Spin) -> u32 {
        match spin {
            Spin::Zero => self.spin0,
            Spin::Two => self.spin2,
        }
    }

    fn set(&mut self, spin: Spin, gb: u32) {
        match spin {
            Spin::Zero => self.spin0 = gb,
            Spin::Two => self.spin2 = gb,
        }
    }
}

/// Per-spin memory costs, calibrated for nside 4096.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryModel {
    cls: SpinCosts,
    cov: SpinCosts,
}

impl Default for MemoryModel {
    fn default() -> Self {
        Self {
            cls: SpinCosts { spin0: 16, spin2: 25 },
            cov: SpinCosts { spin0: 16, spin2: 47 },
        }
    }
}

impl MemoryModel {
    pub fn costs(&self, mode: Mode) -> SpinCosts {
        match mode {
            Mode::Cls => self.cls,
            Mode::Cov => self.cov,
        }
    }

    /// Override the cost of one spin in one mode.
    pub fn set_cost(&mut self, mode: Mode, spin: Spin, gb: u32) {
        match mode {
            Mode::Cls => self.cls.set(spin, gb),
            Mode::Cov => self.cov.set(spin, gb),
        }
    }

    /// Covariance jobs must never be modelled as cheaper than Cl jobs.
    pub fn validate(&self) -> Result<(), Error> {
        for spin in [Spin::Zero, Spin::Two] {
            if self.cov.get(spin) < self.cls.get(spin) {
                return Err(Error::InconsistentCosts(spin.as_int()));
            }
        }
        Ok(())
    }

    /// Predicted memory (GB) of a job over `tracers`: the sum of their per-spin costs.
    pub fn estimate_memory<S: AsRef<str>>(
        &self,
        registry: &Registry,
        tracers: &[S],
        mode: Mode,
    ) -> Result<u32, Error> {
        let costs = self.costs(mode);
        let mut mem = 0;
        for tr in tracers {
            mem += costs.get(registry.spin(tr.as_ref())?);
        }
        Ok(mem)
    }
}
