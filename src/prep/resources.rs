use std::fmt;

use crate::settings::Resources;

/// Jobs one node gets through per day: about a minute each at nside 1024.
pub const JOBS_PER_DAY: f64 = 1440.0;

/// Human-readable sizing of a submission. Informational only; nothing enforces it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceAnnotation {
    /// Units of work run back to back by one submission
    pub jobs: usize,
    /// Predicted peak memory (GB) of the largest unit
    pub estimated_mem: u32,
}

impl ResourceAnnotation {
    pub fn new(jobs: usize, estimated_mem: u32) -> Self {
        Self {
            jobs,
            estimated_mem,
        }
    }

    /// Expected wall time in days.
    pub fn days(&self) -> f64 {
        self.jobs as f64 / JOBS_PER_DAY
    }

    /// Whether the requested resources cover the predicted memory.
    pub fn fits(&self, resources: &Resources) -> bool {
        self.estimated_mem <= resources.cores * resources.mem_per_core
    }

    /// Warn if a submission is likely to run out of memory.
    pub fn check(&self, label: &str, resources: &Resources) {
        if !self.fits(resources) {
            log::warn!(
                "job '{label}' may need ~{}GB but requests {}x{}GB",
                self.estimated_mem,
                resources.cores,
                resources.mem_per_core,
            );
        }
    }
}

/// "(~1.5days)"
impl fmt::Display for ResourceAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(~{:.1}days)", self.days())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_time_from_throughput() {
        let ann = ResourceAnnotation::new(2160, 47);
        assert_eq!(ann.to_string(), "(~1.5days)");
        assert_eq!(ResourceAnnotation::new(0, 0).to_string(), "(~0.0days)");
    }

    #[test]
    fn memory_fit() {
        let small = Resources {
            cores: 4,
            mem_per_core: 7,
        };
        assert!(ResourceAnnotation::new(1, 28).fits(&small));
        assert!(!ResourceAnnotation::new(1, 94).fits(&small));
    }
}
