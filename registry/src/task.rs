use std::fmt;

/// An ordered tuple of tracer names: 2 for a power spectrum, 4 for a covariance block.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Task<const N: usize>([String; N]);

/// Power spectrum between two tracers.
pub type ClTask = Task<2>;
/// Covariance block between two power spectra.
pub type CovTask = Task<4>;

impl<const N: usize> Task<N> {
    pub fn new(tracers: [String; N]) -> Self {
        Self(tracers)
    }

    pub fn tracers(&self) -> &[String; N] {
        &self.0
    }

    /// `prefix` followed by the tracer names, joined by '_', e.g. "cl_A__0_B__2".
    pub fn label(&self, prefix: &str) -> String {
        let mut label = String::with_capacity(prefix.len() + N * 16);
        label.push_str(prefix);
        for tr in &self.0 {
            label.push('_');
            label.push_str(tr);
        }
        label
    }
}

impl ClTask {
    pub fn pair(tr1: &str, tr2: &str) -> Self {
        Self([tr1.to_owned(), tr2.to_owned()])
    }
}

impl CovTask {
    /// Covariance between the spectra `a` and `b`.
    pub fn from_cls(a: &ClTask, b: &ClTask) -> Self {
        let [a1, a2] = a.tracers().clone();
        let [b1, b2] = b.tracers().clone();
        Self([a1, a2, b1, b2])
    }
}

impl<const N: usize> fmt::Display for Task<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

/// Sort tasks and drop exact duplicates, so the same list in any
/// order produces the same output.
pub fn canonicalize<T: Ord>(mut tasks: Vec<T>) -> Vec<T> {
    tasks.sort();
    tasks.dedup();
    tasks
}
