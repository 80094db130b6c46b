use std::collections::BTreeMap;

use util::{HashMap, HashSet};

use crate::{
    bare_name, canonicalize, ClCompute, ClTask, ClsEntry, Config, CovTask, Error, Mapper, Spin,
    Tracer, PAIR_DELIM,
};

/// Resolves tracer names from configuration and enumerates the
/// Cl and covariance tasks the configuration asks for.
#[derive(Debug)]
pub struct Registry {
    /// tracers in configuration order
    tracers: Vec<Tracer>,
    /// tracer name -> index into `tracers`
    index: HashMap<String, usize>,
    /// requested Cls keyed by "Bare1-Bare2"
    cls: BTreeMap<String, ClsEntry>,
}

impl Registry {
    /// Build a registry from parsed configuration.
    pub fn new(config: &Config) -> Result<Self, Error> {
        for key in config.cls.keys() {
            match key.split_once(PAIR_DELIM) {
                Some((a, b)) if !a.is_empty() && !b.is_empty() => (),
                _ => return Err(Error::InvalidClsPair(key.clone())),
            }
        }

        let mut tracers = Vec::with_capacity(config.tracers.len());
        let mut index = HashMap::default();
        for (name, tracer_config) in &config.tracers {
            index.insert(name.clone(), tracers.len());
            tracers.push(Tracer::new(name, tracer_config, &config.sphere));
        }
        log::debug!("registry has {} tracers", tracers.len());

        Ok(Self {
            tracers,
            index,
            cls: config.cls.clone(),
        })
    }

    /// All tracers, in configuration order.
    pub fn tracers(&self) -> &[Tracer] {
        &self.tracers
    }

    pub fn tracer(&self, name: &str) -> Result<&Tracer, Error> {
        self.index
            .get(name)
            .map(|i| &self.tracers[*i])
            .ok_or_else(|| Error::UnknownTracer(name.to_owned()))
    }

    pub fn spin(&self, name: &str) -> Result<Spin, Error> {
        Ok(self.tracer(name)?.spin())
    }

    pub fn bare_name(&self, name: &str) -> Result<&str, Error> {
        Ok(self.tracer(name)?.bare_name())
    }

    pub fn mask_name(&self, name: &str) -> Result<&str, Error> {
        Ok(self.tracer(name)?.mask_name())
    }

    /// Bare names of both tracers joined by `connector`, e.g. "DESgc_DESwl".
    pub fn bare_pair(&self, tr1: &str, tr2: &str, connector: char) -> Result<String, Error> {
        let (b1, b2) = (self.bare_name(tr1)?, self.bare_name(tr2)?);
        let mut s = String::with_capacity(b1.len() + b2.len() + 1);
        s.push_str(b1);
        s.push(connector);
        s.push_str(b2);
        Ok(s)
    }

    /// Cl tasks that build their own coupling workspace (`wsp == true`,
    /// the first pair for each mask pair) or reuse one built by another task.
    pub fn cl_tasks(&self, wsp: bool) -> Result<Vec<ClTask>, Error> {
        let mut seen = HashSet::default();
        let mut tasks = Vec::new();
        for task in self.requested_cls()? {
            let [t1, t2] = task.tracers();
            let masks = (self.mask_name(t1)?, self.mask_name(t2)?);
            if seen.insert(masks) == wsp {
                tasks.push(task);
            }
        }
        Ok(tasks)
    }

    /// Covariance tasks that build their own covariance workspace (`wsp == true`)
    /// or reuse one built by another task.
    pub fn cov_tasks(&self, wsp: bool) -> Result<Vec<CovTask>, Error> {
        let cls = self.all_cl_tasks()?;
        let mut seen = HashSet::default();
        let mut tasks = Vec::new();
        for (i, a) in cls.iter().enumerate() {
            for b in &cls[i..] {
                let task = CovTask::from_cls(a, b);
                let [t1, t2, t3, t4] = task.tracers();
                let masks = [
                    self.mask_name(t1)?,
                    self.mask_name(t2)?,
                    self.mask_name(t3)?,
                    self.mask_name(t4)?,
                ];
                if seen.insert(masks) == wsp {
                    tasks.push(task);
                }
            }
        }
        Ok(tasks)
    }

    /// Both Cl partitions merged, sorted, and deduplicated.
    pub fn all_cl_tasks(&self) -> Result<Vec<ClTask>, Error> {
        let mut tasks = self.cl_tasks(true)?;
        tasks.extend(self.cl_tasks(false)?);
        Ok(canonicalize(tasks))
    }

    /// Both covariance partitions merged, sorted, and deduplicated.
    pub fn all_cov_tasks(&self) -> Result<Vec<CovTask>, Error> {
        let mut tasks = self.cov_tasks(true)?;
        tasks.extend(self.cov_tasks(false)?);
        Ok(canonicalize(tasks))
    }

    /// Every tracer pair (i <= j in configuration order) requested by the `cls` section.
    fn requested_cls(&self) -> Result<Vec<ClTask>, Error> {
        let mut tasks = Vec::new();
        for (i, tr1) in self.tracers.iter().enumerate() {
            for tr2 in &self.tracers[i..] {
                let Some(entry) = self.cls_entry(tr1.bare_name(), tr2.bare_name()) else {
                    continue;
                };
                let same = tr1.name() == tr2.name();
                let wanted = match entry.compute {
                    ClCompute::All => true,
                    ClCompute::Auto => same,
                    ClCompute::Cross => !same,
                    ClCompute::None => false,
                };
                if wanted {
                    tasks.push(ClTask::pair(tr1.name(), tr2.name()));
                }
            }
        }
        Ok(tasks)
    }

    fn cls_entry(&self, b1: &str, b2: &str) -> Option<&ClsEntry> {
        self.cls
            .get(&format!("{b1}{PAIR_DELIM}{b2}"))
            .or_else(|| self.cls.get(&format!("{b2}{PAIR_DELIM}{b1}")))
    }
}
