use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use super::backend::Detector;

/// Shared handle to a registered detector.
pub type SharedDetector = Arc<Mutex<dyn Detector>>;

/// Detector backends in registration order, keyed by `Detector::name`.
///
/// Backends are wrapped in `Mutex` because `Detector::detect` takes `&mut self`.
#[derive(Default)]
pub struct BackendRegistry {
    entries: Vec<(&'static str, SharedDetector)>,
    preferred: Option<&'static str>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a backend, replacing any earlier one with the same name in place.
    pub fn register<D: Detector + 'static>(&mut self, backend: D) {
        let name = backend.name();
        let shared: SharedDetector = Arc::new(Mutex::new(backend));
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = shared,
            None => self.entries.push((name, shared)),
        }
    }

    /// Prefer `name` when `resolve` is called without one.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        let registered = self
            .entries
            .iter()
            .map(|(n, _)| *n)
            .find(|n| *n == name)
            .ok_or_else(|| self.unknown(name))?;
        self.preferred = Some(registered);
        Ok(())
    }

    /// Named backend when `name` is given; otherwise the preferred backend, or
    /// the first one registered.
    pub fn resolve(&self, name: Option<&str>) -> Result<SharedDetector> {
        let wanted = name.or(self.preferred);
        let entry = match wanted {
            Some(wanted) => self
                .entries
                .iter()
                .find(|(n, _)| *n == wanted)
                .ok_or_else(|| self.unknown(wanted))?,
            None => self
                .entries
                .first()
                .ok_or_else(|| anyhow!("no detector backend registered"))?,
        };
        Ok(Arc::clone(&entry.1))
    }

    /// Registered backend names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|(n, _)| n.to_string()).collect();
        names.sort();
        names
    }

    fn unknown(&self, name: &str) -> anyhow::Error {
        anyhow!(
            "backend '{}' not registered (available: {})",
            name,
            self.list().join(", ")
        )
    }
}
