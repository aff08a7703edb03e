//! Name → backend factory mapping

use std::collections::HashMap;
use std::sync::Arc;

use super::{FileBackend, MemoryBackend, StateStore, StoreError};
use crate::config::Settings;

type Factory = Box<dyn Fn(&Settings) -> Result<Arc<dyn StateStore>, StoreError> + Send + Sync>;

/// Registry of state backends selectable from configuration
pub struct BackendRegistry {
    factories: HashMap<String, Factory>,
}

impl BackendRegistry {
    /// Empty registry with no backends
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the built-in `memory` and `file` backends
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("memory", |_| Ok(Arc::new(MemoryBackend::new())));
        registry.register("file", |settings| {
            Ok(Arc::new(FileBackend::new(&settings.data_dir)?))
        });
        registry
    }

    /// Register a backend factory under `name` (case-insensitive)
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&Settings) -> Result<Arc<dyn StateStore>, StoreError> + Send + Sync + 'static,
    {
        self.factories
            .insert(name.trim().to_lowercase(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.trim().to_lowercase())
    }

    /// Registered backend names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Build the backend registered under `name`.
    ///
    /// Returns `Ok(None)` when no such backend is registered.
    pub fn build(
        &self,
        name: &str,
        settings: &Settings,
    ) -> Result<Option<Arc<dyn StateStore>>, StoreError> {
        match self.factories.get(&name.trim().to_lowercase()) {
            Some(factory) => factory(settings).map(Some),
            None => Ok(None),
        }
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
