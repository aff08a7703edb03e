//! Top-level entry point tying configuration, state and scheduling together

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::{load_config, Config, ConfigError, Service};
use crate::escalation::{EscalationEngine, FileMonitor};
use crate::notifier::Notifier;
use crate::scheduler::Scheduler;
use crate::storage::{BackendRegistry, StateStore};

/// A set of observed services plus the backend selected for them
pub struct LogChecker {
    cfg: Config,
    backend: Option<Arc<dyn StateStore>>,
}

impl LogChecker {
    pub fn new() -> Self {
        Self::from_config(Config::default())
    }

    pub fn from_config(cfg: Config) -> Self {
        Self { cfg, backend: None }
    }

    /// Load a JSON configuration file
    pub fn from_file(name: &str) -> Result<Self, ConfigError> {
        Ok(Self::from_config(load_config(name)?))
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn add_service(&mut self, service: Service) -> Result<(), ConfigError> {
        if service.name.trim().is_empty() {
            return Err(ConfigError::EmptyServiceName);
        }
        if self.has_service(&service.name) {
            return Err(ConfigError::DuplicateService(service.name));
        }

        self.cfg.observed.push(service);
        // Any previous validation no longer covers the new service
        self.backend = None;
        Ok(())
    }

    pub fn has_service(&self, name: &str) -> bool {
        self.cfg.observed.iter().any(|s| s.name == name)
    }

    /// Check the whole configuration and resolve the state backend
    pub fn validate(&mut self, registry: &BackendRegistry) -> Result<(), ConfigError> {
        if self.cfg.observed.is_empty() {
            return Err(ConfigError::NoServices);
        }

        let mut services = HashSet::new();
        let mut paths = HashSet::new();
        for service in &self.cfg.observed {
            if service.name.trim().is_empty() {
                return Err(ConfigError::EmptyServiceName);
            }
            if !services.insert(service.name.as_str()) {
                return Err(ConfigError::DuplicateService(service.name.clone()));
            }
            if service.files.is_empty() {
                return Err(ConfigError::EmptyService(service.name.clone()));
            }
            for file in &service.files {
                file.validate()?;
                if !paths.insert(file.path.as_str()) {
                    return Err(ConfigError::DuplicateFile(file.path.clone()));
                }
            }
        }

        let missing = self.cfg.sender.missing_fields();
        if !missing.is_empty() {
            return Err(ConfigError::MissingSender(missing.join(", ")));
        }

        if self.cfg.storage.trim().is_empty() {
            return Err(ConfigError::MissingStorage);
        }

        let backend = registry
            .build(&self.cfg.storage, &self.cfg.settings)?
            .ok_or_else(|| ConfigError::UnknownBackend {
                name: self.cfg.storage.clone(),
                available: registry.names().join(", "),
            })?;

        tracing::info!(backend = backend.name(), files = self.cfg.file_count(), "Configuration validated");
        self.backend = Some(backend);
        Ok(())
    }

    /// Backend selected by the last successful [`validate`](Self::validate)
    pub fn backend(&self) -> Option<&Arc<dyn StateStore>> {
        self.backend.as_ref()
    }

    /// One monitor per configured file
    pub fn monitors(&self) -> Result<Vec<FileMonitor>, ConfigError> {
        self.cfg
            .files()
            .map(|(service, file)| FileMonitor::new(service, file.clone()))
            .collect()
    }

    /// Drop stored state for files no longer in the configuration.
    ///
    /// Returns the number of removed entries.
    pub fn prune_state(&self) -> Result<usize, ConfigError> {
        let backend = self.backend.as_ref().ok_or(ConfigError::NotValidated)?;
        let configured: HashSet<&str> = self.cfg.files().map(|(_, f)| f.path.as_str()).collect();

        let mut removed = 0;
        for key in backend.keys()? {
            if !configured.contains(key.as_str()) {
                backend.delete(&key)?;
                tracing::info!(path = %key, "Removed state for unwatched file");
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Prune stale state and start one polling loop per file
    pub fn start(&self, notifier: Arc<dyn Notifier>) -> Result<Scheduler, ConfigError> {
        let backend = self.backend.clone().ok_or(ConfigError::NotValidated)?;
        let monitors = self.monitors()?;
        self.prune_state()?;

        let engine = Arc::new(EscalationEngine::new(backend, notifier, &self.cfg.settings));
        Ok(Scheduler::start(engine, monitors))
    }
}

impl Default for LogChecker {
    fn default() -> Self {
        Self::new()
    }
}
