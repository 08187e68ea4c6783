//! Configuration service.
//!
//! Loads `MedicheckConfig` from `config.toml`, falling back to defaults when
//! the file is absent, then applies environment overrides. The result is
//! cached until `invalidate_cache` is called.

use crate::paths::MedicheckPaths;
use crate::storage::AtomicTomlFile;
use medicheck_core::config::MedicheckConfig;
use medicheck_core::error::Result;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    config: Arc<RwLock<Option<MedicheckConfig>>>,
}

impl ConfigService {
    /// Creates a service reading `path`.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a service reading the platform config file.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(MedicheckPaths::config_file()?))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Returns the configuration with process environment overrides applied.
    pub fn get_config(&self) -> Result<MedicheckConfig> {
        self.get_config_with(|key| std::env::var(key).ok())
    }

    /// Returns the configuration with overrides looked up through `lookup`.
    pub fn get_config_with<F>(&self, lookup: F) -> Result<MedicheckConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        {
            let cached = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(config) = cached.as_ref() {
                return Ok(config.clone());
            }
        }

        let mut config = AtomicTomlFile::<MedicheckConfig>::new(self.path.clone())
            .load()?
            .unwrap_or_else(|| {
                tracing::debug!("[ConfigService] No config at {:?}, using defaults", self.path);
                MedicheckConfig::default()
            });
        config.apply_env_overrides(lookup)?;

        let mut cached = self.config.write().unwrap_or_else(|e| e.into_inner());
        *cached = Some(config.clone());
        Ok(config)
    }

    /// Writes `config` to the config file and refreshes the cache.
    pub fn save_config(&self, config: &MedicheckConfig) -> Result<()> {
        AtomicTomlFile::new(self.path.clone()).save(config)?;
        self.invalidate_cache();
        Ok(())
    }

    /// Forces a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut cached = self.config.write().unwrap_or_else(|e| e.into_inner());
        *cached = None;
    }
}
