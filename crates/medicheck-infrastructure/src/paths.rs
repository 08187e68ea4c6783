//! Path management for medicheck configuration and data files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/medicheck/          # Config directory
//! └── config.toml               # Application configuration
//!
//! ~/.local/share/medicheck/     # Data directory
//! └── consultations/            # One TOML file per completed consultation
//! ```
//!
//! Setting `MEDICHECK_HOME` places both directories under that path instead.

use medicheck_core::error::{MedicheckError, Result};
use std::path::PathBuf;

const APP_DIR: &str = "medicheck";

pub struct MedicheckPaths;

impl MedicheckPaths {
    fn home_override() -> Option<PathBuf> {
        std::env::var_os("MEDICHECK_HOME").map(PathBuf::from)
    }

    /// Returns the medicheck configuration directory.
    pub fn config_dir() -> Result<PathBuf> {
        if let Some(home) = Self::home_override() {
            return Ok(home.join("config"));
        }
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| MedicheckError::config("Cannot find config directory"))
    }

    /// Returns the medicheck data directory.
    pub fn data_dir() -> Result<PathBuf> {
        if let Some(home) = Self::home_override() {
            return Ok(home.join("data"));
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| MedicheckError::config("Cannot find data directory"))
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the directory holding completed consultations.
    pub fn consultations_dir() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("consultations"))
    }
}
