//! Configuration management for the sdkscan CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Retail key file name in the shared key directory
pub const PROD_KEYS: &str = "prod.keys";
/// Development key file name in the shared key directory
pub const DEV_KEYS: &str = "dev.keys";
/// Title key file name in the shared key directory
pub const TITLE_KEYS: &str = "title.keys";

#[derive(Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    pub keyset: Option<PathBuf>,
    pub title_keys: Option<PathBuf>,
    pub dev_keyset: Option<PathBuf>,
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("sdkscan");

        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration from file, or the default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&contents).context("Failed to parse config file")
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory at {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        Ok(())
    }
}

/// Shared key directory (`~/.switch`)
pub fn key_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".switch"))
}

/// Pick a key file: the one given on the command line, then the configured
/// one, then `name` in the shared key directory if it exists.
pub fn resolve_key_file(
    explicit: Option<PathBuf>,
    configured: Option<&Path>,
    name: &str,
) -> Option<PathBuf> {
    explicit
        .or_else(|| configured.map(Path::to_path_buf))
        .or_else(|| key_dir().map(|dir| dir.join(name)).filter(|p| p.is_file()))
}
