use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::error::{AppError, Result};

/// Persisted session preferences
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Whether the hardware encode path is preferred
    #[serde(default)]
    pub use_gpu: bool,
}

impl Config {
    /// Load configuration from the TOML file, or create the default if missing
    pub fn load() -> Self {
        let config_path = Self::config_path();

        if config_path.exists() {
            match Self::load_from_file(&config_path) {
                Ok(config) => {
                    info!("loaded config from {}", config_path.display());
                    return config;
                }
                Err(e) => {
                    warn!("failed to load config: {e}. Using defaults.");
                }
            }
        }

        let config = Self::default();
        if let Err(e) = config.save() {
            warn!("failed to save default config: {e}");
        }
        config
    }

    /// Save configuration to the TOML file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(&config_path, toml_string)?;

        info!("saved config to {}", config_path.display());
        Ok(())
    }

    fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AppError::Config(format!("invalid config file: {e}")))
    }

    /// Default configuration file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tinythis")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_defaults_use_gpu() {
        let c: Config = toml::from_str("use_gpu = true").unwrap();
        assert!(c.use_gpu);

        let c: Config = toml::from_str("").unwrap();
        assert!(!c.use_gpu);
    }
}
