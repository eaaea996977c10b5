//! Configuration file support for ResQ.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/resq/config.toml`.

use crate::schedule::JOULE_OPTIONS;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub protocol: ProtocolConfig,

    #[serde(default)]
    pub defibrillation: DefibrillationConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Protocol timing parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Seconds of CPR between rhythm checks
    #[serde(default = "default_cycle_seconds")]
    pub cycle_seconds: u32,

    /// Seconds since the last adrenaline dose before a reminder is raised
    #[serde(default = "default_adrenaline_interval_seconds")]
    pub adrenaline_interval_seconds: i64,

    /// Minimum seconds after a dismissed reminder before the next one
    #[serde(default = "default_reminder_cooldown_seconds")]
    pub reminder_cooldown_seconds: i64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            cycle_seconds: default_cycle_seconds(),
            adrenaline_interval_seconds: default_adrenaline_interval_seconds(),
            reminder_cooldown_seconds: default_reminder_cooldown_seconds(),
        }
    }
}

/// Defibrillation energy configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DefibrillationConfig {
    #[serde(default = "default_joule_options")]
    pub joule_options: Vec<u32>,
}

impl Default for DefibrillationConfig {
    fn default() -> Self {
        Self {
            joule_options: default_joule_options(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    // No resolvable home directory: fall back to a relative path rather
    // than refusing to start
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from(".local/share"))
        .join("resq")
}

fn default_cycle_seconds() -> u32 {
    120
}

fn default_adrenaline_interval_seconds() -> i64 {
    180
}

fn default_reminder_cooldown_seconds() -> i64 {
    60
}

fn default_joule_options() -> Vec<u32> {
    JOULE_OPTIONS.to_vec()
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("resq")
            .join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
