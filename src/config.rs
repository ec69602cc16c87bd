//! Engine configuration.
//!
//! Load priority: `{data_path}/debrief.toml` > `DEBRIEF_CONFIG` env (JSON) > defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::services::{CommandConfig, FilterConfig};
use crate::DebriefError;

pub const CONFIG_FILE: &str = "debrief.toml";
pub const CONFIG_ENV: &str = "DEBRIEF_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebriefConfig {
    pub filter: FilterConfig,
    pub commands: CommandConfig,
}

impl DebriefConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, DebriefError> {
        toml::from_str(contents).map_err(|e| DebriefError::Config(e.to_string()))
    }

    pub fn from_json_str(contents: &str) -> Result<Self, DebriefError> {
        serde_json::from_str(contents).map_err(|e| DebriefError::Config(e.to_string()))
    }
}

/// Load configuration for `data_path`, consulting the process environment.
pub fn load_config(data_path: &Path) -> DebriefConfig {
    load_config_with_env(data_path, std::env::var(CONFIG_ENV).ok())
}

/// Same as [`load_config`] with the env value passed in.
pub fn load_config_with_env(data_path: &Path, env_value: Option<String>) -> DebriefConfig {
    // Try file first
    let config_path = data_path.join(CONFIG_FILE);
    if config_path.exists() {
        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match DebriefConfig::from_toml_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", config_path.display());
                    return config;
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse {}: {}. Using default.",
                        config_path.display(),
                        e
                    );
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read {}: {}. Using default.",
                    config_path.display(),
                    e
                );
            }
        }
    }

    if let Some(raw) = env_value {
        match DebriefConfig::from_json_str(&raw) {
            Ok(config) => {
                tracing::info!("Loaded config from {} env", CONFIG_ENV);
                return config;
            }
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}. Using default.", CONFIG_ENV, e);
            }
        }
    }

    DebriefConfig::default()
}
