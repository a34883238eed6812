//! Configuration management for opencode workspaces

mod settings;
pub mod serde_utils;

pub use settings::{BackoffConfig, Settings};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::types::{ServerConfiguration, Workspace};

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("opencode-workspaces")
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// On-disk layout of `config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Timeouts, retry and polling knobs
    pub settings: Settings,

    /// Known servers
    pub servers: Vec<ServerConfiguration>,

    /// Known workspaces
    pub workspaces: Vec<Workspace>,
}

impl ConfigFile {
    /// Look up a server by id or display name
    pub fn server(&self, key: &str) -> Option<&ServerConfiguration> {
        self.servers
            .iter()
            .find(|s| s.id.as_str() == key)
            .or_else(|| self.servers.iter().find(|s| s.name.eq_ignore_ascii_case(key)))
    }

    /// Look up a workspace by id or display name
    pub fn workspace(&self, key: &str) -> Option<&Workspace> {
        self.workspaces
            .iter()
            .find(|w| w.id.to_string() == key)
            .or_else(|| {
                self.workspaces
                    .iter()
                    .find(|w| w.name.eq_ignore_ascii_case(key))
            })
    }

    /// Server a workspace runs on, matched by host and user
    pub fn server_for(&self, workspace: &Workspace) -> Option<&ServerConfiguration> {
        self.servers
            .iter()
            .find(|s| s.host == workspace.host && s.username == workspace.user)
            .or_else(|| self.servers.iter().find(|s| s.host == workspace.host))
    }
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to a file
pub fn save_config<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("Failed to create config dir: {}", e)))?;
    }

    std::fs::write(path, content)
        .map_err(|e| ConfigError::Invalid(format!("Failed to write config: {}", e)))?;

    Ok(())
}
