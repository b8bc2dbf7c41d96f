//! Configuration management for ttylog

mod storage;
mod target;

pub mod serde_utils;

pub use storage::{
    BufferConfig, RecorderConfig, DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_FILES,
    DEFAULT_MAX_FILE_BYTES,
};
pub use target::{HostKeyPolicy, TargetConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtylogConfig {
    /// Device connection settings
    pub target: TargetConfig,
    /// In-memory buffer settings
    pub buffer: BufferConfig,
    /// Recorder and saved-log settings
    pub recorder: RecorderConfig,
}

impl TtylogConfig {
    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.target.validate()?;
        if self.buffer.capacity == 0 {
            return Err(ConfigError::Invalid(
                "buffer.capacity must be at least 1".into(),
            ));
        }
        if self.recorder.max_files == 0 {
            return Err(ConfigError::Invalid(
                "recorder.max_files must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ttylog")
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Get the default directory for recordings and exports
pub fn default_logs_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ttylog")
        .join("logs")
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

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("Failed to create config dir: {}", e)))?;
    }

    std::fs::write(path, content)
        .map_err(|e| ConfigError::Invalid(format!("Failed to write config: {}", e)))?;

    Ok(())
}
