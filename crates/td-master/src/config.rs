//! Session configuration, stored as YAML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunables for a playback session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Frames per render cycle.
    pub block_size: usize,
    /// Rate used for offline rendering. Live output follows the device.
    pub sample_rate: u32,
    pub channels: u16,
    /// Pending commands each deck queue can hold.
    pub command_capacity: usize,
    /// Status refresh and auto-advance poll period.
    pub poll_interval_ms: u64,
    /// How close to the end counts as "reached the end" for auto-advance.
    pub end_epsilon_secs: f64,
    pub initial_gain: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            block_size: td_ir::BLOCK_SIZE,
            sample_rate: 44100,
            channels: 2,
            command_capacity: 64,
            poll_interval_ms: 100,
            end_epsilon_secs: 0.05,
            initial_gain: 1.0,
        }
    }
}

impl SessionConfig {
    /// Copy with every field pulled into its usable range.
    pub fn validated(&self) -> Self {
        let defaults = Self::default();
        Self {
            block_size: self.block_size.clamp(16, 8192),
            sample_rate: if self.sample_rate == 0 {
                defaults.sample_rate
            } else {
                self.sample_rate
            },
            channels: self.channels.clamp(1, td_ir::MAX_CHANNELS),
            command_capacity: self.command_capacity.max(8),
            poll_interval_ms: self.poll_interval_ms.max(10),
            end_epsilon_secs: if self.end_epsilon_secs.is_finite() {
                self.end_epsilon_secs.clamp(0.0, 1.0)
            } else {
                defaults.end_epsilon_secs
            },
            initial_gain: if self.initial_gain.is_finite() {
                self.initial_gain.clamp(0.0, td_engine::MAX_GAIN)
            } else {
                defaults.initial_gain
            },
        }
    }
}

/// `<config dir>/twindeck/config.yaml`, or a relative `config.yaml` when the
/// platform has no config directory.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("twindeck").join("config.yaml"))
        .unwrap_or_else(|| PathBuf::from("config.yaml"))
}

/// Load a config file. A missing or unparsable file yields the defaults.
pub fn load_config(path: &Path) -> SessionConfig {
    if !path.exists() {
        log::info!("no config at {}, using defaults", path.display());
        return SessionConfig::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<SessionConfig>(&contents) {
            Ok(config) => {
                log::info!("loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("failed to parse {}: {e}, using defaults", path.display());
                SessionConfig::default()
            }
        },
        Err(e) => {
            log::warn!("failed to read {}: {e}, using defaults", path.display());
            SessionConfig::default()
        }
    }
}

/// Write a config file, creating parent directories as needed.
pub fn save_config(config: &SessionConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(path, yaml).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    log::info!("saved config to {}", path.display());
    Ok(())
}
