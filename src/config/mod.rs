use std::path::Path;

use serde::{Deserialize, Serialize};

// Line settings fixed by the instrument firmware
pub const BAUD_RATE: u32 = 4800;
pub const DATA_BITS: u8 = 8;
pub const STOP_BITS: u8 = 1;

/// Poll cadence: once per display frame
pub const DEFAULT_POLL_FREQUENCY_HZ: u32 = 60;
pub const DEFAULT_COMMAND_TIMEOUT_SECS: f64 = 120.0;
pub const DEFAULT_GAIN: u8 = 255;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParityMode {
    #[default]
    None,
    Odd,
    Even,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: ParityMode,
    pub stop_bits: u8,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: BAUD_RATE,
            data_bits: DATA_BITS,
            parity: ParityMode::None,
            stop_bits: STOP_BITS,
        }
    }
}

/// Runtime settings for one spectrometer session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub port_name: Option<String>,
    pub serial: SerialSettings,
    pub poll_frequency_hz: u32,
    pub command_timeout_secs: f64,
    /// Detector gain sent with every wavelength change
    pub default_gain: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port_name: None,
            serial: SerialSettings::default(),
            poll_frequency_hz: DEFAULT_POLL_FREQUENCY_HZ,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            default_gain: DEFAULT_GAIN,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

impl SessionConfig {
    /// Load a JSON config; absent fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: SessionConfig = serde_json::from_str(&text)?;
        config.validate()?;
        log::debug!("Loaded session config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_frequency_hz == 0 {
            return Err(ConfigError::Invalid("poll_frequency_hz must be positive".to_string()));
        }
        if !self.command_timeout_secs.is_finite() || self.command_timeout_secs <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "command_timeout_secs must be positive, got {}",
                self.command_timeout_secs
            )));
        }
        Ok(())
    }

    /// Poll budget for one command: `frequency × timeout`, at least one tick
    pub fn timeout_ticks(&self) -> u32 {
        let ticks = (self.poll_frequency_hz as f64 * self.command_timeout_secs).round();
        if ticks.is_finite() && ticks >= 1.0 {
            ticks.min(u32::MAX as f64) as u32
        } else {
            1
        }
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.poll_frequency_hz.max(1) as f64)
    }
}
