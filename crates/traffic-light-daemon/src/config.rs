//! Configuration management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Frame loop rate in frames per second
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// Directory for persisted runtime state
    #[serde(default = "default_state_dir")]
    pub state_dir: String,

    /// Serial link configuration
    #[serde(default)]
    pub serial: SerialConfig,

    /// Command rate limiting
    #[serde(default)]
    pub control: ControlConfig,

    /// Web API configuration
    #[serde(default)]
    pub web: WebConfig,
}

/// Serial link configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Serial port path
    #[serde(default = "default_serial_device")]
    pub device: String,

    /// Baud rate
    #[serde(default = "default_baud")]
    pub baud: u32,

    /// Longest unterminated fragment kept before it is dropped (0 = unbounded)
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: default_serial_device(),
            baud: default_baud(),
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

/// Command rate limiting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Minimum interval before the same mode is sent again, in milliseconds
    #[serde(default = "default_mode_cooldown")]
    pub mode_cooldown_ms: u64,

    /// Minimum interval between timing nudges, in milliseconds
    #[serde(default = "default_adjust_cooldown")]
    pub adjust_cooldown_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            mode_cooldown_ms: default_mode_cooldown(),
            adjust_cooldown_ms: default_adjust_cooldown(),
        }
    }
}

/// Web API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Enable the HTTP API
    #[serde(default = "default_web_enable")]
    pub enable: bool,

    /// Listen address (e.g., "127.0.0.1:8687")
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enable: default_web_enable(),
            listen: default_listen(),
        }
    }
}

// Default value functions
fn default_frame_rate() -> u32 {
    30
}

fn default_state_dir() -> String {
    "/var/lib/trafficlightd".to_string()
}

fn default_serial_device() -> String {
    "/dev/ttyACM0".to_string()
}

fn default_baud() -> u32 {
    traffic_light_hw::BAUD_RATE
}

fn default_max_line_bytes() -> usize {
    4096
}

fn default_mode_cooldown() -> u64 {
    traffic_light_hw::MODE_COOLDOWN_MS
}

fn default_adjust_cooldown() -> u64 {
    traffic_light_hw::ADJUST_COOLDOWN_MS
}

fn default_web_enable() -> bool {
    true
}

fn default_listen() -> String {
    "127.0.0.1:8687".to_string()
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        Ok(config)
    }

    /// Interval between frames.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.frame_rate.max(1)))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            state_dir: default_state_dir(),
            serial: SerialConfig::default(),
            control: ControlConfig::default(),
            web: WebConfig::default(),
        }
    }
}
