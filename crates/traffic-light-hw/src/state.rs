//! Host-side mirror of the controller's reported state.

use crate::protocol::Message;
use crate::timings::Light;
use serde::Serialize;
use tracing::{debug, info};

/// Last known mode, brightness and light tokens reported by the device.
///
/// Only [`apply`](DeviceState::apply) mutates it; fields are overwritten one
/// message at a time and never reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceState {
    pub mode: String,
    pub brightness: i64,
    pub red: String,
    pub yellow: String,
    pub green: String,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            mode: "normal".to_string(),
            brightness: 255,
            red: "off".to_string(),
            yellow: "off".to_string(),
            green: "off".to_string(),
        }
    }
}

impl DeviceState {
    /// Creates the startup state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a parsed message.
    pub fn apply(&mut self, message: &Message) {
        match message {
            Message::Mode(mode) => {
                self.mode = mode.clone();
                info!("Mode changed to: {}", mode);
            }
            Message::Brightness(value) => {
                self.brightness = *value;
            }
            Message::LedState { red, yellow, green } => {
                self.red = red.clone();
                self.yellow = yellow.clone();
                self.green = green.clone();
                debug!("LED state updated: {} {} {}", red, yellow, green);
            }
        }
    }

    /// Parses and applies one line. Returns true if the state changed.
    pub fn process_line(&mut self, line: &str) -> bool {
        match Message::parse(line) {
            Some(message) => {
                let before = self.clone();
                self.apply(&message);
                *self != before
            }
            None => {
                debug!("Ignoring unrecognized line: {:?}", line);
                false
            }
        }
    }

    /// Raw token reported for one light.
    pub fn token(&self, light: Light) -> &str {
        match light {
            Light::Red => &self.red,
            Light::Yellow => &self.yellow,
            Light::Green => &self.green,
        }
    }

    /// Returns true if the device reports the light as lit.
    pub fn is_lit(&self, light: Light) -> bool {
        self.token(light) == light.lit_token()
    }
}
