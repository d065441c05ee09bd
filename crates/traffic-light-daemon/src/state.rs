//! Application state management.

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use traffic_light_hw::{
    CommandEmitter, Controller, DeviceState, Direction, Light, LightTimings, LineReader, Mode,
    SerialLink,
};

use crate::config::Config;

/// File holding the persisted light timings.
const TIMINGS_FILE: &str = "timings.toml";

/// Snapshot of everything the control surface shows.
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub connected: bool,
    pub port: String,
    pub device: DeviceState,
    pub timings: LightTimings,
    pub last_mode: Option<String>,
    pub mode_cooldown_remaining_ms: u64,
}

/// Shared application state.
pub struct AppState {
    /// State directory for persisting runtime state
    state_dir: PathBuf,

    /// Link, reader, device mirror and emitter
    controller: Mutex<Controller<SerialLink>>,
}

impl AppState {
    /// Creates a new application state, opening the serial link if possible.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: &Config) -> Result<Self> {
        let link = match SerialLink::open(&config.serial.device, config.serial.baud) {
            Ok(link) => link,
            Err(e) => {
                warn!("{}. Running disconnected.", e);
                SerialLink::disconnected(&config.serial.device)
            }
        };
        Ok(Self::with_link(config, link))
    }

    /// Creates the application state around an existing link.
    pub fn with_link(config: &Config, link: SerialLink) -> Self {
        let state_dir = PathBuf::from(&config.state_dir);
        if let Err(e) = std::fs::create_dir_all(&state_dir) {
            warn!("Failed to create state directory {:?}: {}", state_dir, e);
        }

        let timings = Self::load_timings(&state_dir);
        info!(
            "Light timings: red {}ms, yellow {}ms, green {}ms",
            timings.red, timings.yellow, timings.green
        );

        let reader = match config.serial.max_line_bytes {
            0 => LineReader::new(),
            limit => LineReader::with_limit(limit),
        };
        let emitter = CommandEmitter::new(
            Duration::from_millis(config.control.mode_cooldown_ms),
            Duration::from_millis(config.control.adjust_cooldown_ms),
        );
        let controller = Controller::new(link, reader, emitter).with_timings(timings);

        Self {
            state_dir,
            controller: Mutex::new(controller),
        }
    }

    /// Loads light timings from the state directory.
    fn load_timings(state_dir: &Path) -> LightTimings {
        let file = state_dir.join(TIMINGS_FILE);
        if let Ok(content) = std::fs::read_to_string(&file) {
            match toml::from_str::<LightTimings>(&content) {
                Ok(timings) => return timings.normalized(),
                Err(e) => warn!("Ignoring invalid {:?}: {}", file, e),
            }
        }
        LightTimings::default()
    }

    /// Saves light timings to the state directory.
    fn save_timings(&self, timings: &LightTimings) {
        let file = self.state_dir.join(TIMINGS_FILE);
        match toml::to_string_pretty(timings) {
            Ok(content) => {
                if let Err(e) = std::fs::write(&file, content) {
                    warn!("Failed to save light timings: {}", e);
                }
            }
            Err(e) => {
                warn!("Failed to serialize light timings: {}", e);
            }
        }
    }

    /// Runs one frame of the inbound protocol.
    pub fn poll_frame(&self) -> usize {
        self.controller.lock().unwrap().poll()
    }

    /// Sends the stored timings so the device matches the host after startup.
    pub fn sync_timings(&self) -> bool {
        self.controller.lock().unwrap().resend_timings()
    }

    /// Returns true if the serial link is open.
    pub fn is_connected(&self) -> bool {
        self.controller.lock().unwrap().is_connected()
    }

    /// Current status snapshot.
    pub fn status(&self) -> Status {
        let controller = self.controller.lock().unwrap();
        let cooldown = controller
            .emitter()
            .mode_cooldown_remaining(Instant::now());
        Status {
            connected: controller.is_connected(),
            port: controller.link().port_path().to_string(),
            device: controller.state().clone(),
            timings: controller.timings(),
            last_mode: controller.emitter().last_mode().map(|m| m.to_string()),
            mode_cooldown_remaining_ms: cooldown.as_millis() as u64,
        }
    }

    /// Requests the highest-priority mode among `modes`.
    ///
    /// Returns the chosen mode and whether it was transmitted.
    pub fn request_modes(&self, modes: &[Mode]) -> Option<(Mode, bool)> {
        let mode = CommandEmitter::select_mode(modes.iter().copied())?;
        let sent = self
            .controller
            .lock()
            .unwrap()
            .request_mode(mode, Instant::now());
        Some((mode, sent))
    }

    /// Merges the given phases into the current timings, then sends and
    /// saves the result. Missing phases keep their value.
    ///
    /// Merge, send and save happen under one lock so concurrent partial
    /// updates never overwrite each other.
    pub fn update_timings(
        &self,
        red: Option<u32>,
        yellow: Option<u32>,
        green: Option<u32>,
    ) -> LightTimings {
        let mut controller = self.controller.lock().unwrap();
        let current = controller.timings();
        let applied = controller.set_timings(LightTimings {
            red: red.unwrap_or(current.red),
            yellow: yellow.unwrap_or(current.yellow),
            green: green.unwrap_or(current.green),
        });
        self.save_timings(&applied);
        info!(
            "Light timings set to {}:{}:{}",
            applied.red, applied.yellow, applied.green
        );
        applied
    }

    /// Moves one phase by a step, subject to the adjust cooldown.
    pub fn nudge_timing(&self, light: Light, direction: Direction) -> Option<LightTimings> {
        let mut controller = self.controller.lock().unwrap();
        if !controller.nudge_timing(light, direction, Instant::now()) {
            return None;
        }
        let timings = controller.timings();
        self.save_timings(&timings);
        Some(timings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(name: &str) -> Config {
        let dir = std::env::temp_dir().join(format!(
            "trafficlightd-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        Config {
            state_dir: dir.to_string_lossy().into_owned(),
            ..Config::default()
        }
    }

    #[test]
    fn test_disconnected_state() {
        let config = test_config("disconnected");
        let state = AppState::with_link(&config, SerialLink::disconnected("/dev/none"));

        assert!(!state.is_connected());
        assert_eq!(state.poll_frame(), 0);
        assert!(!state.sync_timings());

        let status = state.status();
        assert_eq!(status.port, "/dev/none");
        assert_eq!(status.device, DeviceState::default());
        assert_eq!(status.timings, LightTimings::default());
        assert_eq!(status.last_mode, None);

        let _ = std::fs::remove_dir_all(&config.state_dir);
    }

    #[test]
    fn test_timings_are_persisted() {
        let config = test_config("persist");
        let state = AppState::with_link(&config, SerialLink::disconnected("/dev/none"));
        let applied = state.update_timings(Some(3333), Some(600), Some(9000));
        assert_eq!((applied.red, applied.yellow, applied.green), (3300, 600, 5000));

        let reloaded = AppState::with_link(&config, SerialLink::disconnected("/dev/none"));
        assert_eq!(reloaded.status().timings, applied);

        let _ = std::fs::remove_dir_all(&config.state_dir);
    }

    #[test]
    fn test_partial_updates_keep_each_other() {
        let config = test_config("partial");
        let state = AppState::with_link(&config, SerialLink::disconnected("/dev/none"));

        state.update_timings(Some(3000), None, None);
        let applied = state.update_timings(None, None, Some(1000));
        assert_eq!((applied.red, applied.yellow, applied.green), (3000, 500, 1000));

        let reloaded = AppState::with_link(&config, SerialLink::disconnected("/dev/none"));
        assert_eq!(reloaded.status().timings, applied);

        let _ = std::fs::remove_dir_all(&config.state_dir);
    }

    #[test]
    fn test_concurrent_partial_updates() {
        let config = test_config("concurrent");
        let state = std::sync::Arc::new(AppState::with_link(
            &config,
            SerialLink::disconnected("/dev/none"),
        ));

        let handles: Vec<_> = [(Some(3000), None), (None, Some(1000))]
            .into_iter()
            .map(|(red, green)| {
                let state = state.clone();
                std::thread::spawn(move || state.update_timings(red, None, green))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let timings = state.status().timings;
        assert_eq!((timings.red, timings.green), (3000, 1000));

        let _ = std::fs::remove_dir_all(&config.state_dir);
    }

    #[test]
    fn test_nudge_respects_cooldown() {
        let config = test_config("nudge");
        let state = AppState::with_link(&config, SerialLink::disconnected("/dev/none"));

        let first = state.nudge_timing(Light::Green, Direction::Down);
        assert_eq!(first.map(|t| t.green), Some(1900));
        assert!(state.nudge_timing(Light::Green, Direction::Down).is_none());

        let _ = std::fs::remove_dir_all(&config.state_dir);
    }

    #[test]
    fn test_request_modes_without_link() {
        let config = test_config("modes");
        let state = AppState::with_link(&config, SerialLink::disconnected("/dev/none"));

        assert_eq!(state.request_modes(&[]), None);
        assert_eq!(
            state.request_modes(&[Mode::Normal, Mode::Blink]),
            Some((Mode::Blink, false))
        );

        let _ = std::fs::remove_dir_all(&config.state_dir);
    }

    #[tokio::test]
    async fn test_mode_reaches_device() {
        use tokio::io::AsyncReadExt;

        let config = test_config("device");
        let (host, mut device) = tokio::io::duplex(64);
        let state = AppState::with_link(&config, SerialLink::from_stream("duplex", host));

        assert_eq!(state.request_modes(&[Mode::Off]), Some((Mode::Off, true)));
        assert_eq!(state.request_modes(&[Mode::Off]), Some((Mode::Off, false)));

        let mut buf = [0u8; 9];
        device.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"MODE:OFF\n");
        assert_eq!(state.status().last_mode.as_deref(), Some("OFF"));

        let _ = std::fs::remove_dir_all(&config.state_dir);
    }
}
