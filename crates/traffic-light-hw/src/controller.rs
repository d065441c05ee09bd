//! Per-frame driver tying the link, line reader, device state and emitter
//! together.

use crate::emitter::CommandEmitter;
use crate::link::Transport;
use crate::protocol::{LineReader, Mode};
use crate::state::DeviceState;
use crate::timings::{Direction, Light, LightTimings};
use std::time::Instant;
use tracing::trace;

/// Owns everything needed to keep the host in sync with one device.
pub struct Controller<T> {
    link: T,
    reader: LineReader,
    state: DeviceState,
    timings: LightTimings,
    emitter: CommandEmitter,
}

impl<T: Transport> Controller<T> {
    /// Creates a controller with default state and timings.
    pub fn new(link: T, reader: LineReader, emitter: CommandEmitter) -> Self {
        Self {
            link,
            reader,
            state: DeviceState::new(),
            timings: LightTimings::default(),
            emitter,
        }
    }

    /// Replaces the timings without sending them.
    pub fn with_timings(mut self, timings: LightTimings) -> Self {
        self.timings = timings.normalized();
        self
    }

    /// Runs one frame: drains available input and applies every complete
    /// line. Returns the number of lines processed.
    pub fn poll(&mut self) -> usize {
        self.poll_lines().len()
    }

    /// Like [`poll`](Controller::poll), but returns the processed lines.
    pub fn poll_lines(&mut self) -> Vec<String> {
        let Some(data) = self.link.read_available() else {
            return Vec::new();
        };
        trace!("Received {} bytes", data.len());

        let lines = self.reader.push(&data);
        for line in &lines {
            self.state.process_line(line);
        }
        lines
    }

    /// Requests a mode change, subject to the mode cooldown.
    pub fn request_mode(&mut self, mode: Mode, now: Instant) -> bool {
        self.emitter.send_mode(&mut self.link, mode, now)
    }

    /// Requests the highest-priority mode among several labels.
    pub fn request_modes<I>(&mut self, labels: I, now: Instant) -> bool
    where
        I: IntoIterator<Item = Mode>,
    {
        match CommandEmitter::select_mode(labels) {
            Some(mode) => self.request_mode(mode, now),
            None => false,
        }
    }

    /// Stores new timings (clamped and snapped) and sends them.
    pub fn set_timings(&mut self, timings: LightTimings) -> LightTimings {
        self.timings = timings.normalized();
        self.emitter.send_timings(&mut self.link, &self.timings);
        self.timings
    }

    /// Sets one phase and sends the timings.
    pub fn set_timing(&mut self, light: Light, ms: u32) -> LightTimings {
        let mut timings = self.timings;
        timings.set(light, ms);
        self.set_timings(timings)
    }

    /// Sends the current timings again.
    pub fn resend_timings(&mut self) -> bool {
        self.emitter.send_timings(&mut self.link, &self.timings)
    }

    /// Moves one phase by a single step, subject to the adjust cooldown.
    pub fn nudge_timing(&mut self, light: Light, direction: Direction, now: Instant) -> bool {
        self.emitter
            .nudge_timing(&mut self.link, &mut self.timings, light, direction, now)
    }

    /// Last state reported by the device.
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Current phase timings.
    pub fn timings(&self) -> LightTimings {
        self.timings
    }

    /// Command emitter, for cooldown queries.
    pub fn emitter(&self) -> &CommandEmitter {
        &self.emitter
    }

    /// Returns true if the serial link is open.
    pub fn is_connected(&self) -> bool {
        self.link.is_open()
    }

    /// Underlying link.
    pub fn link(&self) -> &T {
        &self.link
    }

    /// Consumes the controller, returning the link.
    pub fn into_link(self) -> T {
        self.link
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::tests::MemoryTransport;
    use std::time::Duration;

    fn controller() -> Controller<MemoryTransport> {
        Controller::new(
            MemoryTransport::open(),
            LineReader::new(),
            CommandEmitter::default(),
        )
    }

    #[test]
    fn test_poll_applies_lines_in_order() {
        let mut ctl = controller();
        ctl.link.inbound.push(b"MODE:emergency\nBRIGHT".to_vec());
        ctl.link.inbound.push(b"NESS:90\nMODE:blink\nLED_STATE:R1:Y1".to_vec());

        assert_eq!(ctl.poll(), 3);
        assert_eq!(ctl.state().mode, "blink");
        assert_eq!(ctl.state().brightness, 90);
        assert_eq!(ctl.state().red, "off");

        ctl.link.inbound.push(b":G1\r\n".to_vec());
        assert_eq!(ctl.poll(), 1);
        assert!(ctl.state().is_lit(Light::Red));
        assert!(ctl.state().is_lit(Light::Green));
    }

    #[test]
    fn test_poll_lines_returns_processed_lines() {
        let mut ctl = controller();
        ctl.link
            .inbound
            .push(b"TRAFFIC_LIGHT:1000:500:1000\nBRIGHTNESS:7\nMODE:".to_vec());
        assert_eq!(
            ctl.poll_lines(),
            vec!["TRAFFIC_LIGHT:1000:500:1000", "BRIGHTNESS:7"]
        );
        assert_eq!(ctl.state().brightness, 7);
        assert!(ctl.poll_lines().is_empty());
    }

    #[test]
    fn test_poll_without_data() {
        let mut ctl = controller();
        assert_eq!(ctl.poll(), 0);
        assert_eq!(ctl.state(), &DeviceState::default());
    }

    #[test]
    fn test_malformed_input_keeps_state() {
        let mut ctl = controller();
        ctl.link
            .inbound
            .push(b"BRIGHTNESS:abc\nLED_STATE:R1:off\n???\n\n".to_vec());
        assert_eq!(ctl.poll(), 4);
        assert_eq!(ctl.state(), &DeviceState::default());
    }

    #[test]
    fn test_set_timings_clamps_and_sends() {
        let mut ctl = controller();
        let t = ctl.set_timings(LightTimings {
            red: 10_000,
            yellow: 120,
            green: 2040,
        });
        assert_eq!((t.red, t.yellow, t.green), (5000, 500, 2000));
        assert_eq!(ctl.link.written, vec!["TRAFFIC_LIGHT:5000:500:2000\n"]);

        ctl.set_timing(Light::Yellow, 800);
        assert_eq!(ctl.timings().yellow, 800);
        assert_eq!(ctl.link.written.len(), 2);
    }

    #[test]
    fn test_request_modes_uses_priority_and_debounce() {
        let mut ctl = controller();
        let start = Instant::now();

        assert!(ctl.request_modes([Mode::Normal, Mode::Emergency], start));
        assert!(!ctl.request_modes([Mode::Emergency], start + Duration::from_millis(100)));
        assert!(!ctl.request_modes(Vec::<Mode>::new(), start));
        assert_eq!(ctl.link.written, vec!["MODE:emergency\n"]);
    }

    #[test]
    fn test_disconnected_controller_still_tracks_timings() {
        let mut ctl = Controller::new(
            MemoryTransport::default(),
            LineReader::new(),
            CommandEmitter::default(),
        )
        .with_timings(LightTimings::new(1000, 1000, 1000));

        assert!(!ctl.is_connected());
        assert!(ctl.nudge_timing(Light::Yellow, Direction::Up, Instant::now()));
        assert_eq!(ctl.timings().yellow, 1100);
        assert!(!ctl.resend_timings());
        assert!(ctl.link().written.is_empty());
    }
}
