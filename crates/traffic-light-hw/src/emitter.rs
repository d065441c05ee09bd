//! Outbound command emitter with mode debouncing.

use crate::link::Transport;
use crate::protocol::{Command, Mode};
use crate::timings::{Direction, Light, LightTimings};
use crate::{ADJUST_COOLDOWN_MS, MODE_COOLDOWN_MS};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Formats commands and writes them to the link.
///
/// Writes are fire-and-forget. Mode commands are suppressed when they repeat
/// the last sent mode within the mode cooldown; timing nudges are limited to
/// one per adjust cooldown.
#[derive(Debug, Clone)]
pub struct CommandEmitter {
    mode_cooldown: Duration,
    adjust_cooldown: Duration,
    last_mode: Option<(Mode, Instant)>,
    last_adjust: Option<Instant>,
}

impl Default for CommandEmitter {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(MODE_COOLDOWN_MS),
            Duration::from_millis(ADJUST_COOLDOWN_MS),
        )
    }
}

impl CommandEmitter {
    /// Creates an emitter with the given cooldowns.
    pub fn new(mode_cooldown: Duration, adjust_cooldown: Duration) -> Self {
        Self {
            mode_cooldown,
            adjust_cooldown,
            last_mode: None,
            last_adjust: None,
        }
    }

    /// Writes one command if the link is open. Returns true if it was queued.
    pub fn send<T: Transport>(&self, link: &mut T, command: &Command) -> bool {
        if !link.is_open() {
            debug!("Link closed, dropping {}", command);
            return false;
        }
        match link.write(command.encode().as_bytes()) {
            Ok(()) => {
                info!("Sent {}", command);
                true
            }
            Err(e) => {
                warn!("Failed to send {}: {}", command, e);
                false
            }
        }
    }

    /// Sends the phase timings.
    pub fn send_timings<T: Transport>(&self, link: &mut T, timings: &LightTimings) -> bool {
        self.send(link, &Command::TrafficLight(*timings))
    }

    /// Sends a mode change unless it repeats the last mode within the cooldown.
    pub fn send_mode<T: Transport>(&mut self, link: &mut T, mode: Mode, now: Instant) -> bool {
        if let Some((last, at)) = self.last_mode {
            if last == mode && now.saturating_duration_since(at) < self.mode_cooldown {
                debug!("Suppressing repeated mode {}", mode);
                return false;
            }
        }

        if !self.send(link, &Command::Mode(mode)) {
            return false;
        }
        self.last_mode = Some((mode, now));
        true
    }

    /// Picks the highest-priority mode among labels seen in one frame.
    pub fn select_mode<I>(labels: I) -> Option<Mode>
    where
        I: IntoIterator<Item = Mode>,
    {
        labels.into_iter().min()
    }

    /// Moves one phase by a single step, at most once per adjust cooldown.
    ///
    /// The new timings are sent when the link is open. Returns true if the
    /// timings were changed.
    pub fn nudge_timing<T: Transport>(
        &mut self,
        link: &mut T,
        timings: &mut LightTimings,
        light: Light,
        direction: Direction,
        now: Instant,
    ) -> bool {
        if let Some(at) = self.last_adjust {
            if now.saturating_duration_since(at) < self.adjust_cooldown {
                debug!("Ignoring {} nudge during cooldown", light);
                return false;
            }
        }

        timings.nudge(light, direction);
        self.last_adjust = Some(now);
        self.send_timings(link, timings);
        true
    }

    /// Last mode actually sent.
    pub fn last_mode(&self) -> Option<Mode> {
        self.last_mode.map(|(mode, _)| mode)
    }

    /// Time until the last sent mode may be repeated.
    pub fn mode_cooldown_remaining(&self, now: Instant) -> Duration {
        match self.last_mode {
            Some((_, at)) => self
                .mode_cooldown
                .saturating_sub(now.saturating_duration_since(at)),
            None => Duration::ZERO,
        }
    }
}
