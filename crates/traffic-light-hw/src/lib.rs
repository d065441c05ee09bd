//! Traffic Light Hardware Library
//!
//! Serial line protocol, device state mirror and outbound command emitter for
//! a microcontroller-driven traffic light model.

pub mod controller;
pub mod emitter;
pub mod error;
pub mod link;
pub mod protocol;
pub mod state;
pub mod timings;

pub use controller::Controller;
pub use emitter::CommandEmitter;
pub use error::{Error, Result};
pub use link::{SerialLink, Transport};
pub use protocol::{Command, LineReader, Message, Mode};
pub use state::DeviceState;
pub use timings::{Direction, Light, LightTimings};

/// Default serial baud rate of the controller firmware.
pub const BAUD_RATE: u32 = 9600;

/// Default minimum interval between repeated mode commands, in milliseconds.
pub const MODE_COOLDOWN_MS: u64 = 3000;

/// Default minimum interval between timing nudges, in milliseconds.
pub const ADJUST_COOLDOWN_MS: u64 = 1000;
