//! Newline-delimited text protocol spoken by the controller firmware.
//!
//! Inbound (device to host):
//! - `MODE:<name>`
//! - `BRIGHTNESS:<integer>`
//! - `LED_STATE:<red>:<yellow>:<green>`
//!
//! Outbound (host to device):
//! - `MODE:<name>`
//! - `TRAFFIC_LIGHT:<red ms>:<yellow ms>:<green ms>`

mod command;
mod message;
mod reader;

pub use command::{Command, Mode};
pub use message::{parse_int_prefix, Message};
pub use reader::LineReader;

/// Prefix of mode messages, in both directions.
pub const MODE_PREFIX: &str = "MODE:";

/// Prefix of brightness reports.
pub const BRIGHTNESS_PREFIX: &str = "BRIGHTNESS:";

/// Prefix of light state reports.
pub const LED_STATE_PREFIX: &str = "LED_STATE:";

/// Prefix of phase timing commands.
pub const TRAFFIC_LIGHT_PREFIX: &str = "TRAFFIC_LIGHT:";

/// Field separator inside a line.
pub const FIELD_SEPARATOR: char = ':';

/// Line terminator.
pub const LINE_TERMINATOR: u8 = b'\n';
