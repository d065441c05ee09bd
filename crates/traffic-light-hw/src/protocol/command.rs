//! Outbound command encoding.

use super::message::parse_int_prefix;
use super::{FIELD_SEPARATOR, MODE_PREFIX, TRAFFIC_LIGHT_PREFIX};
use crate::timings::LightTimings;
use crate::{Error, Result};
use std::str::FromStr;

/// Operating modes a host may request.
///
/// Variants are declared in priority order: when several labels arrive in one
/// frame the first one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mode {
    /// Pedestrian touch selection.
    TouchSelect,
    /// Solid red.
    Emergency,
    /// All lights blinking.
    Blink,
    /// All lights off.
    Off,
    /// Regular red/yellow/green cycle.
    Normal,
}

impl Mode {
    /// All modes, highest priority first.
    pub const ALL: [Mode; 5] = [
        Mode::TouchSelect,
        Mode::Emergency,
        Mode::Blink,
        Mode::Off,
        Mode::Normal,
    ];

    /// Wire name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::TouchSelect => "touch-select",
            Mode::Emergency => "emergency",
            Mode::Blink => "blink",
            Mode::Off => "OFF",
            Mode::Normal => "normal",
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "touch-select" | "touch_select" => Ok(Mode::TouchSelect),
            "emergency" => Ok(Mode::Emergency),
            "blink" => Ok(Mode::Blink),
            "off" => Ok(Mode::Off),
            "normal" => Ok(Mode::Normal),
            _ => Err(Error::InvalidMode(s.to_string())),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command line written to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Switch operating mode.
    Mode(Mode),
    /// Set the red, yellow and green phase durations.
    TrafficLight(LightTimings),
}

impl Command {
    /// Encodes the command as a newline-terminated line.
    pub fn encode(&self) -> String {
        match self {
            Command::Mode(mode) => format!("{}{}\n", MODE_PREFIX, mode),
            Command::TrafficLight(t) => format!(
                "{}{}:{}:{}\n",
                TRAFFIC_LIGHT_PREFIX, t.red, t.yellow, t.green
            ),
        }
    }

    /// Parses a command line back, e.g. when the device echoes it.
    ///
    /// Timing values are taken as sent; no clamping is applied.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();

        if let Some(mode) = line.strip_prefix(MODE_PREFIX) {
            return mode.parse().ok().map(Command::Mode);
        }

        let rest = line.strip_prefix(TRAFFIC_LIGHT_PREFIX)?;
        let mut fields = rest.split(FIELD_SEPARATOR).map(parse_int_prefix);
        let mut next = || -> Option<u32> { u32::try_from(fields.next()??).ok() };
        let (red, yellow, green) = (next()?, next()?, next()?);

        Some(Command::TrafficLight(LightTimings { red, yellow, green }))
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.encode().trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_mode() {
        assert_eq!(Command::Mode(Mode::Blink).encode(), "MODE:blink\n");
        assert_eq!(Command::Mode(Mode::Off).encode(), "MODE:OFF\n");
        assert_eq!(
            Command::Mode(Mode::TouchSelect).encode(),
            "MODE:touch-select\n"
        );
    }

    #[test]
    fn test_encode_timings() {
        let cmd = Command::TrafficLight(LightTimings::new(2000, 500, 2000));
        assert_eq!(cmd.encode(), "TRAFFIC_LIGHT:2000:500:2000\n");
        assert_eq!(cmd.to_string(), "TRAFFIC_LIGHT:2000:500:2000");
    }

    #[test]
    fn test_timings_round_trip() {
        let cmd = Command::TrafficLight(LightTimings::new(2000, 500, 2000));
        match Command::parse(&cmd.encode()) {
            Some(Command::TrafficLight(t)) => {
                assert_eq!((t.red, t.yellow, t.green), (2000, 500, 2000));
            }
            other => panic!("unexpected parse result: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_incomplete() {
        assert_eq!(Command::parse("TRAFFIC_LIGHT:2000:500"), None);
        assert_eq!(Command::parse("TRAFFIC_LIGHT:a:b:c"), None);
        assert_eq!(Command::parse("TRAFFIC_LIGHT:-1:500:500"), None);
        assert_eq!(Command::parse("MODE:disco"), None);
        assert_eq!(Command::parse("BRIGHTNESS:3"), None);
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(Command::parse("MODE:OFF\n"), Some(Command::Mode(Mode::Off)));
        assert_eq!(
            Command::parse("MODE: emergency"),
            Some(Command::Mode(Mode::Emergency))
        );
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("blink".parse::<Mode>().unwrap(), Mode::Blink);
        assert_eq!("OFF".parse::<Mode>().unwrap(), Mode::Off);
        assert_eq!("off".parse::<Mode>().unwrap(), Mode::Off);
        assert_eq!("Normal".parse::<Mode>().unwrap(), Mode::Normal);
        assert!("disco".parse::<Mode>().is_err());
    }

    #[test]
    fn test_mode_priority_order() {
        assert!(Mode::TouchSelect < Mode::Emergency);
        assert!(Mode::Emergency < Mode::Blink);
        assert!(Mode::Off < Mode::Normal);
        assert_eq!(Mode::ALL.iter().min(), Some(&Mode::TouchSelect));
    }
}
