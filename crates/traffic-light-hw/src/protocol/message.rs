//! Inbound message classification.

use super::{BRIGHTNESS_PREFIX, FIELD_SEPARATOR, LED_STATE_PREFIX, MODE_PREFIX};

/// A recognized report from the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Operating mode, stored verbatim.
    Mode(String),
    /// Potentiometer brightness.
    Brightness(i64),
    /// Raw red, yellow and green light tokens.
    LedState {
        red: String,
        yellow: String,
        green: String,
    },
}

impl Message {
    /// Classifies a trimmed line.
    ///
    /// Returns `None` for unknown prefixes, non-numeric brightness and light
    /// reports with fewer than three values.
    pub fn parse(line: &str) -> Option<Self> {
        if let Some(mode) = line.strip_prefix(MODE_PREFIX) {
            return Some(Message::Mode(mode.to_string()));
        }

        if let Some(value) = line.strip_prefix(BRIGHTNESS_PREFIX) {
            return parse_int_prefix(value).map(Message::Brightness);
        }

        if line.starts_with(LED_STATE_PREFIX) {
            let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
            if fields.len() < 4 {
                return None;
            }
            return Some(Message::LedState {
                red: fields[1].to_string(),
                yellow: fields[2].to_string(),
                green: fields[3].to_string(),
            });
        }

        None
    }
}

/// Parses the leading base-10 integer of `s`.
///
/// Leading whitespace and a single sign are accepted, parsing stops at the
/// first non-digit. Returns `None` when no digit is found or the value does not
/// fit in an `i64`.
pub fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let sign_len = usize::from(s.starts_with(['-', '+']));
    let digits = &s[sign_len..];

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    s[..sign_len + end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_is_verbatim() {
        assert_eq!(
            Message::parse("MODE:blink"),
            Some(Message::Mode("blink".to_string()))
        );
        assert_eq!(
            Message::parse("MODE: emergency"),
            Some(Message::Mode(" emergency".to_string()))
        );
        assert_eq!(Message::parse("MODE:"), Some(Message::Mode(String::new())));
    }

    #[test]
    fn test_brightness() {
        assert_eq!(Message::parse("BRIGHTNESS:128"), Some(Message::Brightness(128)));
        assert_eq!(Message::parse("BRIGHTNESS:300"), Some(Message::Brightness(300)));
        assert_eq!(Message::parse("BRIGHTNESS:-4"), Some(Message::Brightness(-4)));
        assert_eq!(Message::parse("BRIGHTNESS:abc"), None);
        assert_eq!(Message::parse("BRIGHTNESS:"), None);
    }

    #[test]
    fn test_led_state() {
        assert_eq!(
            Message::parse("LED_STATE:R1:off:off"),
            Some(Message::LedState {
                red: "R1".to_string(),
                yellow: "off".to_string(),
                green: "off".to_string(),
            })
        );
        assert_eq!(Message::parse("LED_STATE:R1:off"), None);
        assert_eq!(Message::parse("LED_STATE:"), None);
    }

    #[test]
    fn test_led_state_extra_fields_ignored() {
        assert_eq!(
            Message::parse("LED_STATE:R0:Y1:G0:extra"),
            Some(Message::LedState {
                red: "R0".to_string(),
                yellow: "Y1".to_string(),
                green: "G0".to_string(),
            })
        );
    }

    #[test]
    fn test_unknown_lines() {
        assert_eq!(Message::parse(""), None);
        assert_eq!(Message::parse("hello"), None);
        assert_eq!(Message::parse("mode:blink"), None);
        assert_eq!(Message::parse("TRAFFIC_LIGHT:1:2:3"), None);
    }

    #[test]
    fn test_parse_int_prefix() {
        assert_eq!(parse_int_prefix("42"), Some(42));
        assert_eq!(parse_int_prefix("  7"), Some(7));
        assert_eq!(parse_int_prefix("+15"), Some(15));
        assert_eq!(parse_int_prefix("12abc"), Some(12));
        assert_eq!(parse_int_prefix("-"), None);
        assert_eq!(parse_int_prefix("x1"), None);
        assert_eq!(parse_int_prefix("99999999999999999999"), None);
        assert_eq!(parse_int_prefix("-9223372036854775808"), Some(i64::MIN));
        assert_eq!(parse_int_prefix("9223372036854775807x"), Some(i64::MAX));
        assert_eq!(parse_int_prefix("-12.5"), Some(-12));
    }
}
