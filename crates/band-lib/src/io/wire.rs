use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One decoded line of the bracelet's ASCII protocol: a bare PPG value, or
/// `ppg,temperature` when the firmware streams both channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub ppg: f64,
    pub temp: Option<f64>,
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("empty line")]
    Empty,
    #[error("expected 1 or 2 fields, got {0}")]
    FieldCount(usize),
    #[error("invalid number {token:?}: {source}")]
    BadNumber {
        token: String,
        source: std::num::ParseFloatError,
    },
}

/// Parse one newline-terminated sample line. Callers log and discard the
/// error; a bad line never ends a session.
pub fn parse_line(line: &str) -> Result<Reading, WireError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(WireError::Empty);
    }
    let fields: Vec<&str> = trimmed.split(',').collect();
    match fields.as_slice() {
        [ppg] => Ok(Reading {
            ppg: parse_field(ppg)?,
            temp: None,
        }),
        [ppg, temp] => Ok(Reading {
            ppg: parse_field(ppg)?,
            temp: Some(parse_field(temp)?),
        }),
        other => Err(WireError::FieldCount(other.len())),
    }
}

fn parse_field(token: &str) -> Result<f64, WireError> {
    token.trim().parse().map_err(|source| WireError::BadNumber {
        token: token.trim().to_string(),
        source,
    })
}

/// Indicator colors the bracelet LED understands. Each maps to the single
/// ASCII command byte the firmware expects; the device may echo a response
/// line, which is passed back unvalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedColor {
    Red,
    Yellow,
    Green,
    Off,
}

impl LedColor {
    pub fn command_byte(self) -> u8 {
        match self {
            Self::Red => b'R',
            Self::Yellow => b'Y',
            Self::Green => b'G',
            Self::Off => b'O',
        }
    }

    pub fn from_command_byte(byte: u8) -> Option<Self> {
        match byte {
            b'R' => Some(Self::Red),
            b'Y' => Some(Self::Yellow),
            b'G' => Some(Self::Green),
            b'O' => Some(Self::Off),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ppg_only_line() {
        let reading = parse_line("523.0\r\n").unwrap();
        assert_eq!(reading.ppg, 523.0);
        assert_eq!(reading.temp, None);
    }

    #[test]
    fn parses_ppg_and_temperature() {
        let reading = parse_line("512.4,36.72").unwrap();
        assert_eq!(reading.ppg, 512.4);
        assert_eq!(reading.temp, Some(36.72));
    }

    #[test]
    fn rejects_non_numeric_token() {
        let err = parse_line("hello,36.5").unwrap_err();
        assert!(matches!(err, WireError::BadNumber { .. }));
    }

    #[test]
    fn rejects_wrong_field_count() {
        let err = parse_line("1.0,2.0,3.0").unwrap_err();
        assert!(matches!(err, WireError::FieldCount(3)));
    }

    #[test]
    fn rejects_blank_line() {
        assert!(matches!(parse_line("   \r\n"), Err(WireError::Empty)));
    }

    #[test]
    fn led_commands_round_trip() {
        for color in [LedColor::Red, LedColor::Yellow, LedColor::Green, LedColor::Off] {
            assert_eq!(LedColor::from_command_byte(color.command_byte()), Some(color));
        }
        assert_eq!(LedColor::from_command_byte(b'x'), None);
    }
}
