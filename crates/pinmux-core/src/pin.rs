//! Physical pins and alternate-function pin variants.
//!
//! Board definitions write pins as a port letter plus two digits (`B04`).
//! Capability tables write them in the Arduino-core form (`PB_4`), with an
//! optional `_ALTn` suffix naming an alternate mapping of the same physical
//! pin. Both forms parse into the same [`Pin`]; the suffix becomes the
//! variant tag of a [`PinVariant`] and is only turned back into text by
//! [`PinVariant::canonical`].

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::{CoreError, Result};

/// Highest GPIO port letter accepted.
const MAX_PORT: char = 'K';

/// Highest pin number within a port.
const MAX_PIN_NUMBER: u8 = 15;

/// A physical MCU pin: GPIO port letter and pin number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pin {
    port: char,
    number: u8,
}

impl Pin {
    /// Create a pin, validating the port letter and number range.
    pub fn new(port: char, number: u8) -> Result<Self> {
        let port = port.to_ascii_uppercase();
        if !('A'..=MAX_PORT).contains(&port) {
            return Err(CoreError::InvalidPin {
                token: format!("{port}{number}"),
                detail: format!("port must be A..={MAX_PORT}"),
            });
        }
        if number > MAX_PIN_NUMBER {
            return Err(CoreError::InvalidPin {
                token: format!("{port}{number}"),
                detail: format!("pin number must be 0..={MAX_PIN_NUMBER}"),
            });
        }
        Ok(Self { port, number })
    }

    /// GPIO port letter (uppercase).
    pub fn port(&self) -> char {
        self.port
    }

    /// Pin number within the port.
    pub fn number(&self) -> u8 {
        self.number
    }

    /// Parse a board-definition pin token: one port letter followed by exactly
    /// two digits (`A07`, `b04`).
    pub fn parse_board_token(token: &str) -> Result<Self> {
        let invalid = |detail: &str| CoreError::InvalidPin {
            token: token.to_string(),
            detail: detail.to_string(),
        };

        let mut chars = token.chars();
        let port = chars
            .next()
            .filter(|c| c.is_ascii_alphabetic())
            .ok_or_else(|| invalid("expected a port letter"))?;
        let digits = chars.as_str();
        if digits.len() != 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("expected a port letter followed by two digits"));
        }
        let number: u8 = digits
            .parse()
            .map_err(|_| invalid("pin number is not numeric"))?;
        Pin::new(port, number).map_err(|_| invalid("pin out of range"))
    }

    /// Arduino-core spelling of the default mapping (`PB_4`).
    pub fn arduino_name(&self) -> String {
        format!("P{}_{}", self.port, self.number)
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.port, self.number)
    }
}

impl FromStr for Pin {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Pin::parse_board_token(s)
    }
}

impl Serialize for Pin {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Normalize a board-definition pin token to its canonical spelling.
///
/// Returns `None` when the token is not a valid pin. Normalizing an already
/// normalized token returns it unchanged.
pub fn normalize_pin_token(token: &str) -> Option<String> {
    Pin::parse_board_token(token.trim())
        .ok()
        .map(|pin| pin.to_string())
}

/// A pin together with the alternate-function variant it is used through.
///
/// `variant == None` is the hardware default mapping; `Some(n)` is the
/// `_ALTn` mapping of the same physical pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PinVariant {
    /// The physical pin.
    pub base: Pin,
    /// Alternate mapping index, if not the default.
    pub variant: Option<u8>,
}

impl PinVariant {
    /// The default mapping of a pin.
    pub fn default_of(base: Pin) -> Self {
        Self {
            base,
            variant: None,
        }
    }

    /// An alternate mapping of a pin.
    pub fn alternate(base: Pin, variant: u8) -> Self {
        Self {
            base,
            variant: Some(variant),
        }
    }

    /// Whether this is the hardware default mapping.
    pub fn is_default(&self) -> bool {
        self.variant.is_none()
    }

    /// Parse a capability-table pin name (`PA_7`, `PB_0_ALT1`, `PC13`).
    pub fn parse_table_name(name: &str) -> Result<Self> {
        let invalid = |detail: &str| CoreError::InvalidPin {
            token: name.to_string(),
            detail: detail.to_string(),
        };

        let rest = name
            .strip_prefix('P')
            .ok_or_else(|| invalid("expected a 'P' prefix"))?;
        let (pin_part, variant) = match rest.find("_ALT") {
            Some(pos) => {
                let tag = &rest[pos + 4..];
                let n: u8 = tag
                    .parse()
                    .map_err(|_| invalid("variant suffix must be _ALT<n>"))?;
                if n == 0 {
                    return Err(invalid("variant index starts at 1"));
                }
                (&rest[..pos], Some(n))
            }
            None => (rest, None),
        };

        let mut chars = pin_part.chars();
        let port = chars
            .next()
            .filter(|c| c.is_ascii_uppercase())
            .ok_or_else(|| invalid("expected a port letter"))?;
        let digits = chars.as_str().trim_start_matches('_');
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("expected a pin number"));
        }
        let number: u8 = digits.parse().map_err(|_| invalid("pin number overflow"))?;
        let base = Pin::new(port, number).map_err(|_| invalid("pin out of range"))?;
        Ok(Self { base, variant })
    }

    /// Arduino-core spelling including the variant suffix (`PB_0_ALT1`).
    ///
    /// This is the only place the suffixed form is produced.
    pub fn canonical(&self) -> String {
        match self.variant {
            None => self.base.arduino_name(),
            Some(n) => format!("{}_ALT{n}", self.base.arduino_name()),
        }
    }
}

impl fmt::Display for PinVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl Serialize for PinVariant {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
