//! Colour codes
//!
//! A [`ColorCode`] is six hex digits naming an RGB triple. It is the key for
//! caching, locking and image generation, so it is normalized on parse:
//! `#1a2b3c`, `1a2b3c` and `1A2B3C` are the same code.

use crate::error::{SwatchError, SwatchResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Validated, canonical (uppercase) six-digit hex colour
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColorCode(String);

impl ColorCode {
    /// Parse a colour code, accepting an optional leading `#`
    pub fn parse(input: &str) -> SwatchResult<Self> {
        let digits = input.strip_prefix('#').unwrap_or(input);

        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(SwatchError::InvalidColor(input.to_string()));
        }

        Ok(Self(digits.to_ascii_uppercase()))
    }

    /// Canonical hex digits, without `#`
    pub fn hex(&self) -> &str {
        &self.0
    }

    /// Red, green and blue channels
    pub fn rgb(&self) -> (u8, u8, u8) {
        let channel = |i: usize| {
            // Validated on construction, so every pair is hex
            u8::from_str_radix(&self.0[i..i + 2], 16).unwrap_or_default()
        };
        (channel(0), channel(2), channel(4))
    }
}

impl fmt::Display for ColorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ColorCode {
    type Err = SwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ColorCode {
    type Error = SwatchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ColorCode> for String {
    fn from(color: ColorCode) -> Self {
        color.0
    }
}
