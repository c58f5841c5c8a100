//! Four-part binary version stamp (`major.minor.patch.build`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version([u16; 4]);

impl Version {
    pub const fn new(major: u16, minor: u16, patch: u16, build: u16) -> Self {
        Self([major, minor, patch, build])
    }

    pub const fn from_parts(parts: [u16; 4]) -> Self {
        Self(parts)
    }

    /// Build a version from the `u32` fields stored in binary database headers.
    ///
    /// Each field is truncated to 16 bits.
    pub fn from_header_fields(fields: [u32; 4]) -> Self {
        Self(fields.map(|f| f as u16))
    }

    pub const fn parts(&self) -> [u16; 4] {
        self.0
    }

    pub const fn major(&self) -> u16 {
        self.0[0]
    }

    pub const fn minor(&self) -> u16 {
        self.0[1]
    }

    pub const fn patch(&self) -> u16 {
        self.0[2]
    }

    pub const fn build(&self) -> u16 {
        self.0[3]
    }

    /// Join all four parts with `sep`, e.g. `"1_10_163_0"` for `sep = "_"`.
    pub fn to_string_with(&self, sep: &str) -> String {
        self.0
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(sep)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

impl FromStr for Version {
    type Err = Error;

    /// Accepts `a.b.c` or `a.b.c.d`; a missing build part is zero.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let tokens: Vec<&str> = s.split('.').collect();
        if !(3..=4).contains(&tokens.len()) {
            return Err(Error::InvalidVersion(s.to_string()));
        }

        let mut parts = [0u16; 4];
        for (slot, token) in parts.iter_mut().zip(&tokens) {
            if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::InvalidVersion(s.to_string()));
            }
            *slot = token
                .parse()
                .map_err(|_| Error::InvalidVersion(s.to_string()))?;
        }

        Ok(Self(parts))
    }
}

impl TryFrom<String> for Version {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.to_string()
    }
}
