//! Fixed-width identifiers used across the access API.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::RequestError;

/// A 32-byte entity identifier (block ID, transaction ID, collection ID).
///
/// Rendered as 64 lowercase hex characters with no prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Identifier(pub [u8; 32]);

impl Identifier {
    pub const LEN: usize = 32;

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Identifier {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| RequestError::InvalidIdentifier {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_slice(&bytes).ok_or_else(|| RequestError::InvalidIdentifier {
            value: s.to_string(),
            reason: format!("expected {} bytes, got {}", Self::LEN, bytes.len()),
        })
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// An 8-byte account address.
///
/// Rendered as `0x` followed by 16 lowercase hex characters; parsing accepts
/// the value with or without the prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 8]);

impl Address {
    pub const LEN: usize = 8;

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; 8] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Hex form without the `0x` prefix, as used inside qualified type IDs.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        if raw.len() != Self::LEN * 2 {
            return Err(RequestError::InvalidAddress {
                value: s.to_string(),
                reason: format!("expected {} hex chars, got {}", Self::LEN * 2, raw.len()),
            });
        }
        let bytes = hex::decode(raw).map_err(|e| RequestError::InvalidAddress {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_slice(&bytes).ok_or_else(|| RequestError::InvalidAddress {
            value: s.to_string(),
            reason: "wrong length".into(),
        })
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
