//! # Account Identifiers
//!
//! 20-byte account addresses used for holders, spenders, the treasury and
//! every deployed ledger or derivative instance. Addresses render as
//! `0x`-prefixed lowercase hex and serialize the same way so configuration
//! files and scenario scripts can carry them as plain strings.
//!
//! ```rust
//! use types::Address;
//!
//! let treasury: Address = "0x83D0D842e6DB3B020f384a2af11bD14787BEC8E7".parse().unwrap();
//! assert_eq!(treasury.to_string(), "0x83d0d842e6db3b020f384a2af11bd14787bec8e7");
//! assert!(Address::ZERO.is_zero());
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Account address (20 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address, used as the counterparty of mints and burns
    pub const ZERO: Self = Self([0u8; 20]);

    /// Create a new address from raw bytes
    #[inline(always)]
    pub const fn new(inner: [u8; 20]) -> Self {
        Self(inner)
    }

    /// Deterministic test/simulation address whose last byte is `tag`
    pub const fn from_low_u8(tag: u8) -> Self {
        let mut bytes = [0u8; 20];
        bytes[19] = tag;
        Self(bytes)
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl From<[u8; 20]> for Address {
    #[inline(always)]
    fn from(inner: [u8; 20]) -> Self {
        Self(inner)
    }
}

/// Errors produced when parsing an address string
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("Invalid hex in address '{0}'")]
    InvalidHex(String),

    #[error("Address '{input}' has {len} bytes, expected 20")]
    InvalidLength { input: String, len: usize },
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes =
            hex::decode(trimmed).map_err(|_| AddressParseError::InvalidHex(s.to_string()))?;
        let array: [u8; 20] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| AddressParseError::InvalidLength {
                    input: s.to_string(),
                    len: bytes.len(),
                })?;
        Ok(Self(array))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display_roundtrip() {
        let addr: Address = "0x6B175474E89094C44Da98b954EedeAC495271d0F".parse().unwrap();
        assert_eq!(
            addr.to_string(),
            "0x6b175474e89094c44da98b954eedeac495271d0f"
        );

        let without_prefix: Address = "6b175474e89094c44da98b954eedeac495271d0f".parse().unwrap();
        assert_eq!(addr, without_prefix);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            "0x1234".parse::<Address>(),
            Err(AddressParseError::InvalidLength { len: 2, .. })
        ));
        assert!(matches!(
            "0xzz".parse::<Address>(),
            Err(AddressParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_serde_as_hex_string() {
        let addr = Address::from_low_u8(7);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x0000000000000000000000000000000000000007\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
