// crates/ferry-core/src/types.rs
//
// Primitive identifiers shared by every chain in the Ferry protocol.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::FerryError;

/// Chain identifier in the relay's own numbering (not the chain's native id).
pub type ChainId = u16;

/// Token amount in the smallest unit (18 decimals).
pub type Amount = u128;

/// Identifier of a reward pool on a satellite chain.
pub type PoolId = u32;

/// A 20-byte account or contract address.
///
/// The all-zero address means "unset" wherever an optional address is stored
/// on chain. Serializes as a `0x`-prefixed hex string.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Derive a deterministic address from a label.
    ///
    /// Takes the first 20 bytes of SHA-256(label). Used by the simulation and
    /// tests to give every contract and account a stable identity.
    pub fn derive(label: &str) -> Self {
        let digest = Sha256::digest(label.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        Address(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = FerryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)?;
        let array: [u8; 20] = bytes.try_into().map_err(|v: Vec<u8>| {
            FerryError::Codec(format!("address must be 20 bytes, got {}", v.len()))
        })?;
        Ok(Address(array))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_deterministic() {
        let a = Address::derive("ferry/1/coordinator");
        let b = Address::derive("ferry/1/coordinator");
        let c = Address::derive("ferry/2/coordinator");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.is_zero());
    }

    #[test]
    fn test_display_and_parse() {
        let addr = Address([0xab; 20]);
        let text = addr.to_string();
        assert_eq!(text, format!("0x{}", "ab".repeat(20)));
        assert_eq!(text.parse::<Address>().unwrap(), addr);
        // Prefix is optional on input.
        assert_eq!("ab".repeat(20).parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn test_parse_wrong_length() {
        assert!(matches!(
            "0xabcd".parse::<Address>(),
            Err(FerryError::Codec(_))
        ));
        assert!("0xzz".parse::<Address>().is_err());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let addr = Address::derive("dao");
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
