//! 32-byte account keys
//!
//! Keys travel on the wire as 32 raw bytes and are displayed as base58,
//! the way program ids appear in transaction logs.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of a public key in bytes
pub const PUBKEY_BYTES: usize = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PubkeyError {
    #[error("invalid base58: {0}")]
    InvalidBase58(String),
    #[error("invalid key length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// A 32-byte public key (account address or program id)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Pubkey(pub [u8; PUBKEY_BYTES]);

impl Pubkey {
    /// Create from raw bytes
    pub const fn new_from_array(bytes: [u8; PUBKEY_BYTES]) -> Self {
        Self(bytes)
    }

    /// Create from a byte slice of exactly 32 bytes
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, PubkeyError> {
        let arr: [u8; PUBKEY_BYTES] = bytes
            .try_into()
            .map_err(|_| PubkeyError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; PUBKEY_BYTES] {
        &self.0
    }

    /// Convert to base58 string
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// Parse from base58 string
    pub fn from_base58(s: &str) -> Result<Self, PubkeyError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| PubkeyError::InvalidBase58(e.to_string()))?;
        Self::try_from_slice(&bytes)
    }
}

impl FromStr for Pubkey {
    type Err = PubkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self.to_base58())
    }
}

impl Serialize for Pubkey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Pubkey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base58(&s).map_err(serde::de::Error::custom)
    }
}
