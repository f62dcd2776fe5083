//! Content-derived discriminators using SHA-256
//!
//! Every routable item is identified by the first 8 bytes of
//! `sha256("{namespace}:{name}")`. This enables:
//! - Registry-free routing (same name = same tag, in any process)
//! - Type checks on raw account data
//! - Picking event payloads out of mixed log streams

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of a discriminator in bytes
pub const DISCRIMINATOR_LEN: usize = 8;

/// Tag prefixed to self-invocation payloads that carry an event.
///
/// This is `sha256("anchor:event")[..8]` read as a big-endian u64 and
/// written little-endian, so it is the byte-reversed hash prefix.
pub const EVENT_IX_TAG: [u8; DISCRIMINATOR_LEN] = [0xe4, 0x45, 0xa5, 0x2e, 0x51, 0xcb, 0x9a, 0x1d];

/// Routing domain of a discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Instructions
    Global,
    /// Persisted account types
    Account,
    /// Emitted events
    Event,
    /// Legacy singleton state account and its methods
    State,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Global => "global",
            Namespace::Account => "account",
            Namespace::Event => "event",
            Namespace::State => "state",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An 8-byte routing tag
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Discriminator(pub [u8; DISCRIMINATOR_LEN]);

impl Discriminator {
    /// Compute the discriminator for `name` in `namespace`
    pub fn new(namespace: Namespace, name: &str) -> Self {
        Self::from_preimage(&format!("{}:{}", namespace, name))
    }

    /// Hash an arbitrary preimage and keep the first 8 bytes
    pub fn from_preimage(preimage: &str) -> Self {
        let digest = Sha256::digest(preimage.as_bytes());
        let mut bytes = [0u8; DISCRIMINATOR_LEN];
        bytes.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
        Self(bytes)
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; DISCRIMINATOR_LEN]) -> Self {
        Self(bytes)
    }

    /// Read the leading discriminator of a buffer, if it is long enough
    pub fn read_prefix(data: &[u8]) -> Option<Self> {
        data.get(..DISCRIMINATOR_LEN)
            .and_then(|prefix| prefix.try_into().ok())
            .map(Self)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; DISCRIMINATOR_LEN] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Discriminator({})", self.to_hex())
    }
}

/// Shorthand for [`Discriminator::new`]
pub fn discriminator(namespace: Namespace, name: &str) -> Discriminator {
    Discriminator::new(namespace, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_instruction_discriminator() {
        let disc = discriminator(Namespace::Global, "initialize");
        assert_eq!(disc.0, [175, 175, 109, 31, 13, 152, 155, 237]);
    }

    #[test]
    fn test_known_account_and_event_discriminators() {
        assert_eq!(
            discriminator(Namespace::Account, "Counter").0,
            [255, 176, 4, 245, 188, 253, 124, 25]
        );
        assert_eq!(
            discriminator(Namespace::Event, "Transferred").0,
            [21, 132, 239, 64, 146, 239, 166, 68]
        );
        assert_eq!(
            discriminator(Namespace::State, "Counter").0,
            [70, 38, 154, 162, 220, 153, 132, 32]
        );
    }

    #[test]
    fn test_deterministic() {
        let a = discriminator(Namespace::Global, "initialize");
        let b = discriminator(Namespace::Global, "initialize");
        assert_eq!(a, b);
    }

    #[test]
    fn test_namespace_separates() {
        assert_ne!(
            discriminator(Namespace::Global, "Counter"),
            discriminator(Namespace::Account, "Counter")
        );
    }

    #[test]
    fn test_event_ix_tag_is_reversed_hash_prefix() {
        let mut hashed = Discriminator::from_preimage("anchor:event").0;
        hashed.reverse();
        assert_eq!(hashed, EVENT_IX_TAG);
    }

    #[test]
    fn test_read_prefix() {
        assert!(Discriminator::read_prefix(&[1, 2, 3]).is_none());
        let disc = Discriminator::read_prefix(&[1, 2, 3, 4, 5, 6, 7, 8, 9]).unwrap();
        assert_eq!(disc.0, [1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
