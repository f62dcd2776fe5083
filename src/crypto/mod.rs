//! Cryptographic primitives used by the coder
//!
//! Provides account keys and content-derived discriminators.

pub mod hashing;
pub mod keys;

pub use hashing::{discriminator, Discriminator, Namespace, DISCRIMINATOR_LEN, EVENT_IX_TAG};
pub use keys::{Pubkey, PubkeyError, PUBKEY_BYTES};
