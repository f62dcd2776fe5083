//! Coder-level errors

use thiserror::Error;

use crate::coder::codec::CodecError;
use crate::crypto::{Discriminator, Namespace};
use crate::idl::SchemaError;

/// Errors returned by coder construction and by every encode/decode call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoderError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("ambiguous {namespace} discriminator: '{first}' and '{second}' share a tag")]
    AmbiguousDiscriminator {
        namespace: Namespace,
        first: String,
        second: String,
    },

    #[error("unknown {namespace} discriminator: {discriminator}")]
    UnknownDiscriminator {
        namespace: Namespace,
        discriminator: Discriminator,
    },

    #[error("account discriminator mismatch for '{account}': expected {expected}, found {actual}")]
    AccountDiscriminatorMismatch {
        account: String,
        expected: Discriminator,
        actual: Discriminator,
    },

    #[error("{coder} coder does not support {operation}")]
    NotSupported {
        coder: &'static str,
        operation: &'static str,
    },

    #[error("unknown {kind}: {name}")]
    UnknownItem { kind: &'static str, name: String },

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("invalid text encoding: {0}")]
    InvalidEncoding(String),
}

impl CoderError {
    pub(crate) fn not_supported(coder: &'static str, operation: &'static str) -> Self {
        CoderError::NotSupported { coder, operation }
    }

    pub(crate) fn unknown(kind: &'static str, name: &str) -> Self {
        CoderError::UnknownItem {
            kind,
            name: name.to_string(),
        }
    }
}

pub type CoderResult<T> = Result<T, CoderError>;
