//! Per-namespace discriminator routing tables
//!
//! Each category coder owns one table mapping the 8-byte tag of every item
//! it can decode back to that item. Tables are filled once at construction;
//! a second, differently named item with the same tag aborts construction.

use std::collections::HashMap;

use crate::coder::codec::CodecError;
use crate::coder::error::{CoderError, CoderResult};
use crate::crypto::{Discriminator, Namespace, DISCRIMINATOR_LEN};
use crate::idl::SchemaError;

/// Tag of an item: its explicit IDL discriminator, or the derived one
pub fn item_discriminator(
    namespace: Namespace,
    name: &str,
    explicit: Option<&[u8]>,
) -> Result<Discriminator, SchemaError> {
    match explicit {
        Some(bytes) => {
            let bytes: [u8; DISCRIMINATOR_LEN] =
                bytes
                    .try_into()
                    .map_err(|_| SchemaError::InvalidDiscriminator {
                        name: name.to_string(),
                        len: bytes.len(),
                    })?;
            Ok(Discriminator::from_bytes(bytes))
        }
        None => Ok(Discriminator::new(namespace, name)),
    }
}

/// Tag of an instruction or state method; names are hashed in snake_case
pub fn sighash(namespace: Namespace, ix_name: &str) -> Discriminator {
    Discriminator::new(namespace, &to_snake_case(ix_name))
}

/// Convert a camelCase or PascalCase identifier to snake_case
///
/// Runs of capitals are kept together (`setURI` -> `set_uri`,
/// `HTTPServer` -> `http_server`).
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }
        if c.is_uppercase() {
            let prev = if i > 0 { chars.get(i - 1) } else { None };
            let next = chars.get(i + 1);
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary && !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Tag -> item index for one namespace
#[derive(Debug, Clone)]
pub struct DiscriminatorTable {
    namespace: Namespace,
    names: Vec<String>,
    tags: Vec<Discriminator>,
    index: HashMap<Discriminator, usize>,
}

impl DiscriminatorTable {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            names: Vec::new(),
            tags: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Register an item, returning its index
    ///
    /// Fails with `AmbiguousDiscriminator` if a differently named item
    /// already holds the same tag.
    pub fn insert(&mut self, name: &str, tag: Discriminator) -> CoderResult<usize> {
        if let Some(&existing) = self.index.get(&tag) {
            if self.names[existing] != name {
                return Err(CoderError::AmbiguousDiscriminator {
                    namespace: self.namespace,
                    first: self.names[existing].clone(),
                    second: name.to_string(),
                });
            }
            return Ok(existing);
        }
        let idx = self.names.len();
        self.names.push(name.to_string());
        self.tags.push(tag);
        self.index.insert(tag, idx);
        Ok(idx)
    }

    /// Index of the item holding `tag`
    pub fn find(&self, tag: &Discriminator) -> Option<usize> {
        self.index.get(tag).copied()
    }

    /// Split `data` into the matching item index and the payload after the tag
    pub fn route<'d>(&self, data: &'d [u8]) -> CoderResult<(usize, &'d [u8])> {
        let tag = Discriminator::read_prefix(data).ok_or(CodecError::BufferUnderflow {
            needed: DISCRIMINATOR_LEN,
            available: data.len(),
        })?;
        let idx = self.find(&tag).ok_or(CoderError::UnknownDiscriminator {
            namespace: self.namespace,
            discriminator: tag,
        })?;
        Ok((idx, &data[DISCRIMINATOR_LEN..]))
    }

    pub fn name(&self, idx: usize) -> Option<&str> {
        self.names.get(idx).map(String::as_str)
    }

    pub fn tag(&self, idx: usize) -> Option<Discriminator> {
        self.tags.get(idx).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
