//! State Coder
//!
//! The deprecated singleton state account. Its data is
//! `discriminator(state, Name) ++ struct`; methods on it are encoded by
//! [`crate::coder::InstructionCoder::encode_state`].

use std::sync::Arc;

use crate::coder::codec::CodecError;
use crate::coder::error::{CoderError, CoderResult};
use crate::coder::layout::{Layout, LayoutRegistry};
use crate::coder::value::Value;
use crate::crypto::{Discriminator, Namespace, DISCRIMINATOR_LEN};
use crate::idl::IdlState;

#[derive(Debug, Clone)]
pub struct StateCoder {
    registry: Arc<LayoutRegistry>,
    name: String,
    discriminator: Discriminator,
    layout: Layout,
}

impl StateCoder {
    pub fn new(state: &IdlState, registry: Arc<LayoutRegistry>) -> Self {
        let name = state.strct.name.clone();
        Self {
            registry,
            discriminator: Discriminator::new(Namespace::State, &name),
            layout: Layout::named(&name),
            name,
        }
    }

    /// Name of the state struct
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn discriminator(&self) -> Discriminator {
        self.discriminator
    }

    fn check_name(&self, name: &str) -> CoderResult<()> {
        if name != self.name {
            return Err(CoderError::unknown("state", name));
        }
        Ok(())
    }

    /// Encode the state account, tag first
    pub fn encode(&self, name: &str, value: &Value) -> CoderResult<Vec<u8>> {
        self.check_name(name)?;
        Ok(self
            .registry
            .encode_with_prefix(self.discriminator.as_bytes(), &self.layout, value)?)
    }

    /// Decode the state account, checking its tag
    pub fn decode(&self, data: &[u8]) -> CoderResult<Value> {
        let actual = Discriminator::read_prefix(data).ok_or(CodecError::BufferUnderflow {
            needed: DISCRIMINATOR_LEN,
            available: data.len(),
        })?;
        if actual != self.discriminator {
            return Err(CoderError::AccountDiscriminatorMismatch {
                account: self.name.clone(),
                expected: self.discriminator,
                actual,
            });
        }
        Ok(self
            .registry
            .decode(&self.layout, &data[DISCRIMINATOR_LEN..])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Pubkey;
    use crate::idl::Idl;

    fn coder() -> StateCoder {
        let idl = Idl::from_json(include_str!("fixtures/counter.json")).unwrap();
        let registry = Arc::new(LayoutRegistry::build(&idl, 64).unwrap());
        StateCoder::new(idl.state.as_ref().unwrap(), registry)
    }

    #[test]
    fn test_roundtrip() {
        let coder = coder();
        let value = Value::record([("admin", Value::from(Pubkey::new_from_array([6; 32])))]);
        let data = coder.encode("Globals", &value).unwrap();
        assert_eq!(
            &data[..8],
            Discriminator::new(Namespace::State, "Globals").as_bytes()
        );
        assert_eq!(data.len(), 40);
        assert_eq!(coder.decode(&data).unwrap(), value);
    }

    #[test]
    fn test_state_namespace_vector() {
        let disc = Discriminator::new(Namespace::State, "Counter");
        assert_eq!(disc.0, [70, 38, 154, 162, 220, 153, 132, 32]);
    }

    #[test]
    fn test_wrong_tag() {
        let coder = coder();
        assert!(matches!(
            coder.decode(&[0; 40]),
            Err(CoderError::AccountDiscriminatorMismatch { .. })
        ));
        assert!(matches!(
            coder.encode("Other", &Value::Unit),
            Err(CoderError::UnknownItem { kind: "state", .. })
        ));
    }
}
