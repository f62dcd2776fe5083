//! Types Coder
//!
//! Encodes user-defined types on their own, without a discriminator.

use std::sync::Arc;

use crate::coder::error::{CoderError, CoderResult};
use crate::coder::layout::{Layout, LayoutRegistry, SizeInfo};
use crate::coder::value::Value;
use crate::idl::{Idl, IdlType, SchemaError, SchemaValidator};

#[derive(Debug, Clone)]
pub struct TypesCoder {
    registry: Arc<LayoutRegistry>,
    idl: Arc<Idl>,
}

impl TypesCoder {
    pub fn new(idl: Arc<Idl>, registry: Arc<LayoutRegistry>) -> Self {
        Self { registry, idl }
    }

    fn named_layout(&self, name: &str) -> CoderResult<Layout> {
        let named = self
            .registry
            .named(name)
            .ok_or_else(|| CoderError::unknown("type", name))?;
        if !named.params.is_empty() {
            return Err(SchemaError::GenericArity {
                name: name.to_string(),
                expected: named.params.len(),
                found: 0,
            }
            .into());
        }
        Ok(Layout::named(name))
    }

    /// Layout of a type expression, checked against the schema
    fn expr_layout(&self, ty: &IdlType) -> CoderResult<Layout> {
        SchemaValidator::new(&self.idl).check_type(ty, &[], "type expression")?;
        Ok(self.registry.layout_of(ty)?)
    }

    /// Encode a non-generic named type
    pub fn encode(&self, name: &str, value: &Value) -> CoderResult<Vec<u8>> {
        let layout = self.named_layout(name)?;
        Ok(self.registry.encode(&layout, value)?)
    }

    /// Decode a non-generic named type
    pub fn decode(&self, name: &str, data: &[u8]) -> CoderResult<Value> {
        let layout = self.named_layout(name)?;
        Ok(self.registry.decode(&layout, data)?)
    }

    /// Encode a value of any type expression, e.g. a generic instantiation
    pub fn encode_type(&self, ty: &IdlType, value: &Value) -> CoderResult<Vec<u8>> {
        let layout = self.expr_layout(ty)?;
        Ok(self.registry.encode(&layout, value)?)
    }

    /// Decode a value of any type expression
    pub fn decode_type(&self, ty: &IdlType, data: &[u8]) -> CoderResult<Value> {
        let layout = self.expr_layout(ty)?;
        Ok(self.registry.decode(&layout, data)?)
    }

    /// Minimum encoded size of a named type
    pub fn size_info(&self, name: &str) -> CoderResult<SizeInfo> {
        let layout = self.named_layout(name)?;
        Ok(self.registry.size_info(&layout)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idl::IdlGenericArg;

    fn coder(fixture: &str) -> TypesCoder {
        let idl = Arc::new(Idl::from_json(fixture).unwrap());
        let registry = Arc::new(LayoutRegistry::build(&idl, 64).unwrap());
        TypesCoder::new(idl, registry)
    }

    #[test]
    fn test_enum_type_roundtrip() {
        let coder = coder(include_str!("fixtures/counter.json"));
        let value = Value::variant("Rect", Value::Tuple(vec![2u16.into(), 5u16.into()]));
        let bytes = coder.encode("Shape", &value).unwrap();
        assert_eq!(bytes, vec![2, 2, 0, 5, 0]);
        assert_eq!(coder.decode("Shape", &bytes).unwrap(), value);
    }

    #[test]
    fn test_generic_type_needs_arguments() {
        let coder = coder(include_str!("fixtures/vault.json"));
        assert!(matches!(
            coder.encode("Pair", &Value::Unit),
            Err(CoderError::Schema(SchemaError::GenericArity { .. }))
        ));

        let ty = IdlType::Defined {
            name: "Pair".to_string(),
            generics: vec![
                IdlGenericArg::Type { ty: IdlType::U8 },
                IdlGenericArg::Const {
                    value: "3".to_string(),
                },
            ],
        };
        let value = Value::record([
            ("head", Value::from(1u8)),
            ("tail", Value::List(vec![2u8.into(), 3u8.into(), 4u8.into()])),
        ]);
        let bytes = coder.encode_type(&ty, &value).unwrap();
        assert_eq!(bytes, vec![1, 2, 3, 4]);
        assert_eq!(coder.decode_type(&ty, &bytes).unwrap(), value);
    }

    #[test]
    fn test_type_expression_checked() {
        let coder = coder(include_str!("fixtures/vault.json"));
        let wrong_arity = IdlType::defined("Pair");
        assert!(matches!(
            coder.encode_type(&wrong_arity, &Value::Unit),
            Err(CoderError::Schema(SchemaError::GenericArity { .. }))
        ));
        assert!(matches!(
            coder.decode_type(&IdlType::defined("Missing"), &[]),
            Err(CoderError::Schema(SchemaError::UndeclaredType { .. }))
        ));
    }

    #[test]
    fn test_unknown_type() {
        let coder = coder(include_str!("fixtures/counter.json"));
        assert!(matches!(
            coder.decode("Nope", &[]),
            Err(CoderError::UnknownItem { kind: "type", .. })
        ));
    }

    #[test]
    fn test_recursive_size() {
        let coder = coder(include_str!("fixtures/counter.json"));
        let info = coder.size_info("Node").unwrap();
        assert_eq!(info.min, 2);
        assert!(!info.fixed);
    }
}
