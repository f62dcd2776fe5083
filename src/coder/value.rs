//! Dynamic values flowing through the schema-driven coders
//!
//! A [`Value`] is the structured side of every encode/decode call. Decoding
//! always yields the canonical shape (unsigned integers as `UInt`, signed as
//! `Int`, both fixed arrays and vectors as `List`); encoding additionally
//! accepts any integer variant whose value fits the target width.

use serde_json::{json, Map as JsonMap, Value as JsonValue};

use crate::crypto::Pubkey;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Payload of a field-less enum variant
    Unit,
    Bool(bool),
    /// Signed integer of any width
    Int(i128),
    /// Unsigned integer of any width
    UInt(u128),
    Float(f64),
    PublicKey(Pubkey),
    Bytes(Vec<u8>),
    String(String),
    /// Vector or fixed-size array
    List(Vec<Value>),
    Option(Option<Box<Value>>),
    /// Map entries in wire order
    Map(Vec<(Value, Value)>),
    /// Named fields in declared order
    Struct(Vec<(String, Value)>),
    /// Unnamed fields in declared order
    Tuple(Vec<Value>),
    Enum { variant: String, data: Box<Value> },
}

impl Value {
    /// Build a struct value from `(name, value)` pairs
    pub fn record<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        Value::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// An absent option
    pub fn none() -> Self {
        Value::Option(None)
    }

    /// A present option
    pub fn some(value: Value) -> Self {
        Value::Option(Some(Box::new(value)))
    }

    /// A field-less enum variant
    pub fn unit_variant(variant: &str) -> Self {
        Value::Enum {
            variant: variant.to_string(),
            data: Box::new(Value::Unit),
        }
    }

    /// An enum variant carrying a payload
    pub fn variant(variant: &str, data: Value) -> Self {
        Value::Enum {
            variant: variant.to_string(),
            data: Box::new(data),
        }
    }

    /// Short name of the value's shape, used in mismatch errors
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::PublicKey(_) => "publicKey",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Option(_) => "option",
            Value::Map(_) => "map",
            Value::Struct(_) => "struct",
            Value::Tuple(_) => "tuple",
            Value::Enum { .. } => "enum",
        }
    }

    /// Look up a named field of a struct value
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Try to get as u64
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(u) => u64::try_from(*u).ok(),
            Value::Int(i) => u64::try_from(*i).ok(),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::UInt(u) => i64::try_from(*u).ok(),
            Value::Int(i) => i64::try_from(*i).ok(),
            _ => None,
        }
    }

    /// Try to get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as public key
    pub fn as_pubkey(&self) -> Option<&Pubkey> {
        match self {
            Value::PublicKey(k) => Some(k),
            _ => None,
        }
    }

    /// Convert to JSON for display
    ///
    /// Integers that do not fit 64 bits are rendered as decimal strings.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Unit => JsonValue::Null,
            Value::Bool(b) => json!(b),
            Value::Int(i) => match i64::try_from(*i) {
                Ok(small) => json!(small),
                Err(_) => json!(i.to_string()),
            },
            Value::UInt(u) => match u64::try_from(*u) {
                Ok(small) => json!(small),
                Err(_) => json!(u.to_string()),
            },
            Value::Float(f) => json!(f),
            Value::PublicKey(k) => json!(k.to_base58()),
            Value::Bytes(b) => json!(b),
            Value::String(s) => json!(s),
            Value::List(items) | Value::Tuple(items) => {
                JsonValue::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Option(None) => JsonValue::Null,
            Value::Option(Some(inner)) => inner.to_json(),
            Value::Map(entries) => JsonValue::Array(
                entries
                    .iter()
                    .map(|(k, v)| json!([k.to_json(), v.to_json()]))
                    .collect(),
            ),
            Value::Struct(fields) => {
                let mut map = JsonMap::new();
                for (name, value) in fields {
                    map.insert(name.clone(), value.to_json());
                }
                JsonValue::Object(map)
            }
            Value::Enum { variant, data } => match data.as_ref() {
                Value::Unit => json!(variant),
                other => {
                    let mut map = JsonMap::new();
                    map.insert(variant.clone(), other.to_json());
                    JsonValue::Object(map)
                }
            },
        }
    }
}

macro_rules! impl_from_uint {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::UInt(v as u128)
            }
        })*
    };
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::Int(v as i128)
            }
        })*
    };
}

impl_from_uint!(u8, u16, u32, u64, u128);
impl_from_int!(i8, i16, i32, i64, i128);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Pubkey> for Value {
    fn from(v: Pubkey) -> Self {
        Value::PublicKey(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_lookup() {
        let v = Value::record([("amount", Value::from(1234u64)), ("memo", "hi".into())]);
        assert_eq!(v.get("amount").and_then(Value::as_u64), Some(1234));
        assert_eq!(v.get("memo").and_then(Value::as_str), Some("hi"));
        assert!(v.get("missing").is_none());
    }

    #[test]
    fn test_json_rendering() {
        let v = Value::record([
            ("big", Value::UInt(u128::MAX)),
            ("small", Value::Int(-5)),
            ("maybe", Value::none()),
            ("kind", Value::unit_variant("Active")),
            ("key", Value::PublicKey(Pubkey::default())),
        ]);
        assert_eq!(
            v.to_json(),
            json!({
                "big": u128::MAX.to_string(),
                "small": -5,
                "maybe": null,
                "kind": "Active",
                "key": "11111111111111111111111111111111",
            })
        );
    }

    #[test]
    fn test_enum_with_payload_json() {
        let v = Value::variant("Move", Value::record([("x", Value::from(1i32))]));
        assert_eq!(v.to_json(), json!({"Move": {"x": 1}}));
    }
}
