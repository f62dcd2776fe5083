//! IDL Types - Program Interface Definitions
//!
//! In-memory model of a program's interface description: instructions,
//! persisted account types, user-defined types, events, constants and the
//! legacy state section. Deserialized from the JSON IDL format; both the
//! older layout (`isMut`/`isSigner`, inline account types, `"defined": "Name"`)
//! and the newer one (`writable`/`signer`, explicit discriminators, generic
//! definitions) are accepted.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::crypto::Pubkey;
use crate::idl::validation::SchemaError;

// ============================================================================
// Type expressions
// ============================================================================

/// Length of a fixed-size array: a literal or a const generic parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdlArrayLen {
    Value(usize),
    Generic { generic: String },
}

/// Argument supplied to a generic type definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IdlGenericArg {
    Type {
        #[serde(rename = "type")]
        ty: IdlType,
    },
    Const {
        value: String,
    },
}

/// Generic parameter declared by a type definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IdlGenericParam {
    Type {
        name: String,
    },
    Const {
        name: String,
        #[serde(rename = "type")]
        ty: String,
    },
}

impl IdlGenericParam {
    pub fn name(&self) -> &str {
        match self {
            IdlGenericParam::Type { name } | IdlGenericParam::Const { name, .. } => name,
        }
    }
}

/// A type expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IdlTypeRepr", into = "IdlTypeRepr")]
pub enum IdlType {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    U64,
    I64,
    F64,
    U128,
    I128,
    /// Length-prefixed raw bytes
    Bytes,
    /// Length-prefixed UTF-8
    String,
    /// 32 raw bytes
    PublicKey,
    Vec(Box<IdlType>),
    Option(Box<IdlType>),
    /// Option with a 4-byte tag
    COption(Box<IdlType>),
    Array(Box<IdlType>, IdlArrayLen),
    HashMap(Box<IdlType>, Box<IdlType>),
    /// Reference to a named type in the `types` (or `accounts`) section
    Defined {
        name: String,
        generics: Vec<IdlGenericArg>,
    },
    /// Reference to a generic parameter of the enclosing definition
    Generic(String),
}

impl IdlType {
    /// Shorthand for a non-generic named reference
    pub fn defined(name: &str) -> Self {
        IdlType::Defined {
            name: name.to_string(),
            generics: Vec::new(),
        }
    }

    fn primitive_name(&self) -> Option<&'static str> {
        Some(match self {
            IdlType::Bool => "bool",
            IdlType::U8 => "u8",
            IdlType::I8 => "i8",
            IdlType::U16 => "u16",
            IdlType::I16 => "i16",
            IdlType::U32 => "u32",
            IdlType::I32 => "i32",
            IdlType::F32 => "f32",
            IdlType::U64 => "u64",
            IdlType::I64 => "i64",
            IdlType::F64 => "f64",
            IdlType::U128 => "u128",
            IdlType::I128 => "i128",
            IdlType::Bytes => "bytes",
            IdlType::String => "string",
            IdlType::PublicKey => "publicKey",
            _ => return None,
        })
    }

    fn from_primitive_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => IdlType::Bool,
            "u8" => IdlType::U8,
            "i8" => IdlType::I8,
            "u16" => IdlType::U16,
            "i16" => IdlType::I16,
            "u32" => IdlType::U32,
            "i32" => IdlType::I32,
            "f32" => IdlType::F32,
            "u64" => IdlType::U64,
            "i64" => IdlType::I64,
            "f64" => IdlType::F64,
            "u128" => IdlType::U128,
            "i128" => IdlType::I128,
            "bytes" => IdlType::Bytes,
            "string" => IdlType::String,
            "publicKey" | "pubkey" => IdlType::PublicKey,
            _ => return None,
        })
    }
}

impl fmt::Display for IdlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.primitive_name() {
            return f.write_str(name);
        }
        match self {
            IdlType::Vec(inner) => write!(f, "Vec<{}>", inner),
            IdlType::Option(inner) => write!(f, "Option<{}>", inner),
            IdlType::COption(inner) => write!(f, "COption<{}>", inner),
            IdlType::Array(inner, IdlArrayLen::Value(n)) => write!(f, "[{}; {}]", inner, n),
            IdlType::Array(inner, IdlArrayLen::Generic { generic }) => {
                write!(f, "[{}; {}]", inner, generic)
            }
            IdlType::HashMap(k, v) => write!(f, "HashMap<{}, {}>", k, v),
            IdlType::Defined { name, generics } if generics.is_empty() => f.write_str(name),
            IdlType::Defined { name, generics } => {
                write!(f, "{}<", name)?;
                for (i, arg) in generics.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match arg {
                        IdlGenericArg::Type { ty } => write!(f, "{}", ty)?,
                        IdlGenericArg::Const { value } => f.write_str(value)?,
                    }
                }
                f.write_str(">")
            }
            IdlType::Generic(name) => f.write_str(name),
            _ => Ok(()),
        }
    }
}

/// JSON shape of a type expression
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum IdlTypeRepr {
    Primitive(String),
    Compound(IdlTypeCompound),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum IdlTypeCompound {
    Vec(Box<IdlType>),
    Option(Box<IdlType>),
    #[serde(alias = "cOption")]
    Coption(Box<IdlType>),
    Array(Box<IdlType>, IdlArrayLen),
    HashMap(Box<IdlType>, Box<IdlType>),
    Defined(IdlDefinedRef),
    Generic(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum IdlDefinedRef {
    Name(String),
    Full {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        generics: Vec<IdlGenericArg>,
    },
}

impl TryFrom<IdlTypeRepr> for IdlType {
    type Error = String;

    fn try_from(repr: IdlTypeRepr) -> Result<Self, Self::Error> {
        Ok(match repr {
            IdlTypeRepr::Primitive(name) => IdlType::from_primitive_name(&name)
                .ok_or_else(|| format!("unknown primitive type: {}", name))?,
            IdlTypeRepr::Compound(compound) => match compound {
                IdlTypeCompound::Vec(inner) => IdlType::Vec(inner),
                IdlTypeCompound::Option(inner) => IdlType::Option(inner),
                IdlTypeCompound::Coption(inner) => IdlType::COption(inner),
                IdlTypeCompound::Array(inner, len) => IdlType::Array(inner, len),
                IdlTypeCompound::HashMap(k, v) => IdlType::HashMap(k, v),
                IdlTypeCompound::Defined(IdlDefinedRef::Name(name)) => IdlType::Defined {
                    name,
                    generics: Vec::new(),
                },
                IdlTypeCompound::Defined(IdlDefinedRef::Full { name, generics }) => {
                    IdlType::Defined { name, generics }
                }
                IdlTypeCompound::Generic(name) => IdlType::Generic(name),
            },
        })
    }
}

impl From<IdlType> for IdlTypeRepr {
    fn from(ty: IdlType) -> Self {
        if let Some(name) = ty.primitive_name() {
            return IdlTypeRepr::Primitive(name.to_string());
        }
        let compound = match ty {
            IdlType::Vec(inner) => IdlTypeCompound::Vec(inner),
            IdlType::Option(inner) => IdlTypeCompound::Option(inner),
            IdlType::COption(inner) => IdlTypeCompound::Coption(inner),
            IdlType::Array(inner, len) => IdlTypeCompound::Array(inner, len),
            IdlType::HashMap(k, v) => IdlTypeCompound::HashMap(k, v),
            IdlType::Defined { name, generics } if generics.is_empty() => {
                IdlTypeCompound::Defined(IdlDefinedRef::Name(name))
            }
            IdlType::Defined { name, generics } => {
                IdlTypeCompound::Defined(IdlDefinedRef::Full { name, generics })
            }
            IdlType::Generic(name) => IdlTypeCompound::Generic(name),
            // Primitives returned above
            other => return IdlTypeRepr::Primitive(other.to_string()),
        };
        IdlTypeRepr::Compound(compound)
    }
}

// ============================================================================
// Fields and definitions
// ============================================================================

/// A named, typed field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: IdlType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docs: Vec<String>,
}

impl IdlField {
    /// Create a new field
    pub fn new(name: &str, ty: IdlType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            docs: Vec::new(),
        }
    }
}

/// Fields of a struct or enum variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdlDefinedFields {
    Named(Vec<IdlField>),
    Tuple(Vec<IdlType>),
}

impl IdlDefinedFields {
    pub fn types(&self) -> Vec<&IdlType> {
        match self {
            IdlDefinedFields::Named(fields) => fields.iter().map(|f| &f.ty).collect(),
            IdlDefinedFields::Tuple(types) => types.iter().collect(),
        }
    }
}

/// One variant of an enum definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlEnumVariant {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<IdlDefinedFields>,
}

/// Body of a type definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IdlTypeDefTy {
    Struct {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fields: Option<IdlDefinedFields>,
    },
    Enum {
        variants: Vec<IdlEnumVariant>,
    },
    /// Type alias
    #[serde(rename = "type")]
    Alias { alias: IdlType },
}

impl IdlTypeDefTy {
    /// Struct with named fields
    pub fn named_struct(fields: Vec<IdlField>) -> Self {
        IdlTypeDefTy::Struct {
            fields: Some(IdlDefinedFields::Named(fields)),
        }
    }
}

/// A user-defined type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlTypeDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generics: Vec<IdlGenericParam>,
    #[serde(rename = "type")]
    pub ty: IdlTypeDefTy,
}

impl IdlTypeDef {
    /// Create a new non-generic definition
    pub fn new(name: &str, ty: IdlTypeDefTy) -> Self {
        Self {
            name: name.to_string(),
            docs: Vec::new(),
            generics: Vec::new(),
            ty,
        }
    }
}

/// A persisted account type
///
/// Older IDLs inline the struct here; newer ones only carry the name and
/// discriminator and define the struct under `types`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlAccountDef {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<IdlTypeDefTy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docs: Vec<String>,
}

// ============================================================================
// Instructions
// ============================================================================

/// A single account slot of an instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlInstructionAccount {
    pub name: String,
    #[serde(default, alias = "isMut")]
    pub writable: bool,
    #[serde(default, alias = "isSigner")]
    pub signer: bool,
    #[serde(default, alias = "isOptional")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docs: Vec<String>,
}

/// A named group of account slots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlInstructionAccounts {
    pub name: String,
    pub accounts: Vec<IdlInstructionAccountItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdlInstructionAccountItem {
    Composite(IdlInstructionAccounts),
    Single(IdlInstructionAccount),
}

/// An instruction and its ordered parameter list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlInstruction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docs: Vec<String>,
    #[serde(default)]
    pub accounts: Vec<IdlInstructionAccountItem>,
    #[serde(default)]
    pub args: Vec<IdlField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Vec<u8>>,
}

impl IdlInstruction {
    /// Create an instruction with arguments and no accounts
    pub fn new(name: &str, args: Vec<IdlField>) -> Self {
        Self {
            name: name.to_string(),
            docs: Vec::new(),
            accounts: Vec::new(),
            args,
            discriminator: None,
        }
    }
}

// ============================================================================
// Events, constants, errors, state
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlEventField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: IdlType,
    #[serde(default)]
    pub index: bool,
}

/// An emitted event
///
/// Older IDLs list the fields inline; newer ones define the struct under
/// `types` with the same name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlEvent {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<IdlEventField>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlConstant {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: IdlType,
    pub value: String,
}

impl IdlConstant {
    /// Parse the value as an integer (underscores allowed)
    pub fn as_i128(&self) -> Option<i128> {
        self.value.replace('_', "").parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlErrorCode {
    pub code: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

/// Deprecated singleton state account and its methods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlState {
    #[serde(rename = "struct")]
    pub strct: IdlTypeDef,
    #[serde(default)]
    pub methods: Vec<IdlInstruction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdlMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

// ============================================================================
// Complete IDL
// ============================================================================

/// Complete program interface description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Idl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<IdlMetadata>,
    #[serde(default)]
    pub instructions: Vec<IdlInstruction>,
    #[serde(default)]
    pub accounts: Vec<IdlAccountDef>,
    #[serde(default)]
    pub types: Vec<IdlTypeDef>,
    #[serde(default)]
    pub events: Vec<IdlEvent>,
    #[serde(default)]
    pub constants: Vec<IdlConstant>,
    #[serde(default)]
    pub errors: Vec<IdlErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<IdlState>,
}

impl Idl {
    /// Create an empty IDL
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: "0.1.0".to_string(),
            ..Default::default()
        }
    }

    /// Parse an IDL from JSON, requiring the `instructions` section
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let raw: serde_json::Value =
            serde_json::from_str(json).map_err(|e| SchemaError::Json(e.to_string()))?;
        if raw.get("instructions").is_none() {
            return Err(SchemaError::MissingSection("instructions"));
        }
        serde_json::from_value(raw).map_err(|e| SchemaError::Json(e.to_string()))
    }

    /// Program id declared by the IDL, if any
    pub fn program_id(&self) -> Result<Option<Pubkey>, SchemaError> {
        let address = self
            .address
            .as_deref()
            .or_else(|| self.metadata.as_ref().and_then(|m| m.address.as_deref()));
        address
            .map(|a| {
                Pubkey::from_base58(a).map_err(|e| SchemaError::InvalidAddress(e.to_string()))
            })
            .transpose()
    }

    /// Builder pattern: add an instruction
    pub fn with_instruction(mut self, ix: IdlInstruction) -> Self {
        self.instructions.push(ix);
        self
    }

    /// Builder pattern: add an account with an inline struct
    pub fn with_account(mut self, name: &str, ty: IdlTypeDefTy) -> Self {
        self.accounts.push(IdlAccountDef {
            name: name.to_string(),
            ty: Some(ty),
            discriminator: None,
            docs: Vec::new(),
        });
        self
    }

    /// Builder pattern: add a type definition
    pub fn with_type(mut self, def: IdlTypeDef) -> Self {
        self.types.push(def);
        self
    }

    /// Builder pattern: add an event with inline fields
    pub fn with_event(mut self, name: &str, fields: Vec<IdlField>) -> Self {
        self.events.push(IdlEvent {
            name: name.to_string(),
            fields: Some(
                fields
                    .into_iter()
                    .map(|f| IdlEventField {
                        name: f.name,
                        ty: f.ty,
                        index: false,
                    })
                    .collect(),
            ),
            discriminator: None,
        });
        self
    }

    /// Get type definition by name
    pub fn get_type(&self, name: &str) -> Option<&IdlTypeDef> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Get constant by name
    pub fn get_constant(&self, name: &str) -> Option<&IdlConstant> {
        self.constants.iter().find(|c| c.name == name)
    }

    /// Get error definition by its numeric code
    pub fn error_by_code(&self, code: u32) -> Option<&IdlErrorCode> {
        self.errors.iter().find(|e| e.code == code)
    }

    /// Names of every type the layout builder can resolve a reference to
    pub fn declared_type_names(&self) -> HashSet<&str> {
        self.types
            .iter()
            .map(|t| t.name.as_str())
            .chain(
                self.accounts
                    .iter()
                    .filter(|a| a.ty.is_some())
                    .map(|a| a.name.as_str()),
            )
            .chain(self.state.iter().map(|s| s.strct.name.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primitive_and_compound_types() {
        let ty: IdlType = serde_json::from_str(r#""u64""#).unwrap();
        assert_eq!(ty, IdlType::U64);

        let ty: IdlType = serde_json::from_str(r#"{"vec": {"option": "publicKey"}}"#).unwrap();
        assert_eq!(
            ty,
            IdlType::Vec(Box::new(IdlType::Option(Box::new(IdlType::PublicKey))))
        );

        let ty: IdlType = serde_json::from_str(r#"{"array": ["u8", 32]}"#).unwrap();
        assert_eq!(ty, IdlType::Array(Box::new(IdlType::U8), IdlArrayLen::Value(32)));

        let ty: IdlType = serde_json::from_str(r#"{"defined": "Point"}"#).unwrap();
        assert_eq!(ty, IdlType::defined("Point"));

        let ty: IdlType = serde_json::from_str(r#"{"hashMap": ["string", "u32"]}"#).unwrap();
        assert_eq!(
            ty,
            IdlType::HashMap(Box::new(IdlType::String), Box::new(IdlType::U32))
        );
    }

    #[test]
    fn test_parse_generic_reference() {
        let ty: IdlType = serde_json::from_str(
            r#"{"defined": {"name": "Pair", "generics": [
                {"kind": "type", "type": "u16"},
                {"kind": "const", "value": "4"}
            ]}}"#,
        )
        .unwrap();
        assert_eq!(
            ty,
            IdlType::Defined {
                name: "Pair".to_string(),
                generics: vec![
                    IdlGenericArg::Type { ty: IdlType::U16 },
                    IdlGenericArg::Const {
                        value: "4".to_string()
                    },
                ],
            }
        );
        assert_eq!(ty.to_string(), "Pair<u16, 4>");
    }

    #[test]
    fn test_unknown_primitive_rejected() {
        assert!(serde_json::from_str::<IdlType>(r#""u512""#).is_err());
    }

    #[test]
    fn test_type_serialize_roundtrip() {
        let ty = IdlType::Array(
            Box::new(IdlType::Generic("T".to_string())),
            IdlArrayLen::Generic {
                generic: "N".to_string(),
            },
        );
        let json = serde_json::to_string(&ty).unwrap();
        let back: IdlType = serde_json::from_str(&json).unwrap();
        assert_eq!(ty, back);
    }

    #[test]
    fn test_legacy_account_flags() {
        let item: IdlInstructionAccountItem =
            serde_json::from_str(r#"{"name": "payer", "isMut": true, "isSigner": true}"#).unwrap();
        match item {
            IdlInstructionAccountItem::Single(acc) => {
                assert!(acc.writable);
                assert!(acc.signer);
                assert!(!acc.optional);
            }
            _ => panic!("expected single account"),
        }
    }

    #[test]
    fn test_tuple_variant_fields() {
        let variant: IdlEnumVariant =
            serde_json::from_str(r#"{"name": "Pair", "fields": ["u8", {"vec": "u8"}]}"#).unwrap();
        assert_eq!(
            variant.fields,
            Some(IdlDefinedFields::Tuple(vec![
                IdlType::U8,
                IdlType::Vec(Box::new(IdlType::U8))
            ]))
        );
    }

    #[test]
    fn test_missing_instructions_section() {
        let result = Idl::from_json(r#"{"version": "0.1.0", "name": "empty"}"#);
        assert!(matches!(result, Err(SchemaError::MissingSection("instructions"))));
    }

    #[test]
    fn test_program_id_from_metadata() {
        let idl = Idl::from_json(
            r#"{"name": "p", "instructions": [],
                "metadata": {"address": "11111111111111111111111111111111"}}"#,
        )
        .unwrap();
        assert_eq!(idl.program_id().unwrap(), Some(Pubkey::default()));
    }

    #[test]
    fn test_constant_parse() {
        let c = IdlConstant {
            name: "MAX".to_string(),
            ty: IdlType::U64,
            value: "1_000".to_string(),
        };
        assert_eq!(c.as_i128(), Some(1000));
    }

    #[test]
    fn test_constant_and_error_lookup() {
        let idl = Idl::from_json(include_str!("../coder/fixtures/counter.json")).unwrap();
        let max = idl.get_constant("MAX_COUNT").unwrap();
        assert_eq!(max.ty, IdlType::U64);
        assert_eq!(max.as_i128(), Some(1_000_000));
        assert!(idl.get_constant("MIN_COUNT").is_none());

        let err = idl.error_by_code(6000).unwrap();
        assert_eq!(err.name, "Overflow");
        assert_eq!(err.msg.as_deref(), Some("Counter overflow"));
        assert!(idl.error_by_code(6001).is_none());
    }
}
