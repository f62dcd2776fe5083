//! Schema Validation - Construction-Time Checks
//!
//! Walks every type expression of an IDL before any layout is built and
//! rejects schemas the coder could never use:
//!
//! - references to undeclared named types
//! - generic references with the wrong number of arguments
//! - generic parameters used outside the definition that declares them
//! - duplicate names within one section
//! - accounts/events without a resolvable struct definition
//! - explicit discriminators that are not 8 bytes long

use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::crypto::DISCRIMINATOR_LEN;
use crate::idl::types::{
    Idl, IdlArrayLen, IdlDefinedFields, IdlGenericArg, IdlGenericParam, IdlInstruction, IdlType,
    IdlTypeDef, IdlTypeDefTy,
};

/// Errors raised while loading or checking a schema
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("undeclared type '{name}' referenced from {referenced_from}")]
    UndeclaredType {
        name: String,
        referenced_from: String,
    },

    #[error("missing required schema section: {0}")]
    MissingSection(&'static str),

    #[error("type '{name}' expects {expected} generic arguments, got {found}")]
    GenericArity {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("generic parameter '{0}' is not bound")]
    UnboundGeneric(String),

    #[error("generic argument kind mismatch for parameter '{0}'")]
    GenericKind(String),

    #[error("type '{0}' has no finite encoding")]
    InfiniteType(String),

    #[error("encoded size of {0} overflows")]
    SizeOverflow(String),

    #[error("{0} declares more than 256 enum variants")]
    TooManyVariants(String),

    #[error("duplicate {kind} name: {name}")]
    DuplicateName { kind: &'static str, name: String },

    #[error("{kind} '{name}' has no struct definition")]
    MissingDefinition { kind: &'static str, name: String },

    #[error("explicit discriminator of '{name}' must be 8 bytes, got {len}")]
    InvalidDiscriminator { name: String, len: usize },

    #[error("invalid program address: {0}")]
    InvalidAddress(String),

    #[error("invalid IDL JSON: {0}")]
    Json(String),
}

/// Static checker for one IDL
pub struct SchemaValidator<'a> {
    idl: &'a Idl,
    /// Declared type name -> generic parameters
    declared: HashMap<&'a str, &'a [IdlGenericParam]>,
}

impl<'a> SchemaValidator<'a> {
    /// Index the declared types of an IDL
    pub fn new(idl: &'a Idl) -> Self {
        let mut declared: HashMap<&str, &[IdlGenericParam]> = HashMap::new();
        for def in &idl.types {
            declared.insert(def.name.as_str(), def.generics.as_slice());
        }
        for acc in idl.accounts.iter().filter(|a| a.ty.is_some()) {
            declared.entry(acc.name.as_str()).or_insert(&[]);
        }
        if let Some(state) = &idl.state {
            declared
                .entry(state.strct.name.as_str())
                .or_insert(state.strct.generics.as_slice());
        }
        Self { idl, declared }
    }

    /// Run every check, failing on the first violation
    pub fn validate(&self) -> Result<(), SchemaError> {
        self.check_duplicates()?;

        for def in &self.idl.types {
            self.check_type_def(def)?;
        }

        for acc in &self.idl.accounts {
            check_explicit_discriminator(&acc.name, acc.discriminator.as_deref())?;
            match &acc.ty {
                Some(ty) => self.check_def_body(ty, &[], &format!("account {}", acc.name))?,
                None => self.require_struct("account", &acc.name)?,
            }
        }

        for ix in &self.idl.instructions {
            self.check_instruction(ix, "instruction")?;
        }

        for event in &self.idl.events {
            check_explicit_discriminator(&event.name, event.discriminator.as_deref())?;
            match &event.fields {
                Some(fields) => {
                    for field in fields {
                        self.check_type(&field.ty, &[], &format!("event {}", event.name))?;
                    }
                }
                None => self.require_struct("event", &event.name)?,
            }
        }

        for constant in &self.idl.constants {
            self.check_type(&constant.ty, &[], &format!("constant {}", constant.name))?;
        }

        if let Some(state) = &self.idl.state {
            self.check_type_def(&state.strct)?;
            for method in &state.methods {
                self.check_instruction(method, "state method")?;
            }
        }

        Ok(())
    }

    fn check_duplicates(&self) -> Result<(), SchemaError> {
        check_unique("type", self.idl.types.iter().map(|t| t.name.as_str()))?;
        check_unique("account", self.idl.accounts.iter().map(|a| a.name.as_str()))?;
        check_unique(
            "instruction",
            self.idl.instructions.iter().map(|i| i.name.as_str()),
        )?;
        check_unique("event", self.idl.events.iter().map(|e| e.name.as_str()))?;
        if let Some(state) = &self.idl.state {
            check_unique("state method", state.methods.iter().map(|m| m.name.as_str()))?;
        }
        Ok(())
    }

    fn require_struct(&self, kind: &'static str, name: &str) -> Result<(), SchemaError> {
        match self.idl.get_type(name) {
            Some(IdlTypeDef {
                ty: IdlTypeDefTy::Struct { .. },
                generics,
                ..
            }) if generics.is_empty() => Ok(()),
            _ => Err(SchemaError::MissingDefinition {
                kind,
                name: name.to_string(),
            }),
        }
    }

    fn check_instruction(&self, ix: &IdlInstruction, kind: &str) -> Result<(), SchemaError> {
        check_explicit_discriminator(&ix.name, ix.discriminator.as_deref())?;
        let context = format!("{} {}", kind, ix.name);
        for arg in &ix.args {
            self.check_type(&arg.ty, &[], &context)?;
        }
        Ok(())
    }

    fn check_type_def(&self, def: &IdlTypeDef) -> Result<(), SchemaError> {
        self.check_def_body(&def.ty, &def.generics, &format!("type {}", def.name))
    }

    fn check_def_body(
        &self,
        body: &IdlTypeDefTy,
        params: &[IdlGenericParam],
        context: &str,
    ) -> Result<(), SchemaError> {
        match body {
            IdlTypeDefTy::Struct { fields } => {
                if let Some(fields) = fields {
                    self.check_fields(fields, params, context)?;
                }
            }
            IdlTypeDefTy::Enum { variants } => {
                if variants.len() > u8::MAX as usize + 1 {
                    return Err(SchemaError::TooManyVariants(context.to_string()));
                }
                for variant in variants {
                    if let Some(fields) = &variant.fields {
                        self.check_fields(fields, params, context)?;
                    }
                }
            }
            IdlTypeDefTy::Alias { alias } => self.check_type(alias, params, context)?,
        }
        Ok(())
    }

    fn check_fields(
        &self,
        fields: &IdlDefinedFields,
        params: &[IdlGenericParam],
        context: &str,
    ) -> Result<(), SchemaError> {
        for ty in fields.types() {
            self.check_type(ty, params, context)?;
        }
        Ok(())
    }

    /// Check one type expression in the scope of `params`
    pub fn check_type(
        &self,
        ty: &IdlType,
        params: &[IdlGenericParam],
        context: &str,
    ) -> Result<(), SchemaError> {
        match ty {
            IdlType::Vec(inner) | IdlType::Option(inner) | IdlType::COption(inner) => {
                self.check_type(inner, params, context)
            }
            IdlType::Array(inner, len) => {
                if let IdlArrayLen::Generic { generic } = len {
                    match params.iter().find(|p| p.name() == generic) {
                        Some(IdlGenericParam::Const { .. }) => {}
                        Some(IdlGenericParam::Type { .. }) => {
                            return Err(SchemaError::GenericKind(generic.clone()))
                        }
                        None => return Err(SchemaError::UnboundGeneric(generic.clone())),
                    }
                }
                self.check_type(inner, params, context)
            }
            IdlType::HashMap(key, value) => {
                self.check_type(key, params, context)?;
                self.check_type(value, params, context)
            }
            IdlType::Defined { name, generics } => {
                let expected = self.declared.get(name.as_str()).ok_or_else(|| {
                    SchemaError::UndeclaredType {
                        name: name.clone(),
                        referenced_from: context.to_string(),
                    }
                })?;
                if expected.len() != generics.len() {
                    return Err(SchemaError::GenericArity {
                        name: name.clone(),
                        expected: expected.len(),
                        found: generics.len(),
                    });
                }
                for (param, arg) in expected.iter().zip(generics) {
                    match (param, arg) {
                        (IdlGenericParam::Type { .. }, IdlGenericArg::Type { ty }) => {
                            self.check_type(ty, params, context)?
                        }
                        (IdlGenericParam::Const { .. }, IdlGenericArg::Const { value }) => {
                            let bound = params.iter().any(|p| p.name() == value);
                            if !bound && value.parse::<usize>().is_err() {
                                return Err(SchemaError::UnboundGeneric(value.clone()));
                            }
                        }
                        _ => return Err(SchemaError::GenericKind(param.name().to_string())),
                    }
                }
                Ok(())
            }
            IdlType::Generic(name) => match params.iter().find(|p| p.name() == name) {
                Some(IdlGenericParam::Type { .. }) => Ok(()),
                Some(IdlGenericParam::Const { .. }) => Err(SchemaError::GenericKind(name.clone())),
                None => Err(SchemaError::UnboundGeneric(name.clone())),
            },
            _ => Ok(()),
        }
    }
}

fn check_unique<'a>(
    kind: &'static str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(SchemaError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

fn check_explicit_discriminator(name: &str, disc: Option<&[u8]>) -> Result<(), SchemaError> {
    match disc {
        Some(bytes) if bytes.len() != DISCRIMINATOR_LEN => Err(SchemaError::InvalidDiscriminator {
            name: name.to_string(),
            len: bytes.len(),
        }),
        _ => Ok(()),
    }
}

/// Validate an IDL
pub fn validate_idl(idl: &Idl) -> Result<(), SchemaError> {
    SchemaValidator::new(idl).validate()
}
