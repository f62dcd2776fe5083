//! IDL Module - Program Interface Description
//!
//! The schema a coder is built from. Loaded once, validated once, and never
//! mutated afterwards.

pub mod types;
pub mod validation;

pub use types::{
    Idl, IdlAccountDef, IdlArrayLen, IdlConstant, IdlDefinedFields, IdlEnumVariant, IdlErrorCode,
    IdlEvent, IdlEventField, IdlField, IdlGenericArg, IdlGenericParam, IdlInstruction,
    IdlInstructionAccount, IdlInstructionAccountItem, IdlInstructionAccounts, IdlMetadata,
    IdlState, IdlType, IdlTypeDef, IdlTypeDefTy,
};
pub use validation::{validate_idl, SchemaError, SchemaValidator};
