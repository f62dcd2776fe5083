//! idl-coder - Schema-Driven Binary Coder
//!
//! Translates between structured values and the byte formats of programs
//! described by an IDL:
//! - Instruction data is routed by an 8-byte discriminator
//! - Account data is tagged with its type's discriminator
//! - Events are recovered from base64 program log lines
//! - Layouts for nested, generic and recursive types are derived once per coder
//! - Fixed-format built-in programs get hand-written coders behind the same trait

pub mod coder;
pub mod config;
pub mod crypto;
pub mod idl;

// Re-export the coder facade
pub use coder::{
    Coder, CoderError, CoderResult, IdlCoder, ProgramCoder,
    // Category coders
    AccountsCoder, EventCoder, InstructionCoder, StateCoder, TypesCoder,
    // Built-in programs
    AssociatedTokenCoder, SystemCoder,
    // Values and results
    AccountMeta, Encoding, Event, EventParser, Instruction, InstructionDisplay, Value,
};

pub use config::CoderConfig;
pub use crypto::{Discriminator, Namespace, Pubkey};

// Re-export schema types
pub use idl::{Idl, IdlField, IdlType, IdlTypeDef, IdlTypeDefTy, SchemaError};
