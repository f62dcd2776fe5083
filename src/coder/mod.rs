//! Coder Module - Schema-Driven Binary Serialization
//!
//! Translates between structured values and the byte formats a program
//! reads and writes:
//!
//! 1. **Layouts** - byte layouts derived from the IDL, built once per coder
//! 2. **Discriminators** - 8-byte tags routing data to the item it encodes
//! 3. **Category coders** - instructions, accounts, events, types and state
//! 4. **Built-in coders** - fixed-format programs that have no IDL
//!
//! Every coder kind implements [`Coder`]; [`ProgramCoder`] picks one per
//! program when it is constructed.

pub mod accounts;
pub mod associated_token;
pub mod codec;
pub mod discriminator;
pub mod error;
pub mod event_parser;
pub mod events;
pub mod instruction;
pub mod layout;
pub mod state;
pub mod system;
pub mod types;
pub mod value;

pub use accounts::{AccountSize, AccountsCoder, DecodedAccount, MemcmpFilter};
pub use associated_token::{
    AssociatedTokenCoder, AssociatedTokenInstruction, ASSOCIATED_TOKEN_PROGRAM_ID,
};
pub use codec::{Codec, CodecError, CodecResult, DecodeContext, EncodeContext};
pub use discriminator::{sighash, to_snake_case, DiscriminatorTable};
pub use error::{CoderError, CoderResult};
pub use event_parser::EventParser;
pub use events::{Event, EventCoder, InnerInstruction};
pub use instruction::{
    AccountMeta, DisplayAccount, DisplayArg, Encoding, Instruction, InstructionCoder,
    InstructionDisplay,
};
pub use layout::{Layout, LayoutRegistry, SizeInfo};
pub use state::StateCoder;
pub use system::{SystemCoder, SystemInstruction, SYSTEM_PROGRAM_ID};
pub use types::TypesCoder;
pub use value::Value;

use std::sync::Arc;
use tracing::debug;

use crate::config::CoderConfig;
use crate::crypto::Pubkey;
use crate::idl::{validate_idl, Idl, SchemaError};

/// Operations every program coder offers
///
/// Only the instruction path is required. Coders for fixed-format programs
/// leave the rest at their defaults, which fail with `NotSupported`.
pub trait Coder {
    /// Short name of the coder kind, used in error messages
    fn kind(&self) -> &'static str;

    fn encode_instruction(&self, name: &str, args: &Value) -> CoderResult<Vec<u8>>;

    fn decode_instruction(&self, data: &[u8]) -> CoderResult<Instruction>;

    fn encode_account(&self, _name: &str, _value: &Value) -> CoderResult<Vec<u8>> {
        Err(CoderError::not_supported(self.kind(), "encode_account"))
    }

    fn decode_account(&self, _name: &str, _data: &[u8]) -> CoderResult<Value> {
        Err(CoderError::not_supported(self.kind(), "decode_account"))
    }

    fn account_size(&self, _name: &str) -> CoderResult<usize> {
        Err(CoderError::not_supported(self.kind(), "account_size"))
    }

    fn decode_event(&self, _log: &str) -> CoderResult<Option<Event>> {
        Err(CoderError::not_supported(self.kind(), "decode_event"))
    }

    fn encode_type(&self, _name: &str, _value: &Value) -> CoderResult<Vec<u8>> {
        Err(CoderError::not_supported(self.kind(), "encode_type"))
    }

    fn decode_type(&self, _name: &str, _data: &[u8]) -> CoderResult<Value> {
        Err(CoderError::not_supported(self.kind(), "decode_type"))
    }

    fn encode_state(&self, _name: &str, _value: &Value) -> CoderResult<Vec<u8>> {
        Err(CoderError::not_supported(self.kind(), "encode_state"))
    }

    fn decode_state(&self, _data: &[u8]) -> CoderResult<Value> {
        Err(CoderError::not_supported(self.kind(), "decode_state"))
    }
}

/// All category coders for one IDL
///
/// Construction validates the schema, builds every layout and checks each
/// discriminator namespace for collisions; a coder that exists is usable.
/// The layout registry is owned by this coder and shared read-only with its
/// category coders.
#[derive(Debug, Clone)]
pub struct IdlCoder {
    idl: Arc<Idl>,
    registry: Arc<LayoutRegistry>,
    instruction: InstructionCoder,
    accounts: AccountsCoder,
    events: EventCoder,
    types: TypesCoder,
    state: Option<StateCoder>,
}

impl IdlCoder {
    /// Build a coder with the default configuration
    pub fn new(idl: Idl) -> CoderResult<Self> {
        Self::with_config(idl, CoderConfig::default())
    }

    /// Parse an IDL from JSON and build a coder for it
    pub fn from_json(json: &str) -> CoderResult<Self> {
        Self::new(Idl::from_json(json)?)
    }

    pub fn with_config(idl: Idl, config: CoderConfig) -> CoderResult<Self> {
        validate_idl(&idl)?;
        let registry = Arc::new(LayoutRegistry::build(&idl, config.max_depth)?);
        let idl = Arc::new(idl);

        let instruction = InstructionCoder::new(&idl, Arc::clone(&registry))?;
        let accounts = AccountsCoder::new(&idl, Arc::clone(&registry))?;
        let events = EventCoder::new(&idl, Arc::clone(&registry), config)?;
        let types = TypesCoder::new(Arc::clone(&idl), Arc::clone(&registry));
        let state = idl
            .state
            .as_ref()
            .map(|s| StateCoder::new(s, Arc::clone(&registry)));

        debug!(
            program = %idl.name,
            instructions = idl.instructions.len(),
            accounts = idl.accounts.len(),
            events = events.len(),
            layouts = registry.len(),
            "built idl coder"
        );

        Ok(Self {
            idl,
            registry,
            instruction,
            accounts,
            events,
            types,
            state,
        })
    }

    pub fn idl(&self) -> &Idl {
        &self.idl
    }

    pub fn registry(&self) -> &LayoutRegistry {
        &self.registry
    }

    pub fn instruction(&self) -> &InstructionCoder {
        &self.instruction
    }

    pub fn accounts(&self) -> &AccountsCoder {
        &self.accounts
    }

    pub fn events(&self) -> &EventCoder {
        &self.events
    }

    pub fn types(&self) -> &TypesCoder {
        &self.types
    }

    /// Coder for the deprecated state account, if the IDL declares one
    pub fn state(&self) -> Option<&StateCoder> {
        self.state.as_ref()
    }

    pub fn program_id(&self) -> Option<&Pubkey> {
        self.events.program_id()
    }

    /// Log parser for this program's events
    pub fn event_parser(&self) -> CoderResult<EventParser<'_>> {
        let program_id = self
            .program_id()
            .ok_or(SchemaError::MissingSection("address"))?;
        Ok(EventParser::new(program_id, &self.events))
    }

    fn state_coder(&self) -> CoderResult<&StateCoder> {
        self.state
            .as_ref()
            .ok_or_else(|| CoderError::unknown("state", &self.idl.name))
    }
}

impl Coder for IdlCoder {
    fn kind(&self) -> &'static str {
        "idl"
    }

    fn encode_instruction(&self, name: &str, args: &Value) -> CoderResult<Vec<u8>> {
        self.instruction.encode(name, args)
    }

    fn decode_instruction(&self, data: &[u8]) -> CoderResult<Instruction> {
        self.instruction.decode(data)
    }

    fn encode_account(&self, name: &str, value: &Value) -> CoderResult<Vec<u8>> {
        self.accounts.encode(name, value)
    }

    fn decode_account(&self, name: &str, data: &[u8]) -> CoderResult<Value> {
        self.accounts.decode(name, data)
    }

    fn account_size(&self, name: &str) -> CoderResult<usize> {
        self.accounts.size(name)
    }

    fn decode_event(&self, log: &str) -> CoderResult<Option<Event>> {
        Ok(self.events.decode(log))
    }

    fn encode_type(&self, name: &str, value: &Value) -> CoderResult<Vec<u8>> {
        self.types.encode(name, value)
    }

    fn decode_type(&self, name: &str, data: &[u8]) -> CoderResult<Value> {
        self.types.decode(name, data)
    }

    fn encode_state(&self, name: &str, value: &Value) -> CoderResult<Vec<u8>> {
        self.state_coder()?.encode(name, value)
    }

    fn decode_state(&self, data: &[u8]) -> CoderResult<Value> {
        self.state_coder()?.decode(data)
    }
}

/// Coder for one program, chosen once at construction
#[derive(Debug, Clone)]
pub enum ProgramCoder {
    Idl(Box<IdlCoder>),
    System(SystemCoder),
    AssociatedToken(AssociatedTokenCoder),
}

impl ProgramCoder {
    /// Schema-driven coder for a program with an IDL
    pub fn from_idl(idl: Idl, config: CoderConfig) -> CoderResult<Self> {
        Ok(ProgramCoder::Idl(Box::new(IdlCoder::with_config(idl, config)?)))
    }

    /// Fixed-format coder for a built-in program, if `program_id` is one
    pub fn builtin(program_id: &Pubkey) -> Option<Self> {
        if *program_id == SYSTEM_PROGRAM_ID {
            Some(ProgramCoder::System(SystemCoder::new()))
        } else if *program_id == ASSOCIATED_TOKEN_PROGRAM_ID {
            Some(ProgramCoder::AssociatedToken(AssociatedTokenCoder::new()))
        } else {
            None
        }
    }

    fn inner(&self) -> &dyn Coder {
        match self {
            ProgramCoder::Idl(coder) => &**coder,
            ProgramCoder::System(coder) => coder,
            ProgramCoder::AssociatedToken(coder) => coder,
        }
    }
}

impl Coder for ProgramCoder {
    fn kind(&self) -> &'static str {
        self.inner().kind()
    }

    fn encode_instruction(&self, name: &str, args: &Value) -> CoderResult<Vec<u8>> {
        self.inner().encode_instruction(name, args)
    }

    fn decode_instruction(&self, data: &[u8]) -> CoderResult<Instruction> {
        self.inner().decode_instruction(data)
    }

    fn encode_account(&self, name: &str, value: &Value) -> CoderResult<Vec<u8>> {
        self.inner().encode_account(name, value)
    }

    fn decode_account(&self, name: &str, data: &[u8]) -> CoderResult<Value> {
        self.inner().decode_account(name, data)
    }

    fn account_size(&self, name: &str) -> CoderResult<usize> {
        self.inner().account_size(name)
    }

    fn decode_event(&self, log: &str) -> CoderResult<Option<Event>> {
        self.inner().decode_event(log)
    }

    fn encode_type(&self, name: &str, value: &Value) -> CoderResult<Vec<u8>> {
        self.inner().encode_type(name, value)
    }

    fn decode_type(&self, name: &str, data: &[u8]) -> CoderResult<Value> {
        self.inner().decode_type(name, data)
    }

    fn encode_state(&self, name: &str, value: &Value) -> CoderResult<Vec<u8>> {
        self.inner().encode_state(name, value)
    }

    fn decode_state(&self, data: &[u8]) -> CoderResult<Value> {
        self.inner().decode_state(data)
    }
}
