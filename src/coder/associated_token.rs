//! Associated Token Program Coder
//!
//! The associated-account program takes no arguments; its instruction is
//! selected by a single leading byte. The original `create` instruction
//! carried no data at all, so empty data still decodes as `create`.

use crate::coder::codec::{
    encode_to_vec, Codec, CodecError, CodecResult, DecodeContext, EncodeContext,
};
use crate::coder::error::{CoderError, CoderResult};
use crate::coder::instruction::Instruction;
use crate::coder::value::Value;
use crate::coder::Coder;
use crate::crypto::Pubkey;

/// Address of the associated token program
/// (`ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`)
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey = Pubkey::new_from_array([
    140, 151, 37, 143, 78, 36, 137, 241, 187, 61, 16, 41, 20, 142, 13, 131, 11, 90, 19, 153, 218,
    255, 16, 132, 4, 142, 123, 216, 219, 233, 248, 89,
]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociatedTokenInstruction {
    Create,
    CreateIdempotent,
    RecoverNested,
}

impl AssociatedTokenInstruction {
    pub fn name(&self) -> &'static str {
        match self {
            AssociatedTokenInstruction::Create => "create",
            AssociatedTokenInstruction::CreateIdempotent => "createIdempotent",
            AssociatedTokenInstruction::RecoverNested => "recoverNested",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "create" => Some(AssociatedTokenInstruction::Create),
            "createIdempotent" => Some(AssociatedTokenInstruction::CreateIdempotent),
            "recoverNested" => Some(AssociatedTokenInstruction::RecoverNested),
            _ => None,
        }
    }
}

impl Codec for AssociatedTokenInstruction {
    fn encode(&self, ctx: &mut EncodeContext) -> CodecResult<usize> {
        ctx.write_byte(*self as u8)
    }

    fn decode(ctx: &mut DecodeContext) -> CodecResult<Self> {
        if ctx.remaining() == 0 {
            return Ok(AssociatedTokenInstruction::Create);
        }
        match ctx.read_byte()? {
            0 => Ok(AssociatedTokenInstruction::Create),
            1 => Ok(AssociatedTokenInstruction::CreateIdempotent),
            2 => Ok(AssociatedTokenInstruction::RecoverNested),
            other => Err(CodecError::InvalidData(format!(
                "unknown associated token instruction: {}",
                other
            ))),
        }
    }

    fn encoded_size(&self) -> usize {
        1
    }
}

/// Coder for the associated token program
#[derive(Debug, Clone, Copy, Default)]
pub struct AssociatedTokenCoder;

impl AssociatedTokenCoder {
    pub fn new() -> Self {
        Self
    }

    pub fn program_id(&self) -> Pubkey {
        ASSOCIATED_TOKEN_PROGRAM_ID
    }
}

impl Coder for AssociatedTokenCoder {
    fn kind(&self) -> &'static str {
        "associated token"
    }

    fn encode_instruction(&self, name: &str, _args: &Value) -> CoderResult<Vec<u8>> {
        let ix = AssociatedTokenInstruction::from_name(name)
            .ok_or_else(|| CoderError::unknown("associated token instruction", name))?;
        Ok(encode_to_vec(&ix)?)
    }

    fn decode_instruction(&self, data: &[u8]) -> CoderResult<Instruction> {
        let ix = AssociatedTokenInstruction::decode(&mut DecodeContext::new(data))?;
        Ok(Instruction {
            name: ix.name().to_string(),
            data: Value::Struct(Vec::new()),
        })
    }
}
