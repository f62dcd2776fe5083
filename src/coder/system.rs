//! System Program Coder
//!
//! The native program that creates accounts and moves lamports has a
//! hand-fixed instruction set rather than a schema: a 4-byte LE instruction
//! index followed by fixed fields. Seeds are bincode strings (8-byte LE
//! length + UTF-8). It owns no schema accounts, events or types, so those
//! operations report `NotSupported`.

use crate::coder::codec::{
    encode_to_vec, Codec, CodecError, CodecResult, DecodeContext, EncodeContext,
};
use crate::coder::error::{CoderError, CoderResult};
use crate::coder::instruction::Instruction;
use crate::coder::value::Value;
use crate::coder::Coder;
use crate::crypto::{Pubkey, PUBKEY_BYTES};

/// Address of the system program
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0; 32]);

/// One system program instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemInstruction {
    CreateAccount {
        lamports: u64,
        space: u64,
        owner: Pubkey,
    },
    Assign {
        owner: Pubkey,
    },
    Transfer {
        lamports: u64,
    },
    CreateAccountWithSeed {
        base: Pubkey,
        seed: String,
        lamports: u64,
        space: u64,
        owner: Pubkey,
    },
    AdvanceNonceAccount,
    WithdrawNonceAccount {
        lamports: u64,
    },
    InitializeNonceAccount {
        authorized: Pubkey,
    },
    AuthorizeNonceAccount {
        authorized: Pubkey,
    },
    Allocate {
        space: u64,
    },
    AllocateWithSeed {
        base: Pubkey,
        seed: String,
        space: u64,
        owner: Pubkey,
    },
    AssignWithSeed {
        base: Pubkey,
        seed: String,
        owner: Pubkey,
    },
    TransferWithSeed {
        lamports: u64,
        from_seed: String,
        from_owner: Pubkey,
    },
    UpgradeNonceAccount,
}

impl SystemInstruction {
    /// Wire index of the instruction
    pub fn index(&self) -> u32 {
        match self {
            SystemInstruction::CreateAccount { .. } => 0,
            SystemInstruction::Assign { .. } => 1,
            SystemInstruction::Transfer { .. } => 2,
            SystemInstruction::CreateAccountWithSeed { .. } => 3,
            SystemInstruction::AdvanceNonceAccount => 4,
            SystemInstruction::WithdrawNonceAccount { .. } => 5,
            SystemInstruction::InitializeNonceAccount { .. } => 6,
            SystemInstruction::AuthorizeNonceAccount { .. } => 7,
            SystemInstruction::Allocate { .. } => 8,
            SystemInstruction::AllocateWithSeed { .. } => 9,
            SystemInstruction::AssignWithSeed { .. } => 10,
            SystemInstruction::TransferWithSeed { .. } => 11,
            SystemInstruction::UpgradeNonceAccount => 12,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SystemInstruction::CreateAccount { .. } => "createAccount",
            SystemInstruction::Assign { .. } => "assign",
            SystemInstruction::Transfer { .. } => "transfer",
            SystemInstruction::CreateAccountWithSeed { .. } => "createAccountWithSeed",
            SystemInstruction::AdvanceNonceAccount => "advanceNonceAccount",
            SystemInstruction::WithdrawNonceAccount { .. } => "withdrawNonceAccount",
            SystemInstruction::InitializeNonceAccount { .. } => "initializeNonceAccount",
            SystemInstruction::AuthorizeNonceAccount { .. } => "authorizeNonceAccount",
            SystemInstruction::Allocate { .. } => "allocate",
            SystemInstruction::AllocateWithSeed { .. } => "allocateWithSeed",
            SystemInstruction::AssignWithSeed { .. } => "assignWithSeed",
            SystemInstruction::TransferWithSeed { .. } => "transferWithSeed",
            SystemInstruction::UpgradeNonceAccount => "upgradeNonceAccount",
        }
    }

    /// Build from an instruction name and its arguments
    pub fn from_value(name: &str, args: &Value) -> CoderResult<Self> {
        Ok(match name {
            "createAccount" => SystemInstruction::CreateAccount {
                lamports: field_u64(args, "lamports")?,
                space: field_u64(args, "space")?,
                owner: field_pubkey(args, "owner")?,
            },
            "assign" => SystemInstruction::Assign {
                owner: field_pubkey(args, "owner")?,
            },
            "transfer" => SystemInstruction::Transfer {
                lamports: field_u64(args, "lamports")?,
            },
            "createAccountWithSeed" => SystemInstruction::CreateAccountWithSeed {
                base: field_pubkey(args, "base")?,
                seed: field_str(args, "seed")?,
                lamports: field_u64(args, "lamports")?,
                space: field_u64(args, "space")?,
                owner: field_pubkey(args, "owner")?,
            },
            "advanceNonceAccount" => SystemInstruction::AdvanceNonceAccount,
            "withdrawNonceAccount" => SystemInstruction::WithdrawNonceAccount {
                lamports: field_u64(args, "lamports")?,
            },
            "initializeNonceAccount" => SystemInstruction::InitializeNonceAccount {
                authorized: field_pubkey(args, "authorized")?,
            },
            "authorizeNonceAccount" => SystemInstruction::AuthorizeNonceAccount {
                authorized: field_pubkey(args, "authorized")?,
            },
            "allocate" => SystemInstruction::Allocate {
                space: field_u64(args, "space")?,
            },
            "allocateWithSeed" => SystemInstruction::AllocateWithSeed {
                base: field_pubkey(args, "base")?,
                seed: field_str(args, "seed")?,
                space: field_u64(args, "space")?,
                owner: field_pubkey(args, "owner")?,
            },
            "assignWithSeed" => SystemInstruction::AssignWithSeed {
                base: field_pubkey(args, "base")?,
                seed: field_str(args, "seed")?,
                owner: field_pubkey(args, "owner")?,
            },
            "transferWithSeed" => SystemInstruction::TransferWithSeed {
                lamports: field_u64(args, "lamports")?,
                from_seed: field_str(args, "fromSeed")?,
                from_owner: field_pubkey(args, "fromOwner")?,
            },
            "upgradeNonceAccount" => SystemInstruction::UpgradeNonceAccount,
            other => return Err(CoderError::unknown("system instruction", other)),
        })
    }

    /// Arguments as a struct value
    pub fn to_value(&self) -> Value {
        match self {
            SystemInstruction::CreateAccount {
                lamports,
                space,
                owner,
            } => Value::record([
                ("lamports", Value::from(*lamports)),
                ("space", Value::from(*space)),
                ("owner", Value::from(*owner)),
            ]),
            SystemInstruction::Assign { owner } => Value::record([("owner", Value::from(*owner))]),
            SystemInstruction::Transfer { lamports } | SystemInstruction::WithdrawNonceAccount { lamports } => {
                Value::record([("lamports", Value::from(*lamports))])
            }
            SystemInstruction::CreateAccountWithSeed {
                base,
                seed,
                lamports,
                space,
                owner,
            } => Value::record([
                ("base", Value::from(*base)),
                ("seed", Value::from(seed.as_str())),
                ("lamports", Value::from(*lamports)),
                ("space", Value::from(*space)),
                ("owner", Value::from(*owner)),
            ]),
            SystemInstruction::InitializeNonceAccount { authorized }
            | SystemInstruction::AuthorizeNonceAccount { authorized } => {
                Value::record([("authorized", Value::from(*authorized))])
            }
            SystemInstruction::Allocate { space } => Value::record([("space", Value::from(*space))]),
            SystemInstruction::AllocateWithSeed {
                base,
                seed,
                space,
                owner,
            } => Value::record([
                ("base", Value::from(*base)),
                ("seed", Value::from(seed.as_str())),
                ("space", Value::from(*space)),
                ("owner", Value::from(*owner)),
            ]),
            SystemInstruction::AssignWithSeed { base, seed, owner } => Value::record([
                ("base", Value::from(*base)),
                ("seed", Value::from(seed.as_str())),
                ("owner", Value::from(*owner)),
            ]),
            SystemInstruction::TransferWithSeed {
                lamports,
                from_seed,
                from_owner,
            } => Value::record([
                ("lamports", Value::from(*lamports)),
                ("fromSeed", Value::from(from_seed.as_str())),
                ("fromOwner", Value::from(*from_owner)),
            ]),
            SystemInstruction::AdvanceNonceAccount | SystemInstruction::UpgradeNonceAccount => {
                Value::Struct(Vec::new())
            }
        }
    }
}

fn write_seed(seed: &str, ctx: &mut EncodeContext) -> CodecResult<usize> {
    let len = (seed.len() as u64).encode(ctx)?;
    Ok(len + ctx.write_bytes(seed.as_bytes())?)
}

fn read_seed(ctx: &mut DecodeContext) -> CodecResult<String> {
    let len = u64::decode(ctx)?;
    let len = usize::try_from(len)
        .ok()
        .filter(|len| *len <= ctx.remaining())
        .ok_or(CodecError::BufferUnderflow {
            needed: len as usize,
            available: ctx.remaining(),
        })?;
    let bytes = ctx.read_bytes(len)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| CodecError::InvalidData(format!("invalid UTF-8 seed: {}", e)))
}

fn seed_size(seed: &str) -> usize {
    8 + seed.len()
}

impl Codec for SystemInstruction {
    fn encode(&self, ctx: &mut EncodeContext) -> CodecResult<usize> {
        let mut n = self.index().encode(ctx)?;
        match self {
            SystemInstruction::CreateAccount {
                lamports,
                space,
                owner,
            } => {
                n += lamports.encode(ctx)?;
                n += space.encode(ctx)?;
                n += owner.encode(ctx)?;
            }
            SystemInstruction::Assign { owner } => {
                n += owner.encode(ctx)?;
            }
            SystemInstruction::Transfer { lamports }
            | SystemInstruction::WithdrawNonceAccount { lamports } => {
                n += lamports.encode(ctx)?;
            }
            SystemInstruction::CreateAccountWithSeed {
                base,
                seed,
                lamports,
                space,
                owner,
            } => {
                n += base.encode(ctx)?;
                n += write_seed(seed, ctx)?;
                n += lamports.encode(ctx)?;
                n += space.encode(ctx)?;
                n += owner.encode(ctx)?;
            }
            SystemInstruction::InitializeNonceAccount { authorized }
            | SystemInstruction::AuthorizeNonceAccount { authorized } => {
                n += authorized.encode(ctx)?;
            }
            SystemInstruction::Allocate { space } => {
                n += space.encode(ctx)?;
            }
            SystemInstruction::AllocateWithSeed {
                base,
                seed,
                space,
                owner,
            } => {
                n += base.encode(ctx)?;
                n += write_seed(seed, ctx)?;
                n += space.encode(ctx)?;
                n += owner.encode(ctx)?;
            }
            SystemInstruction::AssignWithSeed { base, seed, owner } => {
                n += base.encode(ctx)?;
                n += write_seed(seed, ctx)?;
                n += owner.encode(ctx)?;
            }
            SystemInstruction::TransferWithSeed {
                lamports,
                from_seed,
                from_owner,
            } => {
                n += lamports.encode(ctx)?;
                n += write_seed(from_seed, ctx)?;
                n += from_owner.encode(ctx)?;
            }
            SystemInstruction::AdvanceNonceAccount | SystemInstruction::UpgradeNonceAccount => {}
        }
        Ok(n)
    }

    fn decode(ctx: &mut DecodeContext) -> CodecResult<Self> {
        let index = u32::decode(ctx)?;
        Ok(match index {
            0 => SystemInstruction::CreateAccount {
                lamports: u64::decode(ctx)?,
                space: u64::decode(ctx)?,
                owner: Pubkey::decode(ctx)?,
            },
            1 => SystemInstruction::Assign {
                owner: Pubkey::decode(ctx)?,
            },
            2 => SystemInstruction::Transfer {
                lamports: u64::decode(ctx)?,
            },
            3 => SystemInstruction::CreateAccountWithSeed {
                base: Pubkey::decode(ctx)?,
                seed: read_seed(ctx)?,
                lamports: u64::decode(ctx)?,
                space: u64::decode(ctx)?,
                owner: Pubkey::decode(ctx)?,
            },
            4 => SystemInstruction::AdvanceNonceAccount,
            5 => SystemInstruction::WithdrawNonceAccount {
                lamports: u64::decode(ctx)?,
            },
            6 => SystemInstruction::InitializeNonceAccount {
                authorized: Pubkey::decode(ctx)?,
            },
            7 => SystemInstruction::AuthorizeNonceAccount {
                authorized: Pubkey::decode(ctx)?,
            },
            8 => SystemInstruction::Allocate {
                space: u64::decode(ctx)?,
            },
            9 => SystemInstruction::AllocateWithSeed {
                base: Pubkey::decode(ctx)?,
                seed: read_seed(ctx)?,
                space: u64::decode(ctx)?,
                owner: Pubkey::decode(ctx)?,
            },
            10 => SystemInstruction::AssignWithSeed {
                base: Pubkey::decode(ctx)?,
                seed: read_seed(ctx)?,
                owner: Pubkey::decode(ctx)?,
            },
            11 => SystemInstruction::TransferWithSeed {
                lamports: u64::decode(ctx)?,
                from_seed: read_seed(ctx)?,
                from_owner: Pubkey::decode(ctx)?,
            },
            12 => SystemInstruction::UpgradeNonceAccount,
            other => {
                return Err(CodecError::InvalidData(format!(
                    "unknown system instruction index: {}",
                    other
                )))
            }
        })
    }

    fn encoded_size(&self) -> usize {
        4 + match self {
            SystemInstruction::CreateAccount { .. } => 8 + 8 + PUBKEY_BYTES,
            SystemInstruction::Assign { .. }
            | SystemInstruction::InitializeNonceAccount { .. }
            | SystemInstruction::AuthorizeNonceAccount { .. } => PUBKEY_BYTES,
            SystemInstruction::Transfer { .. }
            | SystemInstruction::WithdrawNonceAccount { .. }
            | SystemInstruction::Allocate { .. } => 8,
            SystemInstruction::CreateAccountWithSeed { seed, .. } => {
                PUBKEY_BYTES + seed_size(seed) + 8 + 8 + PUBKEY_BYTES
            }
            SystemInstruction::AllocateWithSeed { seed, .. } => {
                PUBKEY_BYTES + seed_size(seed) + 8 + PUBKEY_BYTES
            }
            SystemInstruction::AssignWithSeed { seed, .. } => {
                PUBKEY_BYTES + seed_size(seed) + PUBKEY_BYTES
            }
            SystemInstruction::TransferWithSeed { from_seed, .. } => {
                8 + seed_size(from_seed) + PUBKEY_BYTES
            }
            SystemInstruction::AdvanceNonceAccount | SystemInstruction::UpgradeNonceAccount => 0,
        }
    }
}

fn missing(name: &str) -> CoderError {
    CodecError::InvalidData(format!("missing field '{}'", name)).into()
}

fn field_u64(args: &Value, name: &str) -> CoderResult<u64> {
    let value = args.get(name).ok_or_else(|| missing(name))?;
    value.as_u64().ok_or_else(|| {
        CodecError::TypeMismatch {
            expected: "u64".to_string(),
            found: value.kind().to_string(),
        }
        .into()
    })
}

fn field_pubkey(args: &Value, name: &str) -> CoderResult<Pubkey> {
    match args.get(name).ok_or_else(|| missing(name))? {
        Value::PublicKey(key) => Ok(*key),
        Value::String(s) => {
            Pubkey::from_base58(s).map_err(|e| CodecError::InvalidData(e.to_string()).into())
        }
        other => Err(CodecError::TypeMismatch {
            expected: "publicKey".to_string(),
            found: other.kind().to_string(),
        }
        .into()),
    }
}

fn field_str(args: &Value, name: &str) -> CoderResult<String> {
    let value = args.get(name).ok_or_else(|| missing(name))?;
    value.as_str().map(str::to_string).ok_or_else(|| {
        CodecError::TypeMismatch {
            expected: "string".to_string(),
            found: value.kind().to_string(),
        }
        .into()
    })
}

/// Coder for the system program
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCoder;

impl SystemCoder {
    pub fn new() -> Self {
        Self
    }

    pub fn program_id(&self) -> Pubkey {
        SYSTEM_PROGRAM_ID
    }
}

impl Coder for SystemCoder {
    fn kind(&self) -> &'static str {
        "system"
    }

    fn encode_instruction(&self, name: &str, args: &Value) -> CoderResult<Vec<u8>> {
        let ix = SystemInstruction::from_value(name, args)?;
        Ok(encode_to_vec(&ix)?)
    }

    fn decode_instruction(&self, data: &[u8]) -> CoderResult<Instruction> {
        let mut ctx = DecodeContext::new(data);
        let ix = SystemInstruction::decode(&mut ctx)?;
        Ok(Instruction {
            name: ix.name().to_string(),
            data: ix.to_value(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_layout() {
        let coder = SystemCoder::new();
        let data = coder
            .encode_instruction("transfer", &Value::record([("lamports", Value::from(1000u64))]))
            .unwrap();
        let mut expected = 2u32.to_le_bytes().to_vec();
        expected.extend_from_slice(&1000u64.to_le_bytes());
        assert_eq!(data, expected);
    }

    #[test]
    fn test_create_account_layout() {
        let owner = Pubkey::new_from_array([9; 32]);
        let ix = SystemInstruction::CreateAccount {
            lamports: 5,
            space: 165,
            owner,
        };
        let data = encode_to_vec(&ix).unwrap();
        assert_eq!(data.len(), 52);
        assert_eq!(&data[0..4], &0u32.to_le_bytes());
        assert_eq!(&data[4..12], &5u64.to_le_bytes());
        assert_eq!(&data[12..20], &165u64.to_le_bytes());
        assert_eq!(&data[20..52], owner.as_bytes());

        let decoded = SystemCoder.decode_instruction(&data).unwrap();
        assert_eq!(decoded.name, "createAccount");
        assert_eq!(decoded.data, ix.to_value());
    }

    #[test]
    fn test_assign_and_allocate_indices() {
        let coder = SystemCoder::new();
        let assign = coder
            .encode_instruction(
                "assign",
                &Value::record([("owner", Value::from(Pubkey::default()))]),
            )
            .unwrap();
        assert_eq!(&assign[..4], &[1, 0, 0, 0]);

        let allocate = coder
            .encode_instruction("allocate", &Value::record([("space", Value::from(10u64))]))
            .unwrap();
        assert_eq!(&allocate[..4], &[8, 0, 0, 0]);
    }

    #[test]
    fn test_seeded_roundtrip() {
        let ix = SystemInstruction::TransferWithSeed {
            lamports: 3,
            from_seed: "vault".to_string(),
            from_owner: Pubkey::new_from_array([2; 32]),
        };
        let data = encode_to_vec(&ix).unwrap();
        assert_eq!(data.len(), ix.encoded_size());
        assert_eq!(&data[12..20], &5u64.to_le_bytes());

        let decoded = SystemCoder.decode_instruction(&data).unwrap();
        assert_eq!(
            SystemInstruction::from_value(&decoded.name, &decoded.data).unwrap(),
            ix
        );
    }

    #[test]
    fn test_unsupported_operations() {
        let coder = SystemCoder::new();
        assert!(matches!(
            coder.decode_account("nonce", &[]),
            Err(CoderError::NotSupported { coder: "system", .. })
        ));
        assert!(matches!(
            coder.decode_event("Program data: AAAA"),
            Err(CoderError::NotSupported { .. })
        ));
        assert!(matches!(
            coder.decode_instruction(&[99, 0, 0, 0]),
            Err(CoderError::Codec(CodecError::InvalidData(_)))
        ));
    }
}
