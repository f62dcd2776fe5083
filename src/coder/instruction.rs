//! Instruction Coder
//!
//! Instruction data is `discriminator(global, snake_case(name)) ++ args`,
//! where `args` is the instruction's parameter list encoded as a struct.
//! Deprecated state methods use the same layout under the `state` namespace.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::coder::discriminator::{item_discriminator, sighash, to_snake_case, DiscriminatorTable};
use crate::coder::error::{CoderError, CoderResult};
use crate::coder::layout::{Layout, LayoutRegistry};
use crate::coder::value::Value;
use crate::crypto::{Discriminator, Namespace, Pubkey};
use crate::idl::{
    Idl, IdlField, IdlInstruction, IdlInstructionAccountItem, SchemaError,
};

/// A decoded instruction
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub name: String,
    /// Arguments as a struct value, in declared order
    pub data: Value,
}

/// Text encoding of raw instruction data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Hex,
    Base58,
}

/// An account passed to an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn new(pubkey: Pubkey, is_signer: bool, is_writable: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable,
        }
    }
}

/// Human-readable rendering of an instruction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstructionDisplay {
    pub args: Vec<DisplayArg>,
    pub accounts: Vec<DisplayAccount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayArg {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayAccount {
    pub name: String,
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

#[derive(Debug, Clone)]
struct IxEntry {
    name: String,
    args: Vec<IdlField>,
    accounts: Vec<IdlInstructionAccountItem>,
    layout: Layout,
}

/// Routing table plus layouts for one namespace of instructions
#[derive(Debug, Clone)]
struct IxSet {
    entries: Vec<IxEntry>,
    table: DiscriminatorTable,
    by_name: HashMap<String, usize>,
}

impl IxSet {
    fn build(
        namespace: Namespace,
        instructions: &[IdlInstruction],
        registry: &LayoutRegistry,
    ) -> CoderResult<Self> {
        let mut set = Self {
            entries: Vec::with_capacity(instructions.len()),
            table: DiscriminatorTable::new(namespace),
            by_name: HashMap::new(),
        };
        for ix in instructions {
            let tag = match &ix.discriminator {
                Some(bytes) => item_discriminator(namespace, &ix.name, Some(bytes))?,
                None => sighash(namespace, &ix.name),
            };
            let idx = set.table.insert(&ix.name, tag)?;
            if idx != set.entries.len() {
                return Err(SchemaError::DuplicateName {
                    kind: "instruction",
                    name: ix.name.clone(),
                }
                .into());
            }
            let layout = registry.fields_layout(&ix.args, &format!("instruction {}", ix.name))?;
            set.by_name.insert(ix.name.clone(), idx);
            set.by_name.entry(to_snake_case(&ix.name)).or_insert(idx);
            set.entries.push(IxEntry {
                name: ix.name.clone(),
                args: ix.args.clone(),
                accounts: ix.accounts.clone(),
                layout,
            });
        }
        Ok(set)
    }

    fn lookup(&self, name: &str) -> Option<usize> {
        self.by_name
            .get(name)
            .or_else(|| self.by_name.get(&to_snake_case(name)))
            .copied()
    }
}

/// Encodes and decodes instruction data for one schema
#[derive(Debug, Clone)]
pub struct InstructionCoder {
    registry: Arc<LayoutRegistry>,
    global: IxSet,
    state: IxSet,
}

impl InstructionCoder {
    pub fn new(idl: &Idl, registry: Arc<LayoutRegistry>) -> CoderResult<Self> {
        let global = IxSet::build(Namespace::Global, &idl.instructions, &registry)?;
        let methods = idl.state.as_ref().map(|s| s.methods.as_slice()).unwrap_or(&[]);
        let state = IxSet::build(Namespace::State, methods, &registry)?;
        Ok(Self {
            registry,
            global,
            state,
        })
    }

    /// Encode a program instruction
    pub fn encode(&self, name: &str, args: &Value) -> CoderResult<Vec<u8>> {
        Self::encode_in(&self.global, &self.registry, name, args)
    }

    /// Encode a method call on the deprecated state account
    pub fn encode_state(&self, name: &str, args: &Value) -> CoderResult<Vec<u8>> {
        Self::encode_in(&self.state, &self.registry, name, args)
    }

    fn encode_in(
        set: &IxSet,
        registry: &LayoutRegistry,
        name: &str,
        args: &Value,
    ) -> CoderResult<Vec<u8>> {
        let idx = set
            .lookup(name)
            .ok_or_else(|| CoderError::unknown("instruction", name))?;
        let tag = set
            .table
            .tag(idx)
            .ok_or_else(|| CoderError::unknown("instruction", name))?;
        Ok(registry.encode_with_prefix(tag.as_bytes(), &set.entries[idx].layout, args)?)
    }

    /// Decode instruction data back into its name and arguments
    pub fn decode(&self, data: &[u8]) -> CoderResult<Instruction> {
        let (idx, payload) = self.global.table.route(data)?;
        let entry = &self.global.entries[idx];
        let args = self.registry.decode(&entry.layout, payload)?;
        Ok(Instruction {
            name: entry.name.clone(),
            data: args,
        })
    }

    /// Decode hex or base58 instruction data
    pub fn decode_str(&self, data: &str, encoding: Encoding) -> CoderResult<Instruction> {
        let bytes = match encoding {
            Encoding::Hex => {
                hex::decode(data.trim()).map_err(|e| CoderError::InvalidEncoding(e.to_string()))?
            }
            Encoding::Base58 => bs58::decode(data.trim())
                .into_vec()
                .map_err(|e| CoderError::InvalidEncoding(e.to_string()))?,
        };
        self.decode(&bytes)
    }

    /// Tag of an instruction
    pub fn discriminator(&self, name: &str) -> Option<Discriminator> {
        self.global
            .lookup(name)
            .and_then(|idx| self.global.table.tag(idx))
    }

    /// Render a decoded instruction with the accounts it was invoked with
    ///
    /// Nested account groups are flattened with dotted names; metas beyond
    /// the declared accounts are listed as `Remaining N`.
    pub fn format(
        &self,
        ix: &Instruction,
        metas: &[AccountMeta],
    ) -> CoderResult<InstructionDisplay> {
        let idx = self
            .global
            .lookup(&ix.name)
            .ok_or_else(|| CoderError::unknown("instruction", &ix.name))?;
        let entry = &self.global.entries[idx];

        let args = entry
            .args
            .iter()
            .map(|field| DisplayArg {
                name: field.name.clone(),
                ty: field.ty.to_string(),
                data: ix.data.get(&field.name).map(display_value).unwrap_or_default(),
            })
            .collect();

        let mut names = Vec::new();
        flatten_accounts(&entry.accounts, None, &mut names);
        let accounts = metas
            .iter()
            .enumerate()
            .map(|(i, meta)| DisplayAccount {
                name: names
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("Remaining {}", i - names.len() + 1)),
                pubkey: meta.pubkey,
                is_signer: meta.is_signer,
                is_writable: meta.is_writable,
            })
            .collect();

        Ok(InstructionDisplay { args, accounts })
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::PublicKey(k) => k.to_base58(),
        other => other.to_json().to_string(),
    }
}

fn flatten_accounts(
    items: &[IdlInstructionAccountItem],
    prefix: Option<&str>,
    out: &mut Vec<String>,
) {
    for item in items {
        let (name, nested) = match item {
            IdlInstructionAccountItem::Single(acc) => (&acc.name, None),
            IdlInstructionAccountItem::Composite(group) => (&group.name, Some(&group.accounts)),
        };
        let full = match prefix {
            Some(p) => format!("{}.{}", p, name),
            None => name.clone(),
        };
        match nested {
            Some(accounts) => flatten_accounts(accounts, Some(&full), out),
            None => out.push(full),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coder::codec::CodecError;

    fn counter_coder() -> InstructionCoder {
        let idl = Idl::from_json(include_str!("fixtures/counter.json")).unwrap();
        let registry = Arc::new(LayoutRegistry::build(&idl, 64).unwrap());
        InstructionCoder::new(&idl, registry).unwrap()
    }

    #[test]
    fn test_encode_initialize() {
        let coder = counter_coder();
        let data = coder
            .encode("initialize", &Value::record([("amount", Value::from(1234u64))]))
            .unwrap();
        assert_eq!(
            data,
            vec![175, 175, 109, 31, 13, 152, 155, 237, 0xD2, 0x04, 0, 0, 0, 0, 0, 0]
        );

        let ix = coder.decode(&data).unwrap();
        assert_eq!(ix.name, "initialize");
        assert_eq!(ix.data.get("amount").and_then(Value::as_u64), Some(1234));
    }

    #[test]
    fn test_camel_case_name_hashed_as_snake_case() {
        let coder = counter_coder();
        let args = Value::record([
            ("bump", Value::from(255u8)),
            ("label", "main".into()),
            ("limits", Value::some(Value::List(vec![10u32.into(), 20u32.into()]))),
        ]);
        let data = coder.encode("initializeVault", &args).unwrap();
        assert_eq!(
            &data[..8],
            Discriminator::new(Namespace::Global, "initialize_vault").as_bytes()
        );
        // snake_case lookup resolves to the same instruction
        assert_eq!(coder.encode("initialize_vault", &args).unwrap(), data);

        let ix = coder.decode(&data).unwrap();
        assert_eq!(ix.name, "initializeVault");
        assert_eq!(ix.data, args);
    }

    #[test]
    fn test_enum_and_recursive_args_roundtrip() {
        let coder = counter_coder();
        let chain = Value::record([
            ("value", Value::from(1u8)),
            (
                "next",
                Value::some(Value::record([
                    ("value", Value::from(2u8)),
                    ("next", Value::none()),
                ])),
            ),
        ]);
        for shape in [
            Value::unit_variant("Empty"),
            Value::variant("Circle", Value::record([("radius", Value::from(9u16))])),
            Value::variant("Rect", Value::Tuple(vec![3u16.into(), 4u16.into()])),
        ] {
            let args = Value::record([("shape", shape), ("chain", chain.clone())]);
            let data = coder.encode("reshape", &args).unwrap();
            assert_eq!(coder.decode(&data).unwrap().data, args);
        }
    }

    #[test]
    fn test_unknown_discriminator() {
        let coder = counter_coder();
        let err = coder.decode(&[0u8; 16]).unwrap_err();
        assert!(matches!(
            err,
            CoderError::UnknownDiscriminator {
                namespace: Namespace::Global,
                ..
            }
        ));
    }

    #[test]
    fn test_truncated_args() {
        let coder = counter_coder();
        let mut data = coder
            .encode("initialize", &Value::record([("amount", Value::from(1u64))]))
            .unwrap();
        data.truncate(12);
        assert!(matches!(
            coder.decode(&data),
            Err(CoderError::Codec(CodecError::BufferUnderflow { .. }))
        ));
    }

    #[test]
    fn test_unknown_instruction_name() {
        let coder = counter_coder();
        assert!(matches!(
            coder.encode("nope", &Value::Unit),
            Err(CoderError::UnknownItem { .. })
        ));
    }

    #[test]
    fn test_state_method_uses_state_namespace() {
        let coder = counter_coder();
        let admin = Pubkey::new_from_array([3; 32]);
        let data = coder
            .encode_state("setAdmin", &Value::record([("admin", Value::from(admin))]))
            .unwrap();
        assert_eq!(
            &data[..8],
            Discriminator::new(Namespace::State, "set_admin").as_bytes()
        );
        assert_eq!(&data[8..], admin.as_bytes());
    }

    #[test]
    fn test_decode_str() {
        let coder = counter_coder();
        let data = coder
            .encode("initialize", &Value::record([("amount", Value::from(7u64))]))
            .unwrap();

        let from_hex = coder.decode_str(&hex::encode(&data), Encoding::Hex).unwrap();
        let from_b58 = coder
            .decode_str(&bs58::encode(&data).into_string(), Encoding::Base58)
            .unwrap();
        assert_eq!(from_hex, from_b58);
        assert_eq!(from_hex.name, "initialize");

        assert!(matches!(
            coder.decode_str("zz", Encoding::Hex),
            Err(CoderError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_format() {
        let coder = counter_coder();
        let ix = Instruction {
            name: "initializeVault".to_string(),
            data: Value::record([
                ("bump", Value::from(1u8)),
                ("label", "main".into()),
                ("limits", Value::none()),
            ]),
        };
        let metas = [
            AccountMeta::new(Pubkey::new_from_array([1; 32]), false, true),
            AccountMeta::new(Pubkey::new_from_array([2; 32]), true, false),
            AccountMeta::new(Pubkey::new_from_array([3; 32]), false, false),
        ];
        let display = coder.format(&ix, &metas).unwrap();

        assert_eq!(display.args.len(), 3);
        assert_eq!(display.args[0].ty, "u8");
        assert_eq!(display.args[0].data, "1");
        assert_eq!(display.args[1].data, "main");
        assert_eq!(display.args[2].ty, "Option<Vec<u32>>");
        assert_eq!(display.args[2].data, "null");

        let names: Vec<_> = display.accounts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["vault.state", "vault.owner", "Remaining 1"]);
        assert!(display.accounts[1].is_signer);
    }

    #[test]
    fn test_explicit_instruction_discriminator() {
        let idl = Idl::from_json(include_str!("fixtures/vault.json")).unwrap();
        let registry = Arc::new(LayoutRegistry::build(&idl, 64).unwrap());
        let coder = InstructionCoder::new(&idl, registry).unwrap();

        let args = Value::record([
            ("amount", Value::from(5u64)),
            (
                "window",
                Value::record([
                    ("head", Value::from(1u16)),
                    ("tail", Value::List(vec![2u16.into(), 3u16.into()])),
                ]),
            ),
        ]);
        let data = coder.encode("deposit", &args).unwrap();
        assert_eq!(&data[..8], &[242, 35, 198, 137, 82, 225, 242, 182]);
        assert_eq!(&data[8..], &[5, 0, 0, 0, 0, 0, 0, 0, 1, 0, 2, 0, 3, 0]);
        assert_eq!(coder.decode(&data).unwrap().data, args);
    }
}
