//! Account Coder
//!
//! Persisted account data is `discriminator(account, Name) ++ struct`. The
//! leading tag doubles as a type check: decoding the bytes of one account
//! type as another fails instead of yielding garbage.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::coder::codec::CodecError;
use crate::coder::discriminator::{item_discriminator, DiscriminatorTable};
use crate::coder::error::{CoderError, CoderResult};
use crate::coder::layout::{Layout, LayoutRegistry};
use crate::coder::value::Value;
use crate::crypto::{Discriminator, Namespace, DISCRIMINATOR_LEN};
use crate::idl::{Idl, SchemaError};

/// Size of an account type's data, discriminator included
///
/// Variable-size types report the size of their smallest instance: every
/// vec, string, bytes and map empty, every option absent and every enum at
/// its smallest variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccountSize {
    Fixed(usize),
    Variable { min: usize },
}

impl AccountSize {
    /// Exact size, or the minimum for variable-size types
    pub fn min(&self) -> usize {
        match self {
            AccountSize::Fixed(n) => *n,
            AccountSize::Variable { min } => *min,
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, AccountSize::Fixed(_))
    }
}

/// Byte filter matching accounts of one type by their leading tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemcmpFilter {
    pub offset: usize,
    /// Base58 of the bytes to compare
    pub bytes: String,
}

/// A decoded account of a type found by its discriminator
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAccount {
    pub name: String,
    pub data: Value,
}

#[derive(Debug, Clone)]
struct AccountEntry {
    name: String,
    discriminator: Discriminator,
    layout: Layout,
}

/// Encodes and decodes persisted account data for one schema
#[derive(Debug, Clone)]
pub struct AccountsCoder {
    registry: Arc<LayoutRegistry>,
    entries: Vec<AccountEntry>,
    by_name: HashMap<String, usize>,
    table: DiscriminatorTable,
}

impl AccountsCoder {
    pub fn new(idl: &Idl, registry: Arc<LayoutRegistry>) -> CoderResult<Self> {
        let mut coder = Self {
            registry,
            entries: Vec::with_capacity(idl.accounts.len()),
            by_name: HashMap::new(),
            table: DiscriminatorTable::new(Namespace::Account),
        };
        for acc in &idl.accounts {
            if coder.registry.named(&acc.name).is_none() {
                return Err(SchemaError::MissingDefinition {
                    kind: "account",
                    name: acc.name.clone(),
                }
                .into());
            }
            let tag =
                item_discriminator(Namespace::Account, &acc.name, acc.discriminator.as_deref())?;
            let idx = coder.table.insert(&acc.name, tag)?;
            if idx != coder.entries.len() {
                return Err(SchemaError::DuplicateName {
                    kind: "account",
                    name: acc.name.clone(),
                }
                .into());
            }
            coder.by_name.insert(acc.name.clone(), idx);
            coder.entries.push(AccountEntry {
                name: acc.name.clone(),
                discriminator: tag,
                layout: Layout::named(&acc.name),
            });
        }
        Ok(coder)
    }

    fn entry(&self, name: &str) -> CoderResult<&AccountEntry> {
        self.by_name
            .get(name)
            .map(|&idx| &self.entries[idx])
            .ok_or_else(|| CoderError::unknown("account", name))
    }

    /// Names of every account type, in schema order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Tag of an account type
    pub fn account_discriminator(&self, name: &str) -> CoderResult<Discriminator> {
        Ok(self.entry(name)?.discriminator)
    }

    /// Encode an account, tag first
    pub fn encode(&self, name: &str, value: &Value) -> CoderResult<Vec<u8>> {
        let entry = self.entry(name)?;
        Ok(self
            .registry
            .encode_with_prefix(entry.discriminator.as_bytes(), &entry.layout, value)?)
    }

    /// Decode account data, checking that its tag belongs to `name`
    pub fn decode(&self, name: &str, data: &[u8]) -> CoderResult<Value> {
        let entry = self.entry(name)?;
        let actual = Discriminator::read_prefix(data).ok_or(CodecError::BufferUnderflow {
            needed: DISCRIMINATOR_LEN,
            available: data.len(),
        })?;
        if actual != entry.discriminator {
            return Err(CoderError::AccountDiscriminatorMismatch {
                account: entry.name.clone(),
                expected: entry.discriminator,
                actual,
            });
        }
        Ok(self
            .registry
            .decode(&entry.layout, &data[DISCRIMINATOR_LEN..])?)
    }

    /// Decode account data as `name` without looking at its tag
    pub fn decode_unchecked(&self, name: &str, data: &[u8]) -> CoderResult<Value> {
        let entry = self.entry(name)?;
        let payload = data.get(DISCRIMINATOR_LEN..).ok_or(CodecError::BufferUnderflow {
            needed: DISCRIMINATOR_LEN,
            available: data.len(),
        })?;
        Ok(self.registry.decode(&entry.layout, payload)?)
    }

    /// Decode account data of whichever type its tag names
    pub fn decode_any(&self, data: &[u8]) -> CoderResult<DecodedAccount> {
        let (idx, payload) = self.table.route(data)?;
        let entry = &self.entries[idx];
        Ok(DecodedAccount {
            name: entry.name.clone(),
            data: self.registry.decode(&entry.layout, payload)?,
        })
    }

    /// Byte length of an account type, discriminator included
    ///
    /// For variable-size types this is the minimum; see [`AccountSize`].
    pub fn size(&self, name: &str) -> CoderResult<usize> {
        Ok(self.size_info(name)?.min())
    }

    /// Byte length of an account type and whether it is fixed
    pub fn size_info(&self, name: &str) -> CoderResult<AccountSize> {
        let entry = self.entry(name)?;
        let info = self.registry.size_info(&entry.layout)?;
        let total = DISCRIMINATOR_LEN + info.min;
        Ok(if info.fixed {
            AccountSize::Fixed(total)
        } else {
            AccountSize::Variable { min: total }
        })
    }

    /// Exact byte length of one encoded account, discriminator included
    pub fn encoded_len(&self, name: &str, value: &Value) -> CoderResult<usize> {
        let entry = self.entry(name)?;
        Ok(DISCRIMINATOR_LEN + self.registry.encoded_len(&entry.layout, value)?)
    }

    /// Filter matching accounts of type `name`, optionally extended with
    /// bytes that must follow the tag
    pub fn memcmp(&self, name: &str, append: Option<&[u8]>) -> CoderResult<MemcmpFilter> {
        let entry = self.entry(name)?;
        let mut bytes = entry.discriminator.as_bytes().to_vec();
        if let Some(extra) = append {
            bytes.extend_from_slice(extra);
        }
        Ok(MemcmpFilter {
            offset: 0,
            bytes: bs58::encode(bytes).into_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Pubkey;

    fn counter_coder() -> AccountsCoder {
        let idl = Idl::from_json(include_str!("fixtures/counter.json")).unwrap();
        let registry = Arc::new(LayoutRegistry::build(&idl, 64).unwrap());
        AccountsCoder::new(&idl, registry).unwrap()
    }

    fn vault_coder() -> AccountsCoder {
        let idl = Idl::from_json(include_str!("fixtures/vault.json")).unwrap();
        let registry = Arc::new(LayoutRegistry::build(&idl, 64).unwrap());
        AccountsCoder::new(&idl, registry).unwrap()
    }

    fn counter(count: u64) -> Value {
        Value::record([
            ("authority", Value::from(Pubkey::new_from_array([7; 32]))),
            ("count", Value::from(count)),
        ])
    }

    #[test]
    fn test_roundtrip() {
        let coder = counter_coder();
        let data = coder.encode("Counter", &counter(42)).unwrap();
        assert_eq!(&data[..8], &[255, 176, 4, 245, 188, 253, 124, 25]);
        assert_eq!(data.len(), 48);
        assert_eq!(coder.decode("Counter", &data).unwrap(), counter(42));
    }

    #[test]
    fn test_fixed_size() {
        let coder = counter_coder();
        assert_eq!(coder.size("Counter").unwrap(), 48);
        let info = coder.size_info("Counter").unwrap();
        assert_eq!(info, AccountSize::Fixed(48));
        assert!(info.is_fixed());
        assert_eq!(info.min(), 48);
    }

    #[test]
    fn test_variable_size_reports_empty_instance() {
        let coder = counter_coder();
        assert_eq!(coder.size("Registry").unwrap(), 12);
        let info = coder.size_info("Registry").unwrap();
        assert_eq!(info, AccountSize::Variable { min: 12 });
        assert!(!info.is_fixed());
        assert_eq!(info.min(), 12);

        let empty = Value::record([("entries", Value::List(vec![]))]);
        assert_eq!(coder.encoded_len("Registry", &empty).unwrap(), 12);
        assert_eq!(coder.encode("Registry", &empty).unwrap().len(), 12);

        let three = Value::record([(
            "entries",
            Value::List(vec![1u8.into(), 2u8.into(), 3u8.into()]),
        )]);
        assert_eq!(coder.encoded_len("Registry", &three).unwrap(), 15);
    }

    #[test]
    fn test_wrong_type_mismatch_but_unchecked_decodes() {
        let coder = counter_coder();
        let data = coder.encode("Counter", &counter(1)).unwrap();

        let err = coder.decode("Tally", &data).unwrap_err();
        match err {
            CoderError::AccountDiscriminatorMismatch {
                account,
                expected,
                actual,
            } => {
                assert_eq!(account, "Tally");
                assert_eq!(expected, Discriminator::new(Namespace::Account, "Tally"));
                assert_eq!(actual, Discriminator::new(Namespace::Account, "Counter"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let garbage = coder.decode_unchecked("Tally", &data).unwrap();
        assert!(garbage.get("count").is_some());
    }

    #[test]
    fn test_decode_any() {
        let coder = counter_coder();
        let data = coder.encode("Counter", &counter(9)).unwrap();
        let decoded = coder.decode_any(&data).unwrap();
        assert_eq!(decoded.name, "Counter");
        assert_eq!(decoded.data, counter(9));

        assert!(matches!(
            coder.decode_any(&[0; 8]),
            Err(CoderError::UnknownDiscriminator { .. })
        ));
    }

    #[test]
    fn test_short_data() {
        let coder = counter_coder();
        assert!(matches!(
            coder.decode("Counter", &[1, 2, 3]),
            Err(CoderError::Codec(CodecError::BufferUnderflow { .. }))
        ));
    }

    #[test]
    fn test_memcmp() {
        let coder = counter_coder();
        let filter = coder.memcmp("Counter", None).unwrap();
        assert_eq!(filter.offset, 0);
        assert_eq!(
            bs58::decode(&filter.bytes).into_vec().unwrap(),
            vec![255, 176, 4, 245, 188, 253, 124, 25]
        );

        let filter = coder.memcmp("Counter", Some(&[7; 32])).unwrap();
        assert_eq!(bs58::decode(&filter.bytes).into_vec().unwrap().len(), 40);
    }

    #[test]
    fn test_explicit_discriminator_and_extended_types() {
        let coder = vault_coder();
        let value = Value::record([
            ("owner", Value::from(Pubkey::new_from_array([1; 32]))),
            ("balance", Value::from(500u64)),
            ("bump", Value::from(254u8)),
            ("fees", Value::some(Value::from(3u64))),
            ("tags", Value::Map(vec![("gold".into(), 1u8.into())])),
        ]);
        let data = coder.encode("Vault", &value).unwrap();
        assert_eq!(&data[..8], &[211, 8, 232, 43, 2, 152, 117, 119]);
        // tag + owner + balance + bump + coption(4 + 8) + map(4 + (4 + 4) + 1)
        assert_eq!(data.len(), 8 + 32 + 8 + 1 + 12 + 13);
        assert_eq!(coder.decode("Vault", &data).unwrap(), value);

        assert_eq!(
            coder.size_info("Vault").unwrap(),
            AccountSize::Variable {
                min: 8 + 32 + 8 + 1 + 4 + 4
            }
        );
    }

    #[test]
    fn test_unknown_account_name() {
        let coder = counter_coder();
        assert!(matches!(
            coder.size("Nope"),
            Err(CoderError::UnknownItem { kind: "account", .. })
        ));
    }
}
