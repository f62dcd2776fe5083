//! Event Coder
//!
//! Programs emit events either as log lines (`Program data: <base64>`) or as
//! a self-invocation whose data is `EVENT_IX_TAG ++ event bytes`. In both
//! cases the event bytes are `discriminator(event, Name) ++ struct`.
//!
//! Log streams interleave records from every program in a transaction, so
//! anything that is not recognisably one of this schema's events decodes to
//! `None` rather than an error.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{trace, warn};

use crate::coder::discriminator::{item_discriminator, DiscriminatorTable};
use crate::coder::error::{CoderError, CoderResult};
use crate::coder::layout::{Layout, LayoutRegistry};
use crate::coder::value::Value;
use crate::config::CoderConfig;
use crate::crypto::{Discriminator, Namespace, Pubkey, DISCRIMINATOR_LEN, EVENT_IX_TAG};
use crate::idl::{Idl, IdlField, SchemaError};

/// A decoded event
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub data: Value,
}

impl Event {
    /// JSON rendering `{"name": .., "data": ..}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "name": self.name, "data": self.data.to_json() })
    }
}

/// One inner invocation recorded for a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InnerInstruction {
    pub program_id: Pubkey,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
struct EventEntry {
    name: String,
    discriminator: Discriminator,
    layout: Layout,
}

/// Decodes events emitted by one program
#[derive(Debug, Clone)]
pub struct EventCoder {
    registry: Arc<LayoutRegistry>,
    entries: Vec<EventEntry>,
    by_name: HashMap<String, usize>,
    table: DiscriminatorTable,
    program_id: Option<Pubkey>,
    config: CoderConfig,
}

impl EventCoder {
    pub fn new(idl: &Idl, registry: Arc<LayoutRegistry>, config: CoderConfig) -> CoderResult<Self> {
        let program_id = idl.program_id()?;
        let mut coder = Self {
            registry,
            entries: Vec::with_capacity(idl.events.len()),
            by_name: HashMap::new(),
            table: DiscriminatorTable::new(Namespace::Event),
            program_id,
            config,
        };
        for event in &idl.events {
            let context = format!("event {}", event.name);
            let layout = match &event.fields {
                Some(fields) => {
                    let fields: Vec<IdlField> = fields
                        .iter()
                        .map(|f| IdlField::new(&f.name, f.ty.clone()))
                        .collect();
                    coder.registry.fields_layout(&fields, &context)?
                }
                None => {
                    if coder.registry.named(&event.name).is_none() {
                        return Err(SchemaError::MissingDefinition {
                            kind: "event",
                            name: event.name.clone(),
                        }
                        .into());
                    }
                    Layout::named(&event.name)
                }
            };
            let tag =
                item_discriminator(Namespace::Event, &event.name, event.discriminator.as_deref())?;
            let idx = coder.table.insert(&event.name, tag)?;
            if idx != coder.entries.len() {
                return Err(SchemaError::DuplicateName {
                    kind: "event",
                    name: event.name.clone(),
                }
                .into());
            }
            coder.by_name.insert(event.name.clone(), idx);
            coder.entries.push(EventEntry {
                name: event.name.clone(),
                discriminator: tag,
                layout,
            });
        }
        Ok(coder)
    }

    /// Program the schema belongs to, if it declares an address
    pub fn program_id(&self) -> Option<&Pubkey> {
        self.program_id.as_ref()
    }

    pub fn config(&self) -> &CoderConfig {
        &self.config
    }

    /// Decode one log line
    ///
    /// Returns `None` for lines without the event prefix, with invalid
    /// base64, with a tag that is not one of this schema's events, or whose
    /// payload does not decode. The last case is logged at `warn`.
    pub fn decode(&self, log: &str) -> Option<Event> {
        let payload = self.strip_prefix(log)?;
        let bytes = match STANDARD.decode(payload.trim_end()) {
            Ok(bytes) => bytes,
            Err(e) => {
                trace!(error = %e, "skipping log line with invalid base64");
                return None;
            }
        };
        self.decode_bytes(&bytes)
    }

    fn strip_prefix<'l>(&self, log: &'l str) -> Option<&'l str> {
        if let Some(rest) = log.strip_prefix(self.config.program_data_prefix.as_str()) {
            return Some(rest);
        }
        if self.config.accept_log_prefix_events {
            if let Some(rest) = log.strip_prefix(self.config.program_log_prefix.as_str()) {
                return Some(rest);
            }
        }
        trace!(line = log, "skipping log line without event prefix");
        None
    }

    /// Decode raw event bytes (tag followed by payload)
    pub fn decode_bytes(&self, bytes: &[u8]) -> Option<Event> {
        let tag = Discriminator::read_prefix(bytes)?;
        let idx = match self.table.find(&tag) {
            Some(idx) => idx,
            None => {
                trace!(discriminator = %tag, "skipping event of another program");
                return None;
            }
        };
        let entry = &self.entries[idx];
        match self
            .registry
            .decode(&entry.layout, &bytes[DISCRIMINATOR_LEN..])
        {
            Ok(data) => Some(Event {
                name: entry.name.clone(),
                data,
            }),
            Err(e) => {
                warn!(event = %entry.name, error = %e, "malformed event payload");
                None
            }
        }
    }

    /// Encode an event, tag first
    pub fn encode(&self, name: &str, value: &Value) -> CoderResult<Vec<u8>> {
        let entry = self
            .by_name
            .get(name)
            .map(|&idx| &self.entries[idx])
            .ok_or_else(|| CoderError::unknown("event", name))?;
        Ok(self
            .registry
            .encode_with_prefix(entry.discriminator.as_bytes(), &entry.layout, value)?)
    }

    /// Encode an event as the log line a program would emit for it
    pub fn encode_log(&self, name: &str, value: &Value) -> CoderResult<String> {
        let bytes = self.encode(name, value)?;
        Ok(format!(
            "{}{}",
            self.config.program_data_prefix,
            STANDARD.encode(bytes)
        ))
    }

    /// Events emitted through self-invocation, in invocation order
    ///
    /// Only invocations of this schema's program whose data starts with
    /// [`EVENT_IX_TAG`] are considered; everything else is skipped. Fails if
    /// the schema declares no program address.
    pub fn decode_inner_instructions(&self, inner: &[InnerInstruction]) -> CoderResult<Vec<Event>> {
        let program_id = self
            .program_id
            .ok_or(SchemaError::MissingSection("address"))?;
        Ok(inner
            .iter()
            .filter(|ix| ix.program_id == program_id)
            .filter_map(|ix| ix.data.strip_prefix(&EVENT_IX_TAG[..]))
            .filter_map(|bytes| self.decode_bytes(bytes))
            .collect())
    }

    /// Number of events in the schema
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
