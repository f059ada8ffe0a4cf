//! Schema Registry
//!
//! Purpose:
//!     Compile JSON ABI text into EventDescriptors once at startup and serve
//!     exact-name lookups (resolve) and decode-by-name for the pipeline.
//!
//! Created: 2026-10-18
//!
//! Accepted input:
//!     - A bare ABI array: `[{"type":"event","name":"Swap","inputs":[...]}, ...]`
//!     - A compiler artifact object carrying an `"abi"` array
//!
//! Notes:
//!     - JSON is parsed by alloy's `JsonAbi`; only its events become
//!       descriptors. Functions, constructors and errors are skipped.
//!     - Parameter types are resolved through `DynSolType` (tuples via
//!       their components) and then narrowed to `FieldType`.
//!     - Overloaded events share a name and are rejected as duplicates:
//!       lookups are by exact name.

use alloy::dyn_abi::DynSolType;
use alloy::json_abi::{Event, JsonAbi};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use super::descriptor::{EventDescriptor, Field, FieldType};
use crate::decoder::LogDecoder;
use crate::error::{NotFoundError, RegistryDecodeError, SchemaError};
use crate::types::{DecodedEvent, RawLogRecord};

#[derive(Deserialize)]
#[serde(untagged)]
enum SchemaText {
    Abi(JsonAbi),
    Artifact { abi: JsonAbi },
}

/// Compile one alloy event into a descriptor
fn compile_event(index: usize, event: &Event) -> Result<EventDescriptor, SchemaError> {
    if event.name.is_empty() {
        return Err(SchemaError::UnnamedEvent { index });
    }

    let mut fields = Vec::with_capacity(event.inputs.len());
    for (i, param) in event.inputs.iter().enumerate() {
        let field_name = if param.name.is_empty() {
            format!("param{}", i)
        } else {
            param.name.clone()
        };
        let ty = param
            .selector_type()
            .parse::<DynSolType>()
            .ok()
            .and_then(|ty| FieldType::from_sol_type(&ty))
            .ok_or_else(|| SchemaError::UnknownType {
                event: event.name.clone(),
                field: field_name.clone(),
                tag: param.ty.clone(),
            })?;
        fields.push(Field::new(field_name, ty, param.indexed));
    }

    Ok(EventDescriptor::new(event.name.clone(), fields, event.anonymous))
}

/// Event descriptors compiled from one schema text
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    events: Vec<EventDescriptor>,
    by_name: HashMap<String, usize>,
    decoder: LogDecoder,
}

impl SchemaRegistry {
    /// Parse schema text. Pure; fails on malformed JSON, unnamed or
    /// duplicate events, unrecognized field type tags, and payload layouts
    /// too large to address.
    pub fn load(schema_text: &str) -> Result<Self, SchemaError> {
        let parsed: SchemaText =
            serde_json::from_str(schema_text).map_err(|e| SchemaError::Malformed {
                reason: e.to_string(),
            })?;
        let abi = match parsed {
            SchemaText::Abi(abi) => abi,
            SchemaText::Artifact { abi } => abi,
        };

        let mut registry = Self::default();
        for (index, event) in abi.events().enumerate() {
            let descriptor = compile_event(index, event)?;
            debug!("Event {} | topic0={}", event.signature(), event.selector());
            registry.insert(descriptor)?;
        }

        debug!(
            "Schema loaded: {} events ({}), {} functions skipped",
            registry.events.len(),
            registry.known_names(),
            abi.functions().count()
        );
        Ok(registry)
    }

    /// Build a registry from descriptors constructed in code
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = EventDescriptor>,
    ) -> Result<Self, SchemaError> {
        let mut registry = Self::default();
        for descriptor in descriptors {
            registry.insert(descriptor)?;
        }
        Ok(registry)
    }

    fn insert(&mut self, descriptor: EventDescriptor) -> Result<(), SchemaError> {
        if descriptor.head_len().is_none() {
            return Err(SchemaError::LayoutOverflow {
                event: descriptor.name().to_string(),
            });
        }
        if self.by_name.contains_key(descriptor.name()) {
            return Err(SchemaError::DuplicateEvent {
                name: descriptor.name().to_string(),
            });
        }
        self.by_name
            .insert(descriptor.name().to_string(), self.events.len());
        self.events.push(descriptor);
        Ok(())
    }

    /// Exact-name lookup
    pub fn resolve(&self, name: &str) -> Result<&EventDescriptor, NotFoundError> {
        self.by_name
            .get(name)
            .map(|&i| &self.events[i])
            .ok_or_else(|| NotFoundError {
                name: name.to_string(),
                known: self.known_names(),
            })
    }

    /// Resolve `name` and decode `record` against it
    pub fn decode(
        &self,
        name: &str,
        record: &RawLogRecord,
    ) -> Result<DecodedEvent, RegistryDecodeError> {
        let descriptor = self.resolve(name)?;
        Ok(self.decoder.decode(record, descriptor)?)
    }

    /// Descriptors in load order (JSON schemas load sorted by event name)
    pub fn events(&self) -> &[EventDescriptor] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn known_names(&self) -> String {
        self.events
            .iter()
            .map(|e| e.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
