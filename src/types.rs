// Core data structures: raw logs as received, decoded events as delivered

use alloy::primitives::{Address, Bytes, B256, I256, U256};
use serde_json::{json, Map, Value};
use std::fmt;

/// Where a log came from. Used for ordering and idempotence, never for decoding.
/// Pending logs carry no block fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance {
    pub block_number: Option<u64>,
    pub block_hash: Option<B256>,
    pub transaction_hash: Option<B256>,
    pub log_index: Option<u64>,
    /// Set when the node retracts the log after a reorg
    pub removed: bool,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.block_number {
            Some(n) => write!(f, "block {}", n)?,
            None => write!(f, "block ?")?,
        }
        if let Some(idx) = self.log_index {
            write!(f, " log {}", idx)?;
        }
        if let Some(tx) = self.transaction_hash {
            write!(f, " tx {:?}", tx)?;
        }
        if self.removed {
            write!(f, " (removed)")?;
        }
        Ok(())
    }
}

/// A log record exactly as the transport delivered it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLogRecord {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub provenance: Provenance,
}

impl RawLogRecord {
    pub fn new(address: Address, topics: Vec<B256>, data: impl Into<Bytes>) -> Self {
        Self {
            address,
            topics,
            data: data.into(),
            provenance: Provenance::default(),
        }
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }
}

impl From<alloy::rpc::types::Log> for RawLogRecord {
    fn from(log: alloy::rpc::types::Log) -> Self {
        let provenance = Provenance {
            block_number: log.block_number,
            block_hash: log.block_hash,
            transaction_hash: log.transaction_hash,
            log_index: log.log_index,
            removed: log.removed,
        };
        let address = log.address();
        let topics = log.topics().to_vec();
        Self {
            address,
            topics,
            data: log.inner.data.data,
            provenance,
        }
    }
}

/// A single decoded field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedValue {
    Address(Address),
    Uint(U256),
    Int(I256),
    Bool(bool),
    /// bytes1..bytes32, trimmed to the declared width
    FixedBytes(Bytes),
    Bytes(Bytes),
    String(String),
    /// Indexed reference type: only its keccak-256 hash is on-chain
    TopicHash(B256),
}

impl DecodedValue {
    pub fn as_address(&self) -> Option<Address> {
        match self {
            DecodedValue::Address(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<U256> {
        match self {
            DecodedValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<I256> {
        match self {
            DecodedValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DecodedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DecodedValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// JSON form. Integers are rendered as decimal strings (256-bit safe).
    pub fn to_json(&self) -> Value {
        match self {
            DecodedValue::Address(a) => json!(format!("{:?}", a)),
            DecodedValue::Uint(v) => json!(v.to_string()),
            DecodedValue::Int(v) => json!(v.to_string()),
            DecodedValue::Bool(b) => json!(b),
            DecodedValue::FixedBytes(b) | DecodedValue::Bytes(b) => json!(b.to_string()),
            DecodedValue::String(s) => json!(s),
            DecodedValue::TopicHash(h) => json!(format!("{:?}", h)),
        }
    }
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecodedValue::Address(a) => write!(f, "{:?}", a),
            DecodedValue::Uint(v) => write!(f, "{}", v),
            DecodedValue::Int(v) => write!(f, "{}", v),
            DecodedValue::Bool(b) => write!(f, "{}", b),
            DecodedValue::FixedBytes(b) | DecodedValue::Bytes(b) => write!(f, "{}", b),
            DecodedValue::String(s) => write!(f, "{:?}", s),
            DecodedValue::TopicHash(h) => write!(f, "hash:{:?}", h),
        }
    }
}

/// A fully decoded event, fields in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    pub event: String,
    pub address: Address,
    pub fields: Vec<(String, DecodedValue)>,
    pub provenance: Provenance,
}

impl DecodedEvent {
    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&DecodedValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn to_json(&self) -> Value {
        let mut fields = Map::new();
        for (name, value) in &self.fields {
            fields.insert(name.clone(), value.to_json());
        }
        json!({
            "event": self.event,
            "address": format!("{:?}", self.address),
            "block_number": self.provenance.block_number,
            "block_hash": self.provenance.block_hash.map(|h| format!("{:?}", h)),
            "transaction_hash": self.provenance.transaction_hash.map(|h| format!("{:?}", h)),
            "log_index": self.provenance.log_index,
            "removed": self.provenance.removed,
            "fields": fields,
        })
    }
}

impl fmt::Display for DecodedEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} @ {} |", self.event, self.provenance)?;
        for (name, value) in &self.fields {
            write!(f, " {}={}", name, value)?;
        }
        Ok(())
    }
}
