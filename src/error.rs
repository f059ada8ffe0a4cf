//! Error taxonomy for the monitor
//!
//! Purpose:
//!     Separate recoverable per-record failures (DecodeError) from fatal setup
//!     failures (SchemaError, NotFoundError, ConnectError) and from the
//!     asynchronous TransportError that ends a single monitoring run.
//!
//! Created: 2026-10-18
//!
//! Propagation:
//!     - Setup errors abort startup before any consumer call.
//!     - DecodeError is reported to the error sink, the pipeline continues.
//!     - TransportError ends the current run; the caller may reopen.

use alloy::primitives::Address;
use thiserror::Error;

use crate::pipeline::PipelineStats;
use crate::types::Provenance;

/// Schema text could not be compiled into event descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("malformed schema JSON: {reason}")]
    Malformed { reason: String },

    #[error("schema entry #{index} of kind 'event' has no name")]
    UnnamedEvent { index: usize },

    #[error("event '{name}' is declared more than once")]
    DuplicateEvent { name: String },

    #[error("event '{event}' field '{field}': unrecognized type tag '{tag}'")]
    UnknownType {
        event: String,
        field: String,
        tag: String,
    },

    #[error("event '{event}': payload layout too large to address")]
    LayoutOverflow { event: String },
}

/// Requested event name is absent from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("event '{name}' not found in schema (known: {known})")]
pub struct NotFoundError {
    pub name: String,
    /// Comma-separated list of event names the registry does hold
    pub known: String,
}

/// Per-record decode failure. Never fatal to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("payload truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("missing topics: need {needed}, have {available}")]
    MissingTopics { needed: usize, available: usize },

    #[error("field '{field}': dynamic offset {offset} outside payload of {len} bytes")]
    InvalidOffset {
        field: String,
        offset: String,
        len: usize,
    },

    #[error("field '{field}': type '{tag}' is not supported in this position")]
    UnsupportedType { field: String, tag: String },
}

/// Failure of `decode-by-name`: either the lookup or the decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryDecodeError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Initial connection or subscription call failed.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("dial {endpoint} failed: {reason}")]
    Dial { endpoint: String, reason: String },

    #[error("log subscription for {address} failed: {reason}")]
    Subscribe { address: Address, reason: String },
}

/// Asynchronous failure of a live subscription.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("node closed the log subscription")]
    Closed,

    #[error("subscription lagged, {missed} notifications dropped")]
    Lagged { missed: u64 },

    #[error("log stream ended without an error signal")]
    StreamEnded,

    #[error("transport failure: {0}")]
    Other(String),
}

/// A record the pipeline received but could not decode.
#[derive(Debug, Clone, Error)]
#[error("{event} @ {provenance}: {source}")]
pub struct RecordError {
    pub event: String,
    pub provenance: Provenance,
    #[source]
    pub source: DecodeError,
}

/// Stage at which a monitoring run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SchemaLoad,
    EventResolve,
    Dial,
    Subscribe,
    Streaming,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::SchemaLoad => write!(f, "schema load"),
            Stage::EventResolve => write!(f, "event resolve"),
            Stage::Dial => write!(f, "dial"),
            Stage::Subscribe => write!(f, "subscribe"),
            Stage::Streaming => write!(f, "streaming"),
        }
    }
}

/// Fatal outcome of `start_monitoring` / `EventPipeline::run`.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("[{}] {source}", Stage::SchemaLoad)]
    Schema {
        #[source]
        source: SchemaError,
    },

    #[error("[{}] {source}", Stage::EventResolve)]
    NotFound {
        #[source]
        source: NotFoundError,
    },

    #[error("[{stage}] pool {pool}: {source}")]
    Connect {
        stage: Stage,
        pool: Address,
        #[source]
        source: ConnectError,
    },

    #[error("[{}] pool {pool}, event '{event}': {source}", Stage::Streaming)]
    Transport {
        pool: Address,
        event: String,
        /// Counters of the run up to the failure
        stats: PipelineStats,
        #[source]
        source: TransportError,
    },
}

impl MonitorError {
    pub fn stage(&self) -> Stage {
        match self {
            MonitorError::Schema { .. } => Stage::SchemaLoad,
            MonitorError::NotFound { .. } => Stage::EventResolve,
            MonitorError::Connect { stage, .. } => *stage,
            MonitorError::Transport { .. } => Stage::Streaming,
        }
    }

    /// True for failures that happened before monitoring began
    pub fn is_setup(&self) -> bool {
        !self.is_transport()
    }

    /// True when a live subscription failed; the caller may reopen
    pub fn is_transport(&self) -> bool {
        matches!(self, MonitorError::Transport { .. })
    }

    /// Dial or subscribe failed
    pub fn is_connect(&self) -> bool {
        matches!(self, MonitorError::Connect { .. })
    }

    /// Whether a reconnect loop should try again. Connect failures only
    /// count once a session has been established; schema and event-name
    /// errors never do.
    pub fn is_retryable(&self, session_established: bool) -> bool {
        self.is_transport() || (session_established && self.is_connect())
    }

    /// Counters of a streaming run that ended in a transport failure
    pub fn partial_stats(&self) -> Option<PipelineStats> {
        match self {
            MonitorError::Transport { stats, .. } => Some(*stats),
            _ => None,
        }
    }
}
