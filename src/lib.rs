//! Pool Monitor Library
//!
//! Watches a single on-chain liquidity pool for one named event and turns
//! the raw logs into typed, named fields.
//!
//! Layers (bottom-up):
//! - schema:       JSON ABI → EventDescriptors (SchemaRegistry)
//! - decoder:      RawLogRecord + EventDescriptor → DecodedEvent
//! - subscription: live eth_subscribe(logs) feed with cancel + error signal
//! - pipeline:     decode loop and the start_monitoring() entry point
//!
//! Created: 2026-10-18

pub mod cancel;
pub mod config;
pub mod contracts;
pub mod decoder;
pub mod error;
pub mod pipeline;
pub mod schema;
pub mod subscription;
pub mod types;

// Re-export commonly used types
pub use cancel::CancelToken;
pub use config::{load_config, load_config_from_file, ConfigOverrides, MonitorConfig};
pub use decoder::LogDecoder;
pub use error::{
    ConnectError, DecodeError, MonitorError, NotFoundError, RecordError, RegistryDecodeError,
    SchemaError, Stage, TransportError,
};
pub use pipeline::{
    monitor_with_reconnect, start_monitoring, EventPipeline, PipelineStats, ReconnectPolicy,
};
pub use schema::{EventDescriptor, Field, FieldType, SchemaRegistry};
pub use subscription::{
    LogFilter, LogTransport, Subscription, SubscriptionEvent, SubscriptionManager, WsTransport,
};
pub use types::{DecodedEvent, DecodedValue, Provenance, RawLogRecord};
