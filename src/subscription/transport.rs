//! Transport seam
//!
//! The node connection is an opaque capability: dial an endpoint, then
//! subscribe to logs matching a filter. A subscription is delivered as a
//! LogFeed: a bounded record channel plus a separate one-shot error signal,
//! so transport failures never travel in-band with data.

use alloy::primitives::{Address, B256};
use alloy::rpc::types::Filter;
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::cancel::CancelToken;
use crate::error::{ConnectError, TransportError};
use crate::types::RawLogRecord;

/// Default record buffer between the transport and the pipeline
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Node-side log filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub addresses: Vec<Address>,
    /// Restrict to one event (topic 0); None = every event the address emits
    pub event_signature: Option<B256>,
}

impl LogFilter {
    pub fn for_address(address: Address) -> Self {
        Self {
            addresses: vec![address],
            event_signature: None,
        }
    }

    pub fn with_event_signature(mut self, signature_hash: B256) -> Self {
        self.event_signature = Some(signature_hash);
        self
    }

    /// alloy filter for `eth_subscribe("logs", ..)`
    pub fn to_rpc_filter(&self) -> Filter {
        let filter = Filter::new().address(self.addresses.clone());
        match self.event_signature {
            Some(topic0) => filter.event_signature(topic0),
            None => filter,
        }
    }
}

/// Consumer half of a live subscription
#[derive(Debug)]
pub struct LogFeed {
    pub records: mpsc::Receiver<RawLogRecord>,
    pub errors: oneshot::Receiver<TransportError>,
}

/// Producer half, held by the transport's forwarding task
#[derive(Debug)]
pub struct LogFeedSender {
    pub records: mpsc::Sender<RawLogRecord>,
    pub errors: oneshot::Sender<TransportError>,
}

impl LogFeed {
    /// Bounded record channel (capacity >= 1) plus the error signal
    pub fn channel(capacity: usize) -> (LogFeedSender, LogFeed) {
        let (records_tx, records_rx) = mpsc::channel(capacity.max(1));
        let (errors_tx, errors_rx) = oneshot::channel();
        (
            LogFeedSender {
                records: records_tx,
                errors: errors_tx,
            },
            LogFeed {
                records: records_rx,
                errors: errors_rx,
            },
        )
    }
}

/// Opaque node transport
#[async_trait]
pub trait LogTransport: Send + Sync {
    type Connection: Send + Sync;

    /// Connect to `endpoint`. Fails fast; never retried here.
    async fn dial(&self, endpoint: &str) -> Result<Self::Connection, ConnectError>;

    /// Start a filtered log subscription. Returns once the node confirmed it.
    /// The feed stops and the node subscription is released when `cancel`
    /// is raised or the feed is dropped.
    async fn subscribe_filtered_logs(
        &self,
        connection: &Self::Connection,
        filter: LogFilter,
        cancel: CancelToken,
    ) -> Result<LogFeed, ConnectError>;
}
