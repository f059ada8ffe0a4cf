//! WebSocket log transport (alloy pubsub)
//!
//! Purpose:
//!     Production LogTransport: dial a node over WebSocket and run
//!     `eth_subscribe("logs", filter)` for the pool address.
//!
//! Created: 2026-10-18
//!
//! Dependencies:
//!     - alloy (WS provider, pubsub subscription, rpc Filter/Log)
//!     - tokio (forwarding task, select!, channels)
//!
//! Notes:
//!     - One forwarding task per subscription: node notifications → bounded
//!       mpsc (backpressure lands on the pubsub buffer, not on memory).
//!     - Pubsub lag (notifications dropped by alloy's broadcast buffer) is a
//!       TransportError, never a silent gap.
//!     - On cancel or feed drop the task sends `eth_unsubscribe`.

use alloy::providers::{DynProvider, Provider, ProviderBuilder, WsConnect};
use alloy::pubsub::Subscription;
use alloy::rpc::types::Log;
use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use super::transport::{LogFeed, LogFeedSender, LogFilter, LogTransport, DEFAULT_CHANNEL_CAPACITY};
use crate::cancel::CancelToken;
use crate::error::{ConnectError, TransportError};
use crate::types::RawLogRecord;

/// WebSocket transport over an alloy provider
#[derive(Debug, Clone)]
pub struct WsTransport {
    channel_capacity: usize,
}

impl WsTransport {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Record buffer size between the node and the pipeline
    pub fn with_capacity(channel_capacity: usize) -> Self {
        Self {
            channel_capacity: channel_capacity.max(1),
        }
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogTransport for WsTransport {
    type Connection = DynProvider;

    async fn dial(&self, endpoint: &str) -> Result<DynProvider, ConnectError> {
        let ws = WsConnect::new(endpoint);
        let provider = ProviderBuilder::new()
            .connect_ws(ws)
            .await
            .map_err(|e| ConnectError::Dial {
                endpoint: redact(endpoint),
                reason: e.to_string(),
            })?;
        info!("Connected to {}", redact(endpoint));
        Ok(provider.erased())
    }

    async fn subscribe_filtered_logs(
        &self,
        connection: &DynProvider,
        filter: LogFilter,
        cancel: CancelToken,
    ) -> Result<LogFeed, ConnectError> {
        let address = filter.addresses.first().copied().unwrap_or_default();
        let subscription = connection
            .subscribe_logs(&filter.to_rpc_filter())
            .await
            .map_err(|e| ConnectError::Subscribe {
                address,
                reason: e.to_string(),
            })?;

        debug!(
            "eth_subscribe(logs) confirmed | id={:?} | addresses={} | topic0={:?}",
            subscription.local_id(),
            filter.addresses.len(),
            filter.event_signature
        );

        let (sender, feed) = LogFeed::channel(self.channel_capacity);
        tokio::spawn(forward_logs(connection.clone(), subscription, sender, cancel));
        Ok(feed)
    }
}

/// Pump node notifications into the feed until cancel, feed drop, or failure
async fn forward_logs(
    provider: DynProvider,
    mut subscription: Subscription<Log>,
    sender: LogFeedSender,
    cancel: CancelToken,
) {
    let id = *subscription.local_id();
    let LogFeedSender { records, errors } = sender;
    let mut forwarded = 0u64;

    let failure = loop {
        tokio::select! {
            _ = cancel.cancelled() => break None,
            _ = records.closed() => break None,
            item = subscription.recv() => match item {
                Ok(log) => {
                    let record = RawLogRecord::from(log);
                    tokio::select! {
                        _ = cancel.cancelled() => break None,
                        sent = records.send(record) => {
                            if sent.is_err() {
                                break None;
                            }
                            forwarded += 1;
                        }
                    }
                }
                Err(RecvError::Lagged(missed)) => break Some(TransportError::Lagged { missed }),
                Err(RecvError::Closed) => break Some(TransportError::Closed),
            }
        }
    };

    if let Some(err) = failure {
        warn!("Log subscription {:?} failed after {} records: {}", id, forwarded, err);
        let _ = errors.send(err);
    }

    match provider.unsubscribe(id).await {
        Ok(()) => debug!("eth_unsubscribe {:?} ({} records forwarded)", id, forwarded),
        Err(e) => debug!("eth_unsubscribe {:?} failed: {}", id, e),
    }
}

/// Keep API keys out of logs: show scheme + host only
fn redact(endpoint: &str) -> String {
    match endpoint.split_once("://") {
        Some((scheme, rest)) => {
            let host = rest.split('/').next().unwrap_or(rest);
            if rest.len() > host.len() {
                format!("{}://{}/…", scheme, host)
            } else {
                format!("{}://{}", scheme, host)
            }
        }
        None => endpoint.chars().take(24).collect(),
    }
}
