//! Subscription Manager
//!
//! Purpose:
//!     Own the lifecycle of one live log subscription against a contract
//!     address: open it, hand out records in arrival order, detect transport
//!     failure, and stop on cancellation.
//!
//! Created: 2026-10-18
//!
//! State machine:
//!     Idle ──open()──▶ Active ──error signal──▶ Erred   (terminal)
//!                             └──cancel─────────▶ Closed (terminal)
//!     No way back to Active: after Erred/Closed the caller opens a new one.
//!
//! Notes:
//!     - The manager borrows the transport and its connection; it never owns
//!       the node connection lifetime.
//!     - next_event() waits on (record, error, cancel) with an unbiased
//!       select!, so an error signal is not starved behind buffered records.

use alloy::primitives::Address;
use futures::stream::{self, Stream};
use std::fmt;
use tracing::{debug, info, warn};

use super::transport::{LogFeed, LogFilter, LogTransport};
use crate::cancel::CancelToken;
use crate::error::{ConnectError, TransportError};
use crate::types::RawLogRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Active,
    Erred,
    Closed,
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SubscriptionState::Active => write!(f, "active"),
            SubscriptionState::Erred => write!(f, "erred"),
            SubscriptionState::Closed => write!(f, "closed"),
        }
    }
}

/// What a live subscription produced next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    Record(RawLogRecord),
    /// The transport failed; the subscription is now Erred
    Failed(TransportError),
    /// Cancelled, or already terminal
    Closed,
}

/// Opens subscriptions over a borrowed transport connection
pub struct SubscriptionManager<'a, T: LogTransport> {
    transport: &'a T,
    connection: &'a T::Connection,
}

impl<'a, T: LogTransport> SubscriptionManager<'a, T> {
    pub fn new(transport: &'a T, connection: &'a T::Connection) -> Self {
        Self {
            transport,
            connection,
        }
    }

    /// Subscribe to every log `address` emits
    pub async fn open(
        &self,
        address: Address,
        cancel: &CancelToken,
    ) -> Result<Subscription, ConnectError> {
        self.open_filtered(LogFilter::for_address(address), cancel)
            .await
    }

    /// Subscribe with a full filter. Blocks until the node confirms.
    pub async fn open_filtered(
        &self,
        filter: LogFilter,
        cancel: &CancelToken,
    ) -> Result<Subscription, ConnectError> {
        let address = match filter.addresses.first() {
            Some(a) => *a,
            None => {
                return Err(ConnectError::Subscribe {
                    address: Address::ZERO,
                    reason: "filter names no contract address".to_string(),
                })
            }
        };

        let feed = self
            .transport
            .subscribe_filtered_logs(self.connection, filter, cancel.clone())
            .await?;

        info!("Log subscription active | address={:?}", address);
        Ok(Subscription::new(address, feed, cancel.clone()))
    }
}

/// A live log subscription. Not restartable.
pub struct Subscription {
    address: Address,
    feed: LogFeed,
    state: SubscriptionState,
    /// The one-shot error receiver has resolved (value or sender dropped)
    error_signal_done: bool,
    cancel: CancelToken,
    received: u64,
}

impl Subscription {
    pub fn new(address: Address, feed: LogFeed, cancel: CancelToken) -> Self {
        Self {
            address,
            feed,
            state: SubscriptionState::Active,
            error_signal_done: false,
            cancel,
            received: 0,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    /// Records handed out so far
    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Wait for the next record, transport failure, or cancellation.
    /// Once terminal, always returns Closed.
    pub async fn next_event(&mut self) -> SubscriptionEvent {
        loop {
            if self.state != SubscriptionState::Active {
                return SubscriptionEvent::Closed;
            }
            if self.cancel.is_cancelled() {
                self.close();
                return SubscriptionEvent::Closed;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.close();
                    return SubscriptionEvent::Closed;
                }
                signal = &mut self.feed.errors, if !self.error_signal_done => {
                    self.error_signal_done = true;
                    if let Ok(err) = signal {
                        return self.fail(err);
                    }
                    // Sender dropped without an error: keep draining records
                }
                maybe = self.feed.records.recv() => match maybe {
                    Some(record) => {
                        // Cancel may have been raised while we were parked
                        if self.cancel.is_cancelled() {
                            self.close();
                            return SubscriptionEvent::Closed;
                        }
                        self.received += 1;
                        return SubscriptionEvent::Record(record);
                    }
                    None => {
                        let err = self.take_pending_error().unwrap_or(TransportError::StreamEnded);
                        return self.fail(err);
                    }
                }
            }
        }
    }

    /// Lazy record sequence; yields the transport error once, then ends
    pub fn into_stream(self) -> impl Stream<Item = Result<RawLogRecord, TransportError>> {
        stream::unfold(self, |mut sub| async move {
            match sub.next_event().await {
                SubscriptionEvent::Record(record) => Some((Ok(record), sub)),
                SubscriptionEvent::Failed(err) => Some((Err(err), sub)),
                SubscriptionEvent::Closed => None,
            }
        })
    }

    fn take_pending_error(&mut self) -> Option<TransportError> {
        if self.error_signal_done {
            return None;
        }
        self.error_signal_done = true;
        self.feed.errors.try_recv().ok()
    }

    fn fail(&mut self, err: TransportError) -> SubscriptionEvent {
        warn!(
            "Log subscription erred | address={:?} | after {} records | {}",
            self.address, self.received, err
        );
        self.state = SubscriptionState::Erred;
        self.feed.records.close();
        SubscriptionEvent::Failed(err)
    }

    /// Stop accepting records and discard whatever is still buffered
    fn close(&mut self) {
        self.state = SubscriptionState::Closed;
        self.feed.records.close();
        let mut discarded = 0usize;
        while self.feed.records.try_recv().is_ok() {
            discarded += 1;
        }
        info!(
            "Log subscription closed | address={:?} | {} received, {} discarded",
            self.address, self.received, discarded
        );
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("address", &self.address)
            .field("state", &self.state)
            .field("received", &self.received)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.state == SubscriptionState::Active {
            debug!("Log subscription dropped while active | address={:?}", self.address);
        }
    }
}
