//! Live log subscription
//!
//! Architecture:
//!     transport.rs : LogTransport trait, LogFilter, LogFeed (records + error signal)
//!     ws.rs        : WsTransport: alloy WebSocket pubsub implementation
//!     manager.rs   : SubscriptionManager / Subscription state machine
//!
//! Usage:
//!     let connection = transport.dial(endpoint).await?;
//!     let manager = SubscriptionManager::new(&transport, &connection);
//!     let mut sub = manager.open(pool, &cancel).await?;
//!     while let SubscriptionEvent::Record(r) = sub.next_event().await { .. }

pub mod manager;
pub mod transport;
pub mod ws;

#[cfg(test)]
pub(crate) mod mock;

pub use manager::{Subscription, SubscriptionEvent, SubscriptionManager, SubscriptionState};
pub use transport::{LogFeed, LogFeedSender, LogFilter, LogTransport, DEFAULT_CHANNEL_CAPACITY};
pub use ws::WsTransport;
