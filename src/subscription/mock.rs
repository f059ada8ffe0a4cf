//! Scripted in-process transport for tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

use super::transport::{LogFeed, LogFeedSender, LogFilter, LogTransport};
use crate::cancel::CancelToken;
use crate::error::{ConnectError, TransportError};
use crate::types::RawLogRecord;

/// One scripted action of the fake node
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Record(RawLogRecord),
    Error(TransportError),
    Pause(Duration),
    /// Stop scripting; keep the feed open until cancel or drop
    Hold,
    /// Drop both senders without an error signal
    End,
    /// Send copies of the record until the feed closes or cancel fires
    Flood(RawLogRecord),
}

pub(crate) struct MockTransport {
    script: Mutex<Option<Vec<Step>>>,
    fail_dial: bool,
    fail_subscribe: bool,
    capacity: usize,
    dial_calls: AtomicUsize,
    subscribe_calls: AtomicUsize,
    last_filter: Mutex<Option<LogFilter>>,
    delivered: Arc<watch::Sender<usize>>,
    released: Arc<watch::Sender<bool>>,
}

impl MockTransport {
    pub(crate) const CAPACITY: usize = 64;

    pub(crate) fn new(script: Vec<Step>) -> Self {
        Self {
            script: Mutex::new(Some(script)),
            fail_dial: false,
            fail_subscribe: false,
            capacity: Self::CAPACITY,
            dial_calls: AtomicUsize::new(0),
            subscribe_calls: AtomicUsize::new(0),
            last_filter: Mutex::new(None),
            delivered: Arc::new(watch::channel(0).0),
            released: Arc::new(watch::channel(false).0),
        }
    }

    pub(crate) fn failing_dial() -> Self {
        Self {
            fail_dial: true,
            ..Self::new(vec![])
        }
    }

    pub(crate) fn failing_subscribe() -> Self {
        Self {
            fail_subscribe: true,
            ..Self::new(vec![])
        }
    }

    pub(crate) fn dial_calls(&self) -> usize {
        self.dial_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_filter(&self) -> Option<LogFilter> {
        self.last_filter.lock().unwrap().clone()
    }

    /// Wait until `n` records have been pushed into the feed
    pub(crate) async fn wait_delivered(&self, n: usize) {
        let mut rx = self.delivered.subscribe();
        let _ = rx.wait_for(|count| *count >= n).await;
    }

    /// Wait until the fake node subscription has been torn down
    pub(crate) async fn wait_released(&self) {
        let mut rx = self.released.subscribe();
        let _ = rx.wait_for(|released| *released).await;
    }
}

#[async_trait]
impl LogTransport for MockTransport {
    type Connection = ();

    async fn dial(&self, endpoint: &str) -> Result<(), ConnectError> {
        self.dial_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_dial {
            return Err(ConnectError::Dial {
                endpoint: endpoint.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    async fn subscribe_filtered_logs(
        &self,
        _connection: &(),
        filter: LogFilter,
        cancel: CancelToken,
    ) -> Result<LogFeed, ConnectError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let address = filter.addresses.first().copied().unwrap_or_default();
        *self.last_filter.lock().unwrap() = Some(filter);

        if self.fail_subscribe {
            return Err(ConnectError::Subscribe {
                address,
                reason: "filter rejected".to_string(),
            });
        }
        let script = self
            .script
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ConnectError::Subscribe {
                address,
                reason: "script already consumed".to_string(),
            })?;

        let (sender, feed) = LogFeed::channel(self.capacity);
        tokio::spawn(run_script(
            script,
            sender,
            cancel,
            Arc::clone(&self.delivered),
            Arc::clone(&self.released),
        ));
        Ok(feed)
    }
}

async fn run_script(
    script: Vec<Step>,
    sender: LogFeedSender,
    cancel: CancelToken,
    delivered: Arc<watch::Sender<usize>>,
    released: Arc<watch::Sender<bool>>,
) {
    let LogFeedSender { records, errors } = sender;
    let mut errors = Some(errors);
    let mut ended = false;

    'script: for step in script {
        match step {
            Step::Record(record) => {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    sent = records.send(record) => {
                        if sent.is_err() {
                            break;
                        }
                        delivered.send_modify(|n| *n += 1);
                    }
                }
            }
            Step::Error(err) => {
                if let Some(tx) = errors.take() {
                    let _ = tx.send(err);
                }
            }
            Step::Pause(duration) => {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(duration) => {}
                }
            }
            Step::Flood(record) => loop {
                tokio::select! {
                    _ = cancel.cancelled() => break 'script,
                    sent = records.send(record.clone()) => {
                        if sent.is_err() {
                            break 'script;
                        }
                        delivered.send_modify(|n| *n += 1);
                    }
                }
            },
            Step::Hold => break,
            Step::End => {
                ended = true;
                break;
            }
        }
    }

    if !ended {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = records.closed() => {}
        }
    }
    drop(records);
    drop(errors);
    released.send_replace(true);
}
