//! Event Pipeline
//!
//! Purpose:
//!     Pull records from a live Subscription, decode each against the target
//!     EventDescriptor, and hand results to the caller: decoded events to the
//!     consumer, decode failures to the error sink. A malformed log never
//!     stops the run.
//!
//! Created: 2026-10-18
//!
//! Termination:
//!     - Cancellation           → Ok(PipelineStats)
//!     - Transport error signal → Err(MonitorError::Transport), no retry here
//!
//! Entry point:
//!     start_monitoring() does the full setup (schema → event → dial →
//!     subscribe) and surfaces every setup failure before the first record.

use alloy::primitives::Address;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::cancel::CancelToken;
use crate::decoder::LogDecoder;
use crate::error::{MonitorError, NotFoundError, RecordError, Stage};
use crate::schema::{EventDescriptor, SchemaRegistry};
use crate::subscription::{
    LogFilter, LogTransport, Subscription, SubscriptionEvent, SubscriptionManager,
};
use crate::types::DecodedEvent;

/// How often the run loop reports progress (records)
const STATS_INTERVAL: u64 = 1000;

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub received: u64,
    pub decoded: u64,
    pub failed: u64,
}

impl PipelineStats {
    /// Fold another run's counters into this one
    pub fn merge(&mut self, other: PipelineStats) {
        self.received += other.received;
        self.decoded += other.decoded;
        self.failed += other.failed;
    }
}

/// Caller-side reconnect budget for `monitor_with_reconnect`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_reconnects: u32,
    pub delay: Duration,
}

/// Decodes one named event from a subscription
pub struct EventPipeline<'r> {
    descriptor: &'r EventDescriptor,
    decoder: LogDecoder,
}

impl<'r> EventPipeline<'r> {
    /// Resolve the target event once; unknown names fail here
    pub fn new(registry: &'r SchemaRegistry, event_name: &str) -> Result<Self, NotFoundError> {
        Ok(Self {
            descriptor: registry.resolve(event_name)?,
            decoder: LogDecoder::new(),
        })
    }

    pub fn descriptor(&self) -> &EventDescriptor {
        self.descriptor
    }

    /// Node filter for this pipeline: the pool address, narrowed to the
    /// event's topic 0 unless the event is anonymous
    pub fn filter_for(&self, pool: Address) -> LogFilter {
        let filter = LogFilter::for_address(pool);
        if self.descriptor.is_anonymous() {
            filter
        } else {
            filter.with_event_signature(self.descriptor.signature_hash())
        }
    }

    /// Run until cancellation or transport failure. Records are decoded one
    /// at a time in arrival order; consumer and sink are called inline.
    pub async fn run<C, E>(
        &self,
        subscription: &mut Subscription,
        mut consumer: C,
        mut error_sink: E,
    ) -> Result<PipelineStats, MonitorError>
    where
        C: FnMut(DecodedEvent),
        E: FnMut(RecordError),
    {
        let event_name = self.descriptor.name();
        let mut stats = PipelineStats::default();

        info!(
            "Pipeline running | event={} | pool={:?}",
            self.descriptor.signature(),
            subscription.address()
        );

        loop {
            match subscription.next_event().await {
                SubscriptionEvent::Record(record) => {
                    stats.received += 1;
                    match self.decoder.decode(&record, self.descriptor) {
                        Ok(event) => {
                            stats.decoded += 1;
                            consumer(event);
                        }
                        Err(source) => {
                            stats.failed += 1;
                            warn!(
                                "Decode failed | {} @ {} | {}",
                                event_name, record.provenance, source
                            );
                            error_sink(RecordError {
                                event: event_name.to_string(),
                                provenance: record.provenance,
                                source,
                            });
                        }
                    }

                    if stats.received % STATS_INTERVAL == 0 {
                        debug!(
                            "Pipeline stats | received={} decoded={} failed={}",
                            stats.received, stats.decoded, stats.failed
                        );
                    }
                }
                SubscriptionEvent::Failed(source) => {
                    error!(
                        "Pipeline stopped by transport error | pool={:?} | {} | received={} decoded={} failed={}",
                        subscription.address(),
                        source,
                        stats.received,
                        stats.decoded,
                        stats.failed
                    );
                    return Err(MonitorError::Transport {
                        pool: subscription.address(),
                        event: event_name.to_string(),
                        stats,
                        source,
                    });
                }
                SubscriptionEvent::Closed => {
                    info!(
                        "Pipeline stopped | received={} decoded={} failed={}",
                        stats.received, stats.decoded, stats.failed
                    );
                    return Ok(stats);
                }
            }
        }
    }
}

/// Monitor one pool for one event until `cancel` fires or the transport fails.
///
/// Setup failures (schema, unknown event, dial, subscribe) are returned
/// before the consumer is ever called. A transport failure during streaming
/// is returned as `MonitorError::Transport`; reconnecting is up to the caller.
#[allow(clippy::too_many_arguments)]
pub async fn start_monitoring<T, C, E>(
    transport: &T,
    endpoint: &str,
    pool: Address,
    schema_text: &str,
    event_name: &str,
    consumer: C,
    error_sink: E,
    cancel: &CancelToken,
) -> Result<PipelineStats, MonitorError>
where
    T: LogTransport,
    C: FnMut(DecodedEvent),
    E: FnMut(RecordError),
{
    let registry =
        SchemaRegistry::load(schema_text).map_err(|source| MonitorError::Schema { source })?;
    let pipeline = EventPipeline::new(&registry, event_name)
        .map_err(|source| MonitorError::NotFound { source })?;

    let connection = transport
        .dial(endpoint)
        .await
        .map_err(|source| MonitorError::Connect {
            stage: Stage::Dial,
            pool,
            source,
        })?;

    let manager = SubscriptionManager::new(transport, &connection);
    let mut subscription = manager
        .open_filtered(pipeline.filter_for(pool), cancel)
        .await
        .map_err(|source| MonitorError::Connect {
            stage: Stage::Subscribe,
            pool,
            source,
        })?;

    pipeline.run(&mut subscription, consumer, error_sink).await
}

/// Run `start_monitoring` in a loop, reopening after transport failures.
///
/// Schema and event-name errors, and a dial/subscribe failure before the
/// first session, are returned at once. After a session has run, failed
/// re-dials count against the same budget as dropped subscriptions.
/// Counters from every session are summed, including failed ones.
#[allow(clippy::too_many_arguments)]
pub async fn monitor_with_reconnect<T, C, E>(
    transport: &T,
    endpoint: &str,
    pool: Address,
    schema_text: &str,
    event_name: &str,
    mut consumer: C,
    mut error_sink: E,
    cancel: &CancelToken,
    policy: ReconnectPolicy,
) -> Result<PipelineStats, MonitorError>
where
    T: LogTransport,
    C: FnMut(DecodedEvent),
    E: FnMut(RecordError),
{
    let mut total = PipelineStats::default();
    let mut reconnects = 0u32;
    let mut session_established = false;

    loop {
        let result = start_monitoring(
            transport,
            endpoint,
            pool,
            schema_text,
            event_name,
            &mut consumer,
            &mut error_sink,
            cancel,
        )
        .await;

        let err = match result {
            Ok(stats) => {
                total.merge(stats);
                return Ok(total);
            }
            Err(err) => err,
        };

        if let Some(stats) = err.partial_stats() {
            total.merge(stats);
            session_established = true;
        }
        if cancel.is_cancelled() {
            return Ok(total);
        }
        if !err.is_retryable(session_established) {
            return Err(err);
        }

        reconnects += 1;
        if reconnects > policy.max_reconnects {
            error!(
                "{} reconnects exhausted - giving up: {} | received={} decoded={} failed={}",
                policy.max_reconnects, err, total.received, total.decoded, total.failed
            );
            return Err(err);
        }
        warn!(
            "Subscription lost (reconnect {}/{}): {} - retrying in {}ms...",
            reconnects,
            policy.max_reconnects,
            err,
            policy.delay.as_millis()
        );
        tokio::select! {
            _ = cancel.cancelled() => return Ok(total),
            _ = tokio::time::sleep(policy.delay) => {}
        }
    }
}
