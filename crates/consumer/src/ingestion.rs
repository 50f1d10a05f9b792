//! Background loop feeding deliveries to the order-confirmed handler.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::delivery::decode_order_confirmed;
use crate::trace::consumer_span;
use crate::{Delivery, DeliverySource, OrderConfirmedHandler, Result};

/// Counters for one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionStats {
    /// Deliveries pulled from the source.
    pub received: u64,
    /// Deliveries decoded and passed to the handler.
    pub handled: u64,
    /// Deliveries dropped because the body did not decode.
    pub decode_failures: u64,
    /// Transport errors reported by the source.
    pub transport_errors: u64,
}

/// Pulls deliveries one at a time and hands decoded events to a handler.
///
/// Events are handled strictly in delivery order; the next delivery is not
/// pulled until the handler returns. Malformed bodies are logged and
/// dropped. Nothing is retried.
pub struct IngestionLoop<S, H> {
    source: S,
    handler: H,
    destination: String,
}

impl<S, H> IngestionLoop<S, H>
where
    S: DeliverySource + 'static,
    H: OrderConfirmedHandler + 'static,
{
    /// Creates a loop. `destination` names the exchange in spans and logs.
    pub fn new(source: S, handler: H, destination: impl Into<String>) -> Self {
        Self {
            source,
            handler,
            destination: destination.into(),
        }
    }

    /// Runs the loop on a background task and returns its handle.
    pub fn spawn(self) -> IngestionHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(self.run(shutdown_rx));
        IngestionHandle {
            shutdown: shutdown_tx,
            join,
        }
    }

    /// Runs until the source closes or `shutdown` flips to true (or its
    /// sender is dropped).
    ///
    /// Shutdown is only observed between deliveries, so an event already
    /// being handled always finishes.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> IngestionStats {
        let Self {
            mut source,
            handler,
            destination,
        } = self;
        let mut stats = IngestionStats::default();
        tracing::info!(%destination, "ingestion loop started");

        loop {
            if *shutdown.borrow_and_update() {
                tracing::info!("shutdown requested, stopping ingestion");
                break;
            }

            let next = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        tracing::info!("shutdown handle dropped, stopping ingestion");
                        break;
                    }
                    continue;
                }
                next = source.next_delivery() => next,
            };

            match next {
                None => {
                    tracing::info!("delivery source closed, stopping ingestion");
                    break;
                }
                Some(Err(e)) => {
                    stats.transport_errors += 1;
                    tracing::warn!(error = %e, "error receiving delivery");
                }
                Some(Ok(delivery)) => {
                    process(&handler, &destination, delivery, &mut stats).await
                }
            }
        }

        tracing::info!(
            received = stats.received,
            handled = stats.handled,
            decode_failures = stats.decode_failures,
            "ingestion loop stopped"
        );
        stats
    }
}

async fn process<H: OrderConfirmedHandler>(
    handler: &H,
    destination: &str,
    delivery: Delivery,
    stats: &mut IngestionStats,
) {
    stats.received += 1;
    metrics::counter!("consumer_messages_received_total").increment(1);

    let span = consumer_span(destination, &delivery.headers);

    async {
        tracing::debug!(
            body = %String::from_utf8_lossy(&delivery.body),
            "received order confirmed event"
        );

        match decode_order_confirmed(&delivery.body) {
            Ok(event) => {
                handler.handle(event).await;
                stats.handled += 1;
            }
            Err(e) => {
                stats.decode_failures += 1;
                metrics::counter!("consumer_decode_failures_total").increment(1);
                tracing::warn!(error = %e, "dropping malformed order confirmed event");
            }
        }
    }
    .instrument(span)
    .await
}

/// Owner of a spawned [`IngestionLoop`].
///
/// Dropping the handle also stops the loop, at the next delivery boundary,
/// but nothing waits for it.
pub struct IngestionHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<IngestionStats>,
}

impl IngestionHandle {
    /// Returns true once the loop task has ended.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Asks the loop to stop and waits for it. The in-flight event, if any,
    /// is handled first; deliveries not yet pulled are left to the source.
    pub async fn shutdown(self) -> Result<IngestionStats> {
        // Err only if the loop already ended and dropped its receiver.
        let _ = self.shutdown.send(true);
        Ok(self.join.await?)
    }

    /// Waits for the loop to end on its own (source closed) without asking
    /// it to stop.
    pub async fn join(self) -> Result<IngestionStats> {
        let Self { shutdown, join } = self;
        let stats = join.await?;
        drop(shutdown);
        Ok(stats)
    }
}
