//! Tracker runtime - coordinates ingest draining and snapshot delivery.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use opentelemetry::KeyValue;
use tracing::{debug, info, instrument, trace, warn};

use sparhund_config::SparhundConfig;
use sparhund_core::events::ConnectionEvent;
use sparhund_core::snapshot::{Subscription, SubscriptionId};
use sparhund_core::tracker::{ConnectionTracker, TrackerOptions};
use sparhund_telemetry::{EventLogger, MetricsRecorder};

use crate::engine::event_processing::{DefaultEventProcessor, EventProcessor};
use crate::engine::EngineError;

/// How long the blocking loops wait per poll before re-checking the
/// shutdown flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Producer-side handle given to the data-path collaborator. Cheap to
/// clone; one per producer thread is fine.
#[derive(Clone)]
pub struct IngestSender {
    tx: Sender<ConnectionEvent>,
    drop_when_full: bool,
}

impl IngestSender {
    /// Hands one decision event to the tracker. With the `drop` strategy a
    /// full channel sheds the event instead of applying backpressure.
    pub fn submit(&self, event: ConnectionEvent) -> Result<(), EngineError> {
        if self.drop_when_full {
            match self.tx.try_send(event) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(event)) => {
                    warn!(address = %event.address, "ingest channel full, shedding event");
                    Ok(())
                }
                Err(TrySendError::Disconnected(_)) => Err(EngineError::ChannelClosed),
            }
        } else {
            self.tx.send(event).map_err(|_| EngineError::ChannelClosed)
        }
    }
}

/// Coordinates the tracker core: drains the collaborator channel into the
/// tracker and fans coalesced snapshots out to subscribers.
pub struct TrackerRuntime {
    /// System configuration parameters
    config: Arc<SparhundConfig>,
    /// The single tracker instance shared with all consumers
    tracker: Arc<ConnectionTracker>,
    /// Metrics collection subsystem
    pub metrics: Arc<MetricsRecorder>,
    processor: Arc<dyn EventProcessor + Send + Sync>,
    ingest_tx: Sender<ConnectionEvent>,
    ingest_rx: Receiver<ConnectionEvent>,
    shutdown: Arc<AtomicBool>,
}

impl TrackerRuntime {
    /// Creates a runtime with the default processor (append + metrics).
    pub fn new(config: SparhundConfig) -> Self {
        info!("Initializing tracker runtime");
        debug!("Tracker config: {:?}", config.tracker);

        let tracker = Arc::new(ConnectionTracker::new(TrackerOptions {
            history_capacity: config.tracker.history_capacity,
            initial_snapshot: config.delivery.initial_snapshot,
        }));
        let metrics = Arc::new(MetricsRecorder::new());
        let processor = Arc::new(DefaultEventProcessor::new(tracker.clone(), metrics.clone()));
        Self::assemble(config, tracker, metrics, processor)
    }

    /// Creates a runtime with a caller-supplied processor seam.
    pub fn with_processor(
        config: SparhundConfig,
        processor: Arc<dyn EventProcessor + Send + Sync>,
    ) -> Self {
        let tracker = Arc::new(ConnectionTracker::new(TrackerOptions {
            history_capacity: config.tracker.history_capacity,
            initial_snapshot: config.delivery.initial_snapshot,
        }));
        let metrics = Arc::new(MetricsRecorder::new());
        Self::assemble(config, tracker, metrics, processor)
    }

    fn assemble(
        config: SparhundConfig,
        tracker: Arc<ConnectionTracker>,
        metrics: Arc<MetricsRecorder>,
        processor: Arc<dyn EventProcessor + Send + Sync>,
    ) -> Self {
        let (ingest_tx, ingest_rx) = bounded(config.ingest.channel_capacity);
        Self {
            config: Arc::new(config),
            tracker,
            metrics,
            processor,
            ingest_tx,
            ingest_rx,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The shared tracker instance, for consumers issuing reads directly.
    pub fn handle(&self) -> Arc<ConnectionTracker> {
        self.tracker.clone()
    }

    /// A producer handle for the data-path collaborator.
    pub fn sender(&self) -> IngestSender {
        IngestSender {
            tx: self.ingest_tx.clone(),
            drop_when_full: self.config.ingest.full_queue_strategy == "drop",
        }
    }

    pub fn subscribe(&self) -> Subscription {
        self.tracker.subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.tracker.unsubscribe(id);
    }

    /// Stops the drain and delivery loops. Safe to call more than once.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Runs the drain and delivery loops until [`shutdown`](Self::shutdown).
    ///
    /// Both loops block on channel receives, so each runs on its own
    /// blocking thread rather than an executor worker.
    #[instrument(skip_all)]
    pub async fn run(self: Arc<Self>) -> Result<(), EngineError> {
        info!("Starting tracker runtime");
        EventLogger::log_event(
            "runtime_start",
            vec![
                KeyValue::new(
                    "history_capacity",
                    self.config.tracker.history_capacity as i64,
                ),
                KeyValue::new(
                    "coalesce_window_ms",
                    self.config.delivery.coalesce_window_ms as i64,
                ),
            ],
        )
        .await;

        let drain_task = tokio::task::spawn_blocking({
            let this = self.clone();
            move || this.drain_loop()
        });
        let delivery_task = tokio::task::spawn_blocking({
            let this = self.clone();
            move || this.delivery_loop()
        });

        let (drain_result, delivery_result) = tokio::join!(drain_task, delivery_task);
        drain_result?;
        delivery_result?;

        info!("Tracker runtime shutdown complete");
        Ok(())
    }

    /// Pulls events off the collaborator channel into the processor.
    /// Runs until shutdown; a timeout only re-checks the flag.
    fn drain_loop(&self) {
        info!("Ingest drain loop started");
        let mut processed = 0u64;

        loop {
            match self.ingest_rx.recv_timeout(POLL_INTERVAL) {
                Ok(event) => {
                    processed += 1;
                    trace!(address = %event.address, "draining event #{processed}");
                    self.processor.process(event);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }
        }
        debug!(processed, "ingest drain loop stopped");
    }

    /// Waits for change signals, coalesces bursts over the configured
    /// window, and fans the rebuilt snapshot out to subscribers.
    fn delivery_loop(&self) {
        info!("Snapshot delivery loop started");
        let publisher = self.tracker.publisher();
        let window = Duration::from_millis(self.config.delivery.coalesce_window_ms);

        loop {
            if publisher.wait_for_change(POLL_INTERVAL) {
                if !window.is_zero() {
                    std::thread::sleep(window);
                    publisher.absorb_pending_change();
                }
                self.publish_once();
            }
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }
        }

        // Flush whatever arrived after the last fan-out so subscribers
        // hold final state.
        publisher.absorb_pending_change();
        self.publish_once();
        debug!("snapshot delivery loop stopped");
    }

    fn publish_once(&self) {
        let started = Instant::now();
        let delivered = self.tracker.publish_current();
        self.metrics
            .publish_latency
            .observe(started.elapsed().as_nanos() as f64);
        trace!(delivered, "snapshot fan-out");
    }
}
