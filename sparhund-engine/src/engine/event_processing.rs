//! The seam between the drained ingest channel and the tracker.

use std::sync::Arc;

use sparhund_core::events::ConnectionEvent;
use sparhund_core::tracker::{ConnectionTracker, IngestOutcome};
use sparhund_telemetry::MetricsRecorder;

/// Processes one drained connection event. The drain loop is
/// intentionally synchronous: ingest latency must not depend on an
/// executor's scheduling.
pub trait EventProcessor: Send + Sync {
    fn process(&self, event: ConnectionEvent);
}

/// Appends to the tracker and mirrors the outcome into metrics.
pub struct DefaultEventProcessor {
    tracker: Arc<ConnectionTracker>,
    metrics: Arc<MetricsRecorder>,
}

impl DefaultEventProcessor {
    pub fn new(tracker: Arc<ConnectionTracker>, metrics: Arc<MetricsRecorder>) -> Self {
        Self { tracker, metrics }
    }
}

impl EventProcessor for DefaultEventProcessor {
    fn process(&self, event: ConnectionEvent) {
        match self.tracker.append(event) {
            IngestOutcome::Accepted { evicted } => {
                self.metrics.inc_ingested();
                if evicted {
                    self.metrics.inc_evicted();
                }
            }
            IngestOutcome::Dropped(_) => self.metrics.inc_dropped(),
        }
    }
}
