//! Prometheus recorder for ingest and delivery metrics.

use prometheus::{Counter, Histogram, HistogramOpts, Registry};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: prometheus::Registry,
    pub ingested_events: prometheus::Counter,
    pub dropped_events: prometheus::Counter,
    pub evicted_events: prometheus::Counter,
    pub publish_latency: prometheus::Histogram,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        let registry = Registry::new();
        let ingested_events =
            Counter::new("sparhund_events_total", "Total accepted connection events").unwrap();
        let dropped_events = Counter::new(
            "sparhund_dropped_events_total",
            "Connection events dropped at the ingest boundary",
        )
        .unwrap();
        let evicted_events = Counter::new(
            "sparhund_evicted_events_total",
            "Connection events evicted from the bounded history",
        )
        .unwrap();

        let publish_latency = Histogram::with_opts(
            HistogramOpts::new(
                "sparhund_publish_latency_ns",
                "Snapshot build and fan-out time",
            )
            .buckets(vec![10_000.0, 100_000.0, 1_000_000.0, 10_000_000.0]),
        )
        .unwrap();

        registry.register(Box::new(ingested_events.clone())).unwrap();
        registry.register(Box::new(dropped_events.clone())).unwrap();
        registry.register(Box::new(evicted_events.clone())).unwrap();
        registry.register(Box::new(publish_latency.clone())).unwrap();

        Self {
            registry,
            ingested_events,
            dropped_events,
            evicted_events,
            publish_latency,
        }
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap())
    }

    pub fn inc_ingested(&self) {
        self.ingested_events.inc();
    }

    pub fn inc_dropped(&self) {
        self.dropped_events.inc();
    }

    pub fn inc_evicted(&self) {
        self.evicted_events.inc();
    }
}
