//! The tracker facade: bounded history, aggregation, search, snapshots.
//!
//! One `ConnectionTracker` instance is constructed by the composition
//! root and shared by `Arc` with the data-path collaborator (writes) and
//! any number of consumers (reads). There is no ambient global instance.
//!
//! All mutable state sits behind a single coarse lock held only for the
//! in-memory update, never across a consumer-visible call. Reads operate
//! on version-cached immutable snapshots, so back-to-back reads without
//! intervening writes share one allocation and producers are never
//! stalled by consumers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::aggregate::{AggregateRecord, AggregationIndex};
use crate::events::ConnectionEvent;
use crate::filter::{DecisionFilter, SearchResults, SearchScope};
use crate::history::BoundedHistory;
use crate::snapshot::{SnapshotPublisher, Subscription, SubscriptionId, TrackerSnapshot};

/// Construction parameters. `history_capacity` bounds the event buffer;
/// `initial_snapshot` seeds new subscriptions with current state when the
/// history is non-empty.
#[derive(Clone, Copy, Debug)]
pub struct TrackerOptions {
    pub history_capacity: usize,
    pub initial_snapshot: bool,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            history_capacity: 8192,
            initial_snapshot: true,
        }
    }
}

/// Why an event was refused at the ingest boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    EmptyAddress,
    NonPositiveTimestamp,
}

/// Result of one `append` call. Rejection is a local data-quality
/// outcome, not an error; ingestion stays live.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    Accepted { evicted: bool },
    Dropped(DropReason),
}

/// Lifetime ingest counters. Monotonic for the life of the process;
/// `clear` does not reset them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TrackerStats {
    pub accepted: u64,
    pub dropped: u64,
    pub evicted: u64,
}

struct TrackerState {
    history: BoundedHistory,
    aggregates: AggregationIndex,
    version: u64,
    cached: Option<Arc<TrackerSnapshot>>,
}

pub struct ConnectionTracker {
    state: Mutex<TrackerState>,
    accepted: AtomicU64,
    dropped: AtomicU64,
    evicted: AtomicU64,
    publisher: SnapshotPublisher,
    initial_snapshot: bool,
}

impl ConnectionTracker {
    pub fn new(options: TrackerOptions) -> Self {
        debug!(
            capacity = options.history_capacity,
            "initializing connection tracker"
        );
        Self {
            state: Mutex::new(TrackerState {
                history: BoundedHistory::new(options.history_capacity),
                aggregates: AggregationIndex::new(),
                version: 0,
                cached: None,
            }),
            accepted: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
            publisher: SnapshotPublisher::new(),
            initial_snapshot: options.initial_snapshot,
        }
    }

    pub fn with_capacity(history_capacity: usize) -> Self {
        Self::new(TrackerOptions {
            history_capacity,
            ..TrackerOptions::default()
        })
    }

    /// Records one connection decision.
    ///
    /// Malformed events (empty address, non-positive timestamp) are
    /// dropped, logged, and counted. Accepted events enter the history
    /// (evicting the oldest entry when full), update the aggregates, and
    /// signal the publisher. Safe to call from any number of threads; the
    /// critical section covers only the in-memory update.
    pub fn append(&self, event: ConnectionEvent) -> IngestOutcome {
        if event.address.is_empty() {
            warn!(timestamp = event.timestamp, "dropping event without remote address");
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return IngestOutcome::Dropped(DropReason::EmptyAddress);
        }
        if event.timestamp <= 0 {
            warn!(
                address = %event.address,
                timestamp = event.timestamp,
                "dropping event with non-positive timestamp"
            );
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return IngestOutcome::Dropped(DropReason::NonPositiveTimestamp);
        }

        let evicted = {
            let mut state = self.state.lock();
            state.aggregates.upsert(&event);
            let evicted = state.history.push(event).is_some();
            state.version += 1;
            state.cached = None;
            evicted
        };

        self.accepted.fetch_add(1, Ordering::Relaxed);
        if evicted {
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        self.publisher.notify();
        IngestOutcome::Accepted { evicted }
    }

    /// Current immutable view. Cached per version: repeated calls without
    /// intervening writes return the same `Arc`.
    pub fn snapshot(&self) -> Arc<TrackerSnapshot> {
        let mut state = self.state.lock();
        if let Some(cached) = &state.cached {
            return cached.clone();
        }
        let snapshot = Arc::new(TrackerSnapshot {
            version: state.version,
            events: state.history.to_vec(),
            aggregates: state.aggregates.all(),
        });
        state.cached = Some(snapshot.clone());
        snapshot
    }

    /// Most-recent-first history tail, capped at `limit` when given.
    pub fn recent_events(&self, limit: Option<usize>) -> Vec<ConnectionEvent> {
        let state = self.state.lock();
        let take = limit.unwrap_or(usize::MAX);
        state.history.iter().rev().take(take).cloned().collect()
    }

    /// All per-address records, last-seen descending.
    pub fn aggregates(&self) -> Vec<AggregateRecord> {
        self.state.lock().aggregates.all()
    }

    pub fn aggregate(&self, address: &str) -> Option<AggregateRecord> {
        self.state.lock().aggregates.get(address).cloned()
    }

    /// Per-address records for one application, last-seen descending.
    pub fn app_breakdown(&self, app: &str) -> Vec<AggregateRecord> {
        self.state.lock().aggregates.for_app(app)
    }

    /// Substring search over the current snapshot.
    pub fn search(&self, query: &str, scope: SearchScope) -> SearchResults {
        self.search_filtered(query, scope, DecisionFilter::Any)
    }

    /// Search additionally narrowed by decision.
    pub fn search_filtered(
        &self,
        query: &str,
        scope: SearchScope,
        decision: DecisionFilter,
    ) -> SearchResults {
        SearchResults::new(self.snapshot(), query, scope, decision)
    }

    /// Registers a consumer for snapshot deliveries. When configured and
    /// history is non-empty, the mailbox is seeded with current state.
    pub fn subscribe(&self) -> Subscription {
        let initial = if self.initial_snapshot {
            let snapshot = self.snapshot();
            (!snapshot.events.is_empty()).then_some(snapshot)
        } else {
            None
        };
        self.publisher.subscribe(initial)
    }

    /// Idempotent; safe from any thread.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.publisher.unsubscribe(id);
    }

    /// Builds the current snapshot and fans it out to every subscriber.
    /// Returns the fan-out size. Called by the delivery loop, or directly
    /// in tests.
    pub fn publish_current(&self) -> usize {
        self.publisher.publish(self.snapshot())
    }

    pub fn publisher(&self) -> &SnapshotPublisher {
        &self.publisher
    }

    /// Empties history and aggregates. Subscribers observe the reset as a
    /// new (empty) snapshot version; lifetime counters are untouched.
    pub fn clear(&self) {
        {
            let mut state = self.state.lock();
            state.history.clear();
            state.aggregates.clear();
            state.version += 1;
            state.cached = None;
        }
        self.publisher.notify();
    }

    pub fn stats(&self) -> TrackerStats {
        TrackerStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }

    pub fn event_count(&self) -> usize {
        self.state.lock().history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Decision;
    use std::time::Duration;

    fn blocked(address: &str, ts: i64) -> ConnectionEvent {
        ConnectionEvent::new(address, Decision::Block, ts)
    }

    fn allowed(address: &str, ts: i64) -> ConnectionEvent {
        ConnectionEvent::new(address, Decision::Allow, ts)
    }

    #[test]
    fn eviction_drops_history_but_not_aggregates() {
        let tracker = ConnectionTracker::with_capacity(2);
        tracker.append(blocked("10.0.0.1", 1));
        tracker.append(allowed("10.0.0.2", 2));
        let outcome = tracker.append(blocked("10.0.0.3", 3));
        assert_eq!(outcome, IngestOutcome::Accepted { evicted: true });

        let snapshot = tracker.snapshot();
        let history: Vec<_> = snapshot
            .events
            .iter()
            .map(|e| (e.address.as_str(), e.decision))
            .collect();
        assert_eq!(
            history,
            vec![("10.0.0.2", Decision::Allow), ("10.0.0.3", Decision::Block)]
        );

        // All-time totals survive eviction.
        let gone = tracker.aggregate("10.0.0.1").unwrap();
        assert_eq!(gone.total, 1);
        assert_eq!(gone.blocked, 1);
    }

    #[test]
    fn aggregate_splits_decisions_per_address() {
        let tracker = ConnectionTracker::with_capacity(16);
        tracker.append(blocked("1.1.1.1", 1));
        tracker.append(allowed("1.1.1.1", 2));

        let record = tracker.aggregate("1.1.1.1").unwrap();
        assert_eq!(record.total, 2);
        assert_eq!(record.blocked, 1);
        assert_eq!(record.allowed, 1);
    }

    #[test]
    fn search_matches_substring_only() {
        let tracker = ConnectionTracker::with_capacity(16);
        tracker.append(blocked("1.1.1.1", 1));
        tracker.append(allowed("2.2.2.2", 2));

        let results = tracker.search("1.1.1", SearchScope::Address);
        let hits = results.collect_events();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].address, "1.1.1.1");
    }

    #[test]
    fn empty_query_is_full_history_in_order() {
        let tracker = ConnectionTracker::with_capacity(16);
        for i in 1..=5 {
            tracker.append(allowed(&format!("10.0.0.{i}"), i));
        }
        let results = tracker.search("", SearchScope::Any);
        let addresses: Vec<_> = results.iter().map(|e| e.address.clone()).collect();
        assert_eq!(
            addresses,
            vec!["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4", "10.0.0.5"]
        );
    }

    #[test]
    fn repeated_search_over_unchanged_state_shares_a_snapshot() {
        let tracker = ConnectionTracker::with_capacity(16);
        tracker.append(blocked("1.1.1.1", 1));

        let first = tracker.search("1", SearchScope::Address);
        let second = tracker.search("1", SearchScope::Address);
        assert_eq!(first.snapshot_version(), second.snapshot_version());
        assert_eq!(first.collect_events(), second.collect_events());

        tracker.append(blocked("1.1.1.2", 2));
        let third = tracker.search("1", SearchScope::Address);
        assert_ne!(first.snapshot_version(), third.snapshot_version());
        // The older result set still answers from its pinned snapshot.
        assert_eq!(first.count(), 1);
        assert_eq!(third.count(), 2);
    }

    #[test]
    fn malformed_events_never_enter_state() {
        let tracker = ConnectionTracker::with_capacity(16);
        assert_eq!(
            tracker.append(ConnectionEvent::new("", Decision::Block, 5)),
            IngestOutcome::Dropped(DropReason::EmptyAddress)
        );
        assert_eq!(
            tracker.append(ConnectionEvent::new("1.1.1.1", Decision::Block, 0)),
            IngestOutcome::Dropped(DropReason::NonPositiveTimestamp)
        );
        assert_eq!(
            tracker.append(ConnectionEvent::new("1.1.1.1", Decision::Block, -3)),
            IngestOutcome::Dropped(DropReason::NonPositiveTimestamp)
        );

        assert_eq!(tracker.event_count(), 0);
        assert!(tracker.aggregates().is_empty());
        let stats = tracker.stats();
        assert_eq!(stats.dropped, 3);
        assert_eq!(stats.accepted, 0);
    }

    #[test]
    fn recent_events_are_most_recent_first() {
        let tracker = ConnectionTracker::with_capacity(16);
        for i in 1..=4 {
            tracker.append(allowed(&format!("10.0.0.{i}"), i));
        }
        let recent = tracker.recent_events(Some(2));
        let addresses: Vec<_> = recent.iter().map(|e| e.address.as_str()).collect();
        assert_eq!(addresses, vec!["10.0.0.4", "10.0.0.3"]);

        assert_eq!(tracker.recent_events(None).len(), 4);
    }

    #[test]
    fn app_breakdown_reports_per_app_addresses() {
        let tracker = ConnectionTracker::with_capacity(16);
        tracker.append(blocked("1.1.1.1", 1).with_app("app.one"));
        tracker.append(allowed("2.2.2.2", 2).with_app("app.one"));
        tracker.append(allowed("3.3.3.3", 3).with_app("app.two"));

        let breakdown = tracker.app_breakdown("app.one");
        let addresses: Vec<_> = breakdown.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(addresses, vec!["2.2.2.2", "1.1.1.1"]);
    }

    #[test]
    fn concurrent_producers_lose_no_updates() {
        const THREADS: usize = 4;
        const PER_THREAD: usize = 250;

        let tracker = ConnectionTracker::with_capacity(THREADS * PER_THREAD);
        std::thread::scope(|scope| {
            for t in 0..THREADS {
                let tracker = &tracker;
                scope.spawn(move || {
                    for i in 0..PER_THREAD {
                        let decision = if i % 2 == 0 {
                            Decision::Block
                        } else {
                            Decision::Allow
                        };
                        tracker.append(ConnectionEvent::new(
                            format!("10.0.{t}.{}", i % 7),
                            decision,
                            (t * PER_THREAD + i + 1) as i64,
                        ));
                    }
                });
            }
        });

        let total: u64 = tracker.aggregates().iter().map(|r| r.total).sum();
        assert_eq!(total, (THREADS * PER_THREAD) as u64);
        assert_eq!(tracker.event_count(), THREADS * PER_THREAD);
        assert_eq!(tracker.stats().accepted, (THREADS * PER_THREAD) as u64);
        for record in tracker.aggregates() {
            assert_eq!(record.blocked + record.allowed, record.total);
        }
    }

    #[test]
    fn subscribers_receive_published_snapshots() {
        let tracker = ConnectionTracker::with_capacity(16);
        let sub = tracker.subscribe();

        tracker.append(blocked("1.1.1.1", 1));
        assert_eq!(tracker.publish_current(), 1);

        let snapshot = sub.latest_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(snapshot.events.len(), 1);
        assert_eq!(snapshot.aggregates.len(), 1);
    }

    #[test]
    fn unsubscribe_stops_deliveries_resubscribe_is_fresh() {
        let tracker = ConnectionTracker::with_capacity(16);
        let first = tracker.subscribe();
        tracker.unsubscribe(first.id());
        tracker.unsubscribe(first.id());

        tracker.append(blocked("1.1.1.1", 1));
        tracker.publish_current();
        assert!(first.try_latest().is_none());

        let second = tracker.subscribe();
        // Seeded immediately: history already has content.
        let seeded = second.try_latest().unwrap();
        assert_eq!(seeded.events.len(), 1);
    }

    #[test]
    fn initial_snapshot_can_be_disabled() {
        let tracker = ConnectionTracker::new(TrackerOptions {
            history_capacity: 16,
            initial_snapshot: false,
        });
        tracker.append(blocked("1.1.1.1", 1));
        let sub = tracker.subscribe();
        assert!(sub.try_latest().is_none());
    }

    #[test]
    fn clear_resets_state_but_not_lifetime_counters() {
        let tracker = ConnectionTracker::with_capacity(16);
        tracker.append(blocked("1.1.1.1", 1));
        tracker.append(ConnectionEvent::new("", Decision::Allow, 1));

        tracker.publisher().absorb_pending_change();
        tracker.clear();
        assert_eq!(tracker.event_count(), 0);
        assert!(tracker.aggregates().is_empty());

        let stats = tracker.stats();
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.dropped, 1);

        // The reset is itself a change worth delivering.
        assert!(tracker.publisher().wait_for_change(Duration::from_millis(10)));
    }
}
