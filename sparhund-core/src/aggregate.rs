//! Per-address running totals, maintained incrementally at ingest time.
//!
//! Records are all-time: they survive FIFO eviction from the history and
//! are only reset by an explicit clear. A secondary index keyed by owning
//! application backs the per-app address breakdown.
//!
//! Invariant: for every record, `blocked + allowed == total`.

use std::collections::HashMap;

use serde::Serialize;

use crate::events::{ConnectionEvent, Decision};

/// Running totals for one remote address.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AggregateRecord {
    pub address: String,
    pub total: u64,
    pub blocked: u64,
    pub allowed: u64,
    pub first_seen: i64,
    pub last_seen: i64,
    #[serde(skip)]
    created_seq: u64,
}

impl AggregateRecord {
    fn new(address: &str, timestamp: i64, created_seq: u64) -> Self {
        Self {
            address: address.to_string(),
            total: 0,
            blocked: 0,
            allowed: 0,
            first_seen: timestamp,
            last_seen: timestamp,
            created_seq,
        }
    }

    fn apply(&mut self, event: &ConnectionEvent) {
        self.total += 1;
        match event.decision {
            Decision::Block => self.blocked += 1,
            Decision::Allow => self.allowed += 1,
        }
        // Assigned, not max-ed: last_seen stays monotonic with arrival
        // order even if a producer clock regresses.
        self.last_seen = event.timestamp;
    }
}

#[derive(Default)]
pub struct AggregationIndex {
    by_address: HashMap<String, AggregateRecord>,
    by_app: HashMap<String, HashMap<String, AggregateRecord>>,
    next_seq: u64,
}

impl AggregationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one accepted event into the primary index and, when the
    /// event is attributed, into the owning application's index.
    pub fn upsert(&mut self, event: &ConnectionEvent) {
        upsert_into(&mut self.by_address, &mut self.next_seq, event);
        if !event.app.is_empty() {
            let per_app = self.by_app.entry(event.app.clone()).or_default();
            upsert_into(per_app, &mut self.next_seq, event);
        }
    }

    pub fn get(&self, address: &str) -> Option<&AggregateRecord> {
        self.by_address.get(address)
    }

    /// All records, last-seen descending, ties broken by creation order.
    pub fn all(&self) -> Vec<AggregateRecord> {
        sorted(self.by_address.values())
    }

    /// Records for the addresses one application contacted, same ordering
    /// rule as [`all`](Self::all). Empty for unknown applications.
    pub fn for_app(&self, app: &str) -> Vec<AggregateRecord> {
        self.by_app.get(app).map(|m| sorted(m.values())).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_address.clear();
        self.by_app.clear();
    }
}

fn upsert_into(
    index: &mut HashMap<String, AggregateRecord>,
    next_seq: &mut u64,
    event: &ConnectionEvent,
) {
    let record = index.entry(event.address.clone()).or_insert_with(|| {
        let record = AggregateRecord::new(&event.address, event.timestamp, *next_seq);
        *next_seq += 1;
        record
    });
    record.apply(event);
}

fn sorted<'a>(records: impl Iterator<Item = &'a AggregateRecord>) -> Vec<AggregateRecord> {
    let mut out: Vec<AggregateRecord> = records.cloned().collect();
    out.sort_by(|a, b| {
        b.last_seen
            .cmp(&a.last_seen)
            .then(a.created_seq.cmp(&b.created_seq))
    });
    out
}
