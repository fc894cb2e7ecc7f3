//! Coalescing snapshot delivery to subscribers.
//!
//! Each subscriber owns a single-slot mailbox: posting replaces any
//! undelivered snapshot, so a slow consumer always wakes to the latest
//! state and never sees a backlog. Posting never blocks, which keeps the
//! ingest path free of consumer-side stalls. A stuck subscriber only ever
//! costs its own slot; other subscribers and ingestion are unaffected.
//!
//! Ingest signals pending work through a capacity-1 tick channel. A full
//! channel means a wakeup is already queued, so `notify` degrades to a
//! no-op under bursts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use serde::Serialize;

use crate::aggregate::AggregateRecord;
use crate::events::ConnectionEvent;

/// Immutable point-in-time view of tracker state.
///
/// `events` is the bounded history in insertion order (oldest first);
/// `aggregates` is every address record, last-seen descending.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackerSnapshot {
    pub version: u64,
    pub events: Vec<ConnectionEvent>,
    pub aggregates: Vec<AggregateRecord>,
}

/// Opaque subscription handle. Valid until unsubscribed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct MailboxSlot {
    pending: Option<Arc<TrackerSnapshot>>,
    closed: bool,
}

struct Mailbox {
    slot: Mutex<MailboxSlot>,
    available: Condvar,
}

impl Mailbox {
    fn new() -> Self {
        Self {
            slot: Mutex::new(MailboxSlot {
                pending: None,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    fn post(&self, snapshot: Arc<TrackerSnapshot>) {
        let mut slot = self.slot.lock();
        // Latest wins; an undelivered older snapshot is superseded.
        slot.pending = Some(snapshot);
        self.available.notify_one();
    }

    fn close(&self) {
        let mut slot = self.slot.lock();
        slot.closed = true;
        self.available.notify_all();
    }
}

/// A consumer's receiving end. The owner pulls snapshots on whatever
/// execution context it runs on and must unsubscribe on teardown.
pub struct Subscription {
    id: SubscriptionId,
    mailbox: Arc<Mailbox>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Takes the pending snapshot without blocking.
    pub fn try_latest(&self) -> Option<Arc<TrackerSnapshot>> {
        self.mailbox.slot.lock().pending.take()
    }

    /// Blocks until a snapshot arrives, the subscription is closed, or the
    /// timeout elapses.
    pub fn latest_timeout(&self, timeout: Duration) -> Option<Arc<TrackerSnapshot>> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.mailbox.slot.lock();
        loop {
            if let Some(snapshot) = slot.pending.take() {
                return Some(snapshot);
            }
            if slot.closed {
                return None;
            }
            if self
                .mailbox
                .available
                .wait_until(&mut slot, deadline)
                .timed_out()
            {
                return slot.pending.take();
            }
        }
    }

    /// True once the publisher side has dropped this subscription.
    pub fn is_closed(&self) -> bool {
        self.mailbox.slot.lock().closed
    }
}

pub struct SnapshotPublisher {
    subscribers: Mutex<HashMap<SubscriptionId, Arc<Mailbox>>>,
    next_id: AtomicU64,
    tick_tx: Sender<()>,
    tick_rx: Receiver<()>,
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotPublisher {
    pub fn new() -> Self {
        let (tick_tx, tick_rx) = bounded(1);
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            tick_tx,
            tick_rx,
        }
    }

    /// Registers a subscriber, optionally seeding its mailbox so the first
    /// pull observes current state instead of waiting for the next change.
    pub fn subscribe(&self, initial: Option<Arc<TrackerSnapshot>>) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mailbox = Arc::new(Mailbox::new());
        if let Some(snapshot) = initial {
            mailbox.post(snapshot);
        }
        self.subscribers.lock().insert(id, mailbox.clone());
        Subscription { id, mailbox }
    }

    /// Idempotent; safe from any thread. Wakes a consumer blocked on the
    /// mailbox so teardown cannot deadlock.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if let Some(mailbox) = self.subscribers.lock().remove(&id) {
            mailbox.close();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Signals that tracker state changed. Non-blocking; bursts coalesce
    /// into the single queued tick.
    pub fn notify(&self) {
        let _ = self.tick_tx.try_send(());
    }

    /// Waits for a change signal. Returns false on timeout.
    pub fn wait_for_change(&self, timeout: Duration) -> bool {
        self.tick_rx.recv_timeout(timeout).is_ok()
    }

    /// Clears a tick queued during the coalescing window, if any.
    pub fn absorb_pending_change(&self) {
        let _ = self.tick_rx.try_recv();
    }

    /// Posts the snapshot to every live subscriber; returns the fan-out
    /// size. Never blocks on any consumer.
    pub fn publish(&self, snapshot: Arc<TrackerSnapshot>) -> usize {
        let subscribers = self.subscribers.lock();
        for mailbox in subscribers.values() {
            mailbox.post(snapshot.clone());
        }
        subscribers.len()
    }
}
