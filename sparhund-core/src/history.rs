//! Capacity-bounded, insertion-ordered event history.
//!
//! The history is a FIFO ring: pushing onto a full buffer evicts the
//! oldest entry. Capacity is fixed at construction and never exceeded.

use std::collections::VecDeque;

use crate::events::ConnectionEvent;

pub struct BoundedHistory {
    events: VecDeque<ConnectionEvent>,
    capacity: usize,
}

impl BoundedHistory {
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be greater than zero");
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an event, returning the evicted oldest entry when full.
    pub fn push(&mut self, event: ConnectionEvent) -> Option<ConnectionEvent> {
        let evicted = if self.events.len() == self.capacity {
            self.events.pop_front()
        } else {
            None
        };
        self.events.push_back(event);
        evicted
    }

    /// Iterates in insertion order, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ConnectionEvent> {
        self.events.iter()
    }

    pub fn to_vec(&self) -> Vec<ConnectionEvent> {
        self.events.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
