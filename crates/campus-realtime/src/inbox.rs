//! Per-session deduplicating, ordered inbox.
//!
//! Every event a session sees (replayed, polled, or live) goes through
//! [`Inbox::accept`]. The inbox is owned by exactly one task, so it needs no
//! locking of its own.

use std::collections::{HashSet, VecDeque};

use campus_types::ChatEvent;

/// Default number of event IDs remembered for duplicate suppression.
pub const DEFAULT_SEEN_CAPACITY: usize = 1000;

/// Outcome of offering an event to an inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The event was new and has been placed in the ordered sequence.
    Accepted,
    /// The event was already present; nothing changed.
    DuplicateSuppressed,
}

/// A bounded set of recently seen event IDs.
///
/// When the set grows past its capacity the oldest half is evicted, keeping
/// the most recently inserted IDs.
#[derive(Debug, Clone)]
pub struct SeenSet {
    capacity: usize,
    ids: HashSet<String>,
    order: VecDeque<String>,
}

impl SeenSet {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            ids: HashSet::with_capacity(capacity + 1),
            order: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Records `id`. Returns `false` if it was already present.
    pub fn insert(&mut self, id: &str) -> bool {
        if !self.ids.insert(id.to_string()) {
            return false;
        }
        self.order.push_back(id.to_string());
        if self.order.len() > self.capacity {
            let evict = self.order.len() / 2;
            for old in self.order.drain(..evict) {
                self.ids.remove(&old);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// The delivery record of one session.
#[derive(Debug, Clone)]
pub struct Inbox {
    seen: SeenSet,
    events: Vec<ChatEvent>,
}

impl Inbox {
    pub fn new(seen_capacity: usize) -> Self {
        Self {
            seen: SeenSet::new(seen_capacity),
            events: Vec::new(),
        }
    }

    /// Offers an event to the inbox.
    ///
    /// New events are inserted after every event with a `created_at` less
    /// than or equal to theirs, so equal timestamps keep arrival order.
    pub fn accept(&mut self, event: ChatEvent) -> Delivery {
        if self.seen.contains(&event.id) {
            return Delivery::DuplicateSuppressed;
        }

        let pos = self
            .events
            .partition_point(|existing| existing.created_at <= event.created_at);

        // An ID evicted from the seen-set may still be in the sequence. Equal
        // IDs carry equal timestamps, so only the run ending at `pos` can hold it.
        let already_held = self.events[..pos]
            .iter()
            .rev()
            .take_while(|existing| existing.created_at == event.created_at)
            .any(|existing| existing.id == event.id);

        self.seen.insert(&event.id);
        if already_held {
            return Delivery::DuplicateSuppressed;
        }

        self.events.insert(pos, event);
        Delivery::Accepted
    }

    /// The ordered sequence of accepted events.
    pub fn events(&self) -> &[ChatEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new(DEFAULT_SEEN_CAPACITY)
    }
}
