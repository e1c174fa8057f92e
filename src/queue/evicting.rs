//! Bounded FIFO that evicts the oldest entry instead of rejecting pushes.
//!
//! The queue is split into exactly one [`Producer`] and one [`Consumer`];
//! neither handle can be cloned, so the single-producer/single-consumer
//! contract is carried by ownership. The ring itself sits behind a mutex
//! that is held only for an index update and one slot move, so the producer
//! (typically a transport callback) never waits on application work.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Ring of `capacity + 1` slots: `head == tail` means empty, and a push
/// whose next head would equal `tail` first advances `tail`.
#[derive(Debug)]
struct Ring<T> {
    slots: Vec<Option<T>>,
    head: usize,
    tail: usize,
    evicted: u64,
}

impl<T> Ring<T> {
    fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity + 1);
        slots.resize_with(capacity + 1, || None);
        Self {
            slots,
            head: 0,
            tail: 0,
            evicted: 0,
        }
    }

    fn advance(&self, index: usize) -> usize {
        (index + 1) % self.slots.len()
    }

    fn push(&mut self, item: T) -> bool {
        let next = self.advance(self.head);
        let overwrote = next == self.tail;
        if overwrote {
            self.slots[self.tail] = None;
            self.tail = self.advance(self.tail);
            self.evicted += 1;
        }
        self.slots[self.head] = Some(item);
        self.head = next;
        overwrote
    }

    fn pop(&mut self) -> Option<T> {
        if self.head == self.tail {
            return None;
        }
        let item = self.slots[self.tail].take();
        self.tail = self.advance(self.tail);
        item
    }

    fn len(&self) -> usize {
        (self.head + self.slots.len() - self.tail) % self.slots.len()
    }
}

type Shared<T> = Arc<Mutex<Ring<T>>>;

fn lock<T>(ring: &Shared<T>) -> MutexGuard<'_, Ring<T>> {
    // Every critical section leaves the indices consistent.
    ring.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Create an evicting queue holding up to `capacity` items (at least one).
#[must_use]
pub fn evicting_queue<T>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    let capacity = capacity.max(1);
    let ring = Arc::new(Mutex::new(Ring::with_capacity(capacity)));
    (
        Producer {
            ring: Arc::clone(&ring),
            capacity,
        },
        Consumer { ring, capacity },
    )
}

/// Write side of an evicting queue.
#[derive(Debug)]
pub struct Producer<T> {
    ring: Shared<T>,
    capacity: usize,
}

impl<T> Producer<T> {
    /// Append `item`; never blocks or fails.
    ///
    /// Returns `true` when the oldest unread item was evicted to make room.
    pub fn push(&mut self, item: T) -> bool {
        lock(&self.ring).push(item)
    }

    /// Maximum number of retained items.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Read side of an evicting queue.
#[derive(Debug)]
pub struct Consumer<T> {
    ring: Shared<T>,
    capacity: usize,
}

impl<T> Consumer<T> {
    /// Remove and return the oldest retained item.
    pub fn pop(&mut self) -> Option<T> {
        lock(&self.ring).pop()
    }

    /// Number of items waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.ring).len()
    }

    /// Whether nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of items evicted unread since creation.
    #[must_use]
    pub fn evicted(&self) -> u64 {
        lock(&self.ring).evicted
    }

    /// Maximum number of retained items.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
