//! Bounded, blocking, double-ended work queue.
//!
//! Any number of producers append with [`WorkQueue::try_push_back`]; a
//! single worker blocks in [`WorkQueue::pop`] and may put an item back at
//! the head with [`WorkQueue::try_push_front`]. Pushes never block: a full
//! queue hands the item back in [`QueueFull`].

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

/// Rejected push; carries the item back to the caller.
///
/// A closed queue rejects every push the same way.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("work queue full")]
pub struct QueueFull<T>(pub T);

impl<T> QueueFull<T> {
    /// Recover the rejected item.
    pub fn into_inner(self) -> T {
        self.0
    }
}

#[derive(Debug)]
struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

#[derive(Debug)]
struct Shared<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
    capacity: usize,
}

/// Cloneable handle to a shared work queue.
#[derive(Debug)]
pub struct WorkQueue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> WorkQueue<T> {
    /// Create a queue holding at most `capacity` items (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    items: VecDeque::with_capacity(capacity),
                    closed: false,
                }),
                ready: Condvar::new(),
                capacity,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn try_push(&self, item: T, front: bool) -> Result<(), QueueFull<T>> {
        let mut state = self.lock();
        if state.closed || state.items.len() >= self.shared.capacity {
            return Err(QueueFull(item));
        }
        if front {
            state.items.push_front(item);
        } else {
            state.items.push_back(item);
        }
        drop(state);
        self.shared.ready.notify_one();
        Ok(())
    }

    /// Append at the tail without blocking.
    pub fn try_push_back(&self, item: T) -> Result<(), QueueFull<T>> {
        self.try_push(item, false)
    }

    /// Insert at the head without blocking.
    pub fn try_push_front(&self, item: T) -> Result<(), QueueFull<T>> {
        self.try_push(item, true)
    }

    /// Block until an item is available.
    ///
    /// Returns `None` once the queue is closed; items still queued at that
    /// point are abandoned.
    pub fn pop(&self) -> Option<T> {
        let state = self.lock();
        let mut state = self
            .shared
            .ready
            .wait_while(state, |s| s.items.is_empty() && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return None;
        }
        state.items.pop_front()
    }

    /// Stop accepting items and wake the consumer.
    pub fn close(&self) {
        self.lock().closed = true;
        self.shared.ready.notify_all();
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of queued items.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fifo_with_front_insert() {
        let queue = WorkQueue::new(4);
        queue.try_push_back(1).unwrap();
        queue.try_push_back(2).unwrap();
        queue.try_push_front(0).unwrap();

        assert_eq!(queue.pop(), Some(0));
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_full_queue_returns_item() {
        let queue = WorkQueue::new(2);
        queue.try_push_back("a").unwrap();
        queue.try_push_back("b").unwrap();

        assert_eq!(queue.try_push_back("c"), Err(QueueFull("c")));
        assert_eq!(queue.try_push_front("d").unwrap_err().into_inner(), "d");
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_pop_blocks_until_push() {
        let queue = WorkQueue::new(1);
        let consumer = queue.clone();
        let handle = thread::spawn(move || consumer.pop());

        thread::sleep(Duration::from_millis(20));
        queue.try_push_back(42).unwrap();
        assert_eq!(handle.join().unwrap(), Some(42));
    }

    #[test]
    fn test_close_wakes_consumer() {
        let queue: WorkQueue<u8> = WorkQueue::new(1);
        let consumer = queue.clone();
        let handle = thread::spawn(move || consumer.pop());

        thread::sleep(Duration::from_millis(20));
        queue.close();
        assert_eq!(handle.join().unwrap(), None);
        assert!(queue.is_closed());
        assert_eq!(queue.try_push_back(1), Err(QueueFull(1)));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let queue = WorkQueue::new(0);
        assert_eq!(queue.capacity(), 1);
        queue.try_push_back(()).unwrap();
        assert!(queue.try_push_back(()).is_err());
    }
}
