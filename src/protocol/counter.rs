//! Per-process packet counter.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Monotonic packet counter shared by every binary sender of a node.
///
/// Clones share the same value, so text relays, log lines and node
/// announcements all draw from one sequence. The first packet carries 1 and
/// the value wraps silently after `u32::MAX`.
#[derive(Debug, Clone, Default)]
pub struct PacketCounter {
    value: Arc<AtomicU32>,
}

impl PacketCounter {
    /// Counter starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter that will hand out `start + 1` next.
    #[must_use]
    pub fn starting_at(start: u32) -> Self {
        Self {
            value: Arc::new(AtomicU32::new(start)),
        }
    }

    /// Increment and return the new value.
    pub fn next(&self) -> u32 {
        self.value.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Value of the last packet handed out.
    #[must_use]
    pub fn current(&self) -> u32 {
        self.value.load(Ordering::Relaxed)
    }
}
