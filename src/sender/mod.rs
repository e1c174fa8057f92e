//! Ordered, retried delivery of short texts to a single destination.
//!
//! [`ReliableSender`] owns a bounded [`WorkQueue`] and one worker thread.
//! The worker takes the head message, draws a fresh counter for it and sends
//! it as a `Text` packet. On failure the same message, counter included,
//! goes back to the head of the queue and the worker waits out the
//! [`BackoffPolicy`] interval, so later messages never overtake it.
//!
//! ```text
//! enqueue() ─┐
//! enqueue() ─┼─► WorkQueue ─► meshlink-root-tx ─► transport.send_to(root)
//! enqueue() ─┘        ▲              │ failure
//!                     └── push_front ┘
//! ```

mod backoff;
mod work_queue;

pub use backoff::{BackoffPolicy, DEFAULT_RETRY_INTERVAL, Sleeper, ThreadSleeper};
pub use work_queue::{QueueFull, WorkQueue};

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, instrument, warn};

use crate::protocol::{Error, NodeId, Packet, PacketCounter, Payload, Result, TextPayload};
use crate::transport::SharedTransport;

/// Default length of the outbound queue.
pub const DEFAULT_QUEUE_LEN: usize = 16;

/// Scheduling hint used when `start` is given 0.
pub const DEFAULT_PRIORITY: u8 = 5;

/// Name of the worker thread.
pub const WORKER_THREAD_NAME: &str = "meshlink-root-tx";

/// Sender configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SenderConfig {
    /// Maximum queued messages
    pub queue_len: usize,
    /// Where every message goes
    pub destination: NodeId,
    /// Worker scheduling hint, 0 selects [`DEFAULT_PRIORITY`]
    pub priority: u8,
    /// Retry cadence
    pub backoff: BackoffPolicy,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            queue_len: DEFAULT_QUEUE_LEN,
            destination: NodeId::ROOT,
            priority: DEFAULT_PRIORITY,
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Why a message was given up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// Rejected by `enqueue` because the queue was full
    QueueFull,
    /// Failed, and the queue had filled up before it could be put back
    RequeueFull,
    /// Failed more often than [`BackoffPolicy::max_retries`] allows
    RetriesExhausted,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "queue full"),
            Self::RequeueFull => write!(f, "queue full on retry"),
            Self::RetriesExhausted => write!(f, "retries exhausted"),
        }
    }
}

/// Snapshot of sender counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStats {
    /// Messages accepted by `enqueue`
    pub enqueued: u64,
    /// Successful sends
    pub sent: u64,
    /// Failed send attempts
    pub failures: u64,
    /// Messages rejected at enqueue
    pub dropped_queue_full: u64,
    /// Messages lost because the retry could not be requeued
    pub dropped_on_retry: u64,
    /// Messages given up after the retry limit
    pub dropped_retries_exhausted: u64,
}

#[derive(Debug, Default)]
struct Counters {
    enqueued: AtomicU64,
    sent: AtomicU64,
    failures: AtomicU64,
    dropped_queue_full: AtomicU64,
    dropped_on_retry: AtomicU64,
    dropped_retries_exhausted: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SenderStats {
        SenderStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            dropped_queue_full: self.dropped_queue_full.load(Ordering::Relaxed),
            dropped_on_retry: self.dropped_on_retry.load(Ordering::Relaxed),
            dropped_retries_exhausted: self.dropped_retries_exhausted.load(Ordering::Relaxed),
        }
    }
}

type DropHook = Arc<dyn Fn(&str, DropReason) + Send + Sync>;

/// Queued message; the counter is drawn on the first attempt and kept for
/// every retry.
#[derive(Debug, Clone, Copy)]
struct Outbound {
    text: TextPayload,
    counter: Option<u32>,
}

impl Outbound {
    const fn new(text: TextPayload) -> Self {
        Self {
            text,
            counter: None,
        }
    }
}

/// State shared between the handle and the worker.
struct Shared {
    counters: Counters,
    on_drop: Option<DropHook>,
}

impl Shared {
    fn dropped(&self, text: &str, reason: DropReason) {
        let counter = match reason {
            DropReason::QueueFull => &self.counters.dropped_queue_full,
            DropReason::RequeueFull => &self.counters.dropped_on_retry,
            DropReason::RetriesExhausted => &self.counters.dropped_retries_exhausted,
        };
        Counters::bump(counter);
        warn!(%reason, text, "message dropped");
        if let Some(hook) = &self.on_drop {
            hook(text, reason);
        }
    }
}

/// Reliable, ordered sender towards one destination.
///
/// Messages are delivered at least once and in enqueue order; every retry of
/// a message repeats the counter of its first attempt.
pub struct ReliableSender {
    transport: SharedTransport,
    counter: PacketCounter,
    config: SenderConfig,
    queue: WorkQueue<Outbound>,
    sleeper: Arc<dyn Sleeper>,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for ReliableSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReliableSender")
            .field("config", &self.config)
            .field("pending", &self.queue.len())
            .field("started", &self.is_started())
            .finish_non_exhaustive()
    }
}

impl ReliableSender {
    /// Create a stopped sender.
    #[must_use]
    pub fn new(transport: SharedTransport, counter: PacketCounter, config: SenderConfig) -> Self {
        Self {
            transport,
            counter,
            queue: WorkQueue::new(config.queue_len),
            config,
            sleeper: Arc::new(ThreadSleeper),
            shared: Arc::new(Shared {
                counters: Counters::default(),
                on_drop: None,
            }),
            worker: Mutex::new(None),
        }
    }

    /// Replace the sleeper used between retries.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Call `hook` with the text of every dropped message.
    ///
    /// Takes effect for workers started afterwards.
    #[must_use]
    pub fn with_drop_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, DropReason) + Send + Sync + 'static,
    {
        self.shared = Arc::new(Shared {
            counters: Counters::default(),
            on_drop: Some(Arc::new(hook)),
        });
        self
    }

    /// Spawn the worker thread. Idempotent.
    ///
    /// `priority` is a scheduling hint; 0 selects [`DEFAULT_PRIORITY`].
    /// Returns `true` if this call started the worker.
    pub fn start(&self, priority: u8) -> io::Result<bool> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.is_some() || self.queue.is_closed() {
            return Ok(false);
        }

        let priority = if priority == 0 { DEFAULT_PRIORITY } else { priority };
        let context = Worker {
            transport: Arc::clone(&self.transport),
            counter: self.counter.clone(),
            queue: self.queue.clone(),
            sleeper: Arc::clone(&self.sleeper),
            shared: Arc::clone(&self.shared),
            destination: self.config.destination,
            backoff: self.config.backoff,
        };
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.into())
            .spawn(move || context.run())?;
        *worker = Some(handle);

        debug!(
            priority,
            destination = %self.config.destination,
            queue_len = self.queue.capacity(),
            "root sender started"
        );
        Ok(true)
    }

    /// Whether the worker is running.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Queue `text` for delivery, truncating it to the packet field.
    ///
    /// Returns `Ok(false)` when the sender is not started or `text` is
    /// empty, and [`Error::QueueFull`] when the queue has no room.
    pub fn try_enqueue(&self, text: &str) -> Result<bool> {
        if text.is_empty() || !self.is_started() {
            return Ok(false);
        }
        match self
            .queue
            .try_push_back(Outbound::new(TextPayload::truncated(text)))
        {
            Ok(()) => {
                Counters::bump(&self.shared.counters.enqueued);
                Ok(true)
            }
            Err(QueueFull(rejected)) => {
                self.shared.dropped(&rejected.text, DropReason::QueueFull);
                Err(Error::QueueFull {
                    destination: self.config.destination,
                })
            }
        }
    }

    /// Queue `text` for delivery; `false` if it was not accepted.
    pub fn enqueue(&self, text: &str) -> bool {
        matches!(self.try_enqueue(text), Ok(true))
    }

    /// Messages waiting, including one being retried.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> SenderStats {
        self.shared.counters.snapshot()
    }

    /// Sender configuration.
    #[must_use]
    pub const fn config(&self) -> &SenderConfig {
        &self.config
    }

    /// Stop the worker and wait for it.
    ///
    /// Queued messages are abandoned. A worker sleeping out a backoff
    /// interval exits once the interval ends.
    pub fn shutdown(&self) {
        self.queue.close();
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("root sender worker panicked");
            }
            debug!("root sender stopped");
        }
    }
}

impl Drop for ReliableSender {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Everything the worker thread needs.
struct Worker {
    transport: SharedTransport,
    counter: PacketCounter,
    queue: WorkQueue<Outbound>,
    sleeper: Arc<dyn Sleeper>,
    shared: Arc<Shared>,
    destination: NodeId,
    backoff: BackoffPolicy,
}

impl Worker {
    fn run(self) {
        // Failures of the message currently at the head.
        let mut failures = 0u32;
        while let Some(mut item) = self.queue.pop() {
            let counter = *item.counter.get_or_insert_with(|| self.counter.next());
            if self.attempt(item.text, counter) {
                failures = 0;
                continue;
            }

            failures = failures.saturating_add(1);
            if !self.backoff.should_retry(failures) {
                failures = 0;
                self.shared.dropped(&item.text, DropReason::RetriesExhausted);
                continue;
            }
            if let Err(QueueFull(item)) = self.queue.try_push_front(item) {
                // A closed queue means shutdown, which abandons the message.
                if self.queue.is_closed() {
                    break;
                }
                failures = 0;
                self.shared.dropped(&item.text, DropReason::RequeueFull);
                continue;
            }
            self.sleeper.sleep(self.backoff.interval);
        }
    }

    #[instrument(level = "trace", skip(self), fields(destination = %self.destination))]
    fn attempt(&self, text: TextPayload, counter: u32) -> bool {
        let packet = Packet::new(self.transport.local_id(), counter, Payload::Text(text));
        match self.transport.send_to(self.destination, &packet.encode()) {
            Ok(()) => {
                Counters::bump(&self.shared.counters.sent);
                info!(counter, text = %text, "sent to root");
                true
            }
            Err(err) => {
                Counters::bump(&self.shared.counters.failures);
                warn!(counter, error = %err, "send to root failed, will retry");
                false
            }
        }
    }
}
