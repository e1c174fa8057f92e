//! In-process mesh hub.
//!
//! [`MemoryMesh`] connects any number of [`MemoryLink`] endpoints inside one
//! process. It provides:
//!
//! - **Broadcast and unicast delivery**, with [`NodeId::ROOT`] resolving to
//!   the endpoint marked as root
//! - **Fault injection**: failing the next N sends, or taking a link down
//! - **Echo**: optionally delivering broadcasts back to their sender, the way
//!   some mesh stacks do

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{instrument, trace};

use super::{MeshTransport, TransportError};
use crate::protocol::NodeId;

type Datagram = (NodeId, Vec<u8>);

/// Hub shared by every endpoint of one simulated mesh.
#[derive(Clone, Debug, Default)]
pub struct MemoryMesh {
    inner: Arc<HubInner>,
}

#[derive(Debug, Default)]
struct HubInner {
    mailboxes: Mutex<HashMap<NodeId, Arc<Mailbox>>>,
    root: Mutex<Option<NodeId>>,
    echo_broadcasts: AtomicBool,
}

#[derive(Debug, Default)]
struct Mailbox {
    queue: Mutex<VecDeque<Datagram>>,
    ready: Condvar,
    closed: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Mailbox {
    fn deliver(&self, from: NodeId, bytes: &[u8]) {
        lock(&self.queue).push_back((from, bytes.to_vec()));
        self.ready.notify_one();
    }
}

impl MemoryMesh {
    /// Create an empty mesh.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver broadcasts back to their sender as well.
    pub fn set_echo_broadcasts(&self, echo: bool) {
        self.inner.echo_broadcasts.store(echo, Ordering::Relaxed);
    }

    /// Attach a new endpoint.
    #[must_use]
    pub fn join(&self, id: NodeId) -> Arc<MemoryLink> {
        let mailbox = Arc::new(Mailbox::default());
        lock(&self.inner.mailboxes).insert(id, Arc::clone(&mailbox));
        Arc::new(MemoryLink {
            id,
            hub: Arc::clone(&self.inner),
            mailbox,
            fail_next: AtomicUsize::new(0),
            down: AtomicBool::new(false),
        })
    }

    /// Attach a new endpoint and make it the mesh root.
    #[must_use]
    pub fn join_root(&self, id: NodeId) -> Arc<MemoryLink> {
        let link = self.join(id);
        *lock(&self.inner.root) = Some(id);
        link
    }
}

/// One endpoint of a [`MemoryMesh`].
#[derive(Debug)]
pub struct MemoryLink {
    id: NodeId,
    hub: Arc<HubInner>,
    mailbox: Arc<Mailbox>,
    fail_next: AtomicUsize,
    down: AtomicBool,
}

impl MemoryLink {
    /// Make the next `count` send attempts fail with
    /// [`TransportError::Unavailable`].
    pub fn fail_next_sends(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Fail every send while `down` is set.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Wake and terminate any blocked [`receive`](MeshTransport::receive).
    pub fn close(&self) {
        self.mailbox.closed.store(true, Ordering::SeqCst);
        self.mailbox.ready.notify_all();
    }

    /// Pop a pending datagram without blocking.
    #[must_use]
    pub fn try_receive(&self) -> Option<Datagram> {
        lock(&self.mailbox.queue).pop_front()
    }

    /// Wait up to `timeout` for the next datagram.
    #[must_use]
    pub fn receive_timeout(&self, timeout: Duration) -> Option<Datagram> {
        let queue = lock(&self.mailbox.queue);
        let (mut queue, _) = self
            .mailbox
            .ready
            .wait_timeout_while(queue, timeout, |q| {
                q.is_empty() && !self.mailbox.closed.load(Ordering::SeqCst)
            })
            .unwrap_or_else(PoisonError::into_inner);
        queue.pop_front()
    }

    fn check_link(&self) -> Result<(), TransportError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("link down".into()));
        }
        let consumed = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if consumed {
            return Err(TransportError::Unavailable("injected failure".into()));
        }
        Ok(())
    }
}

impl MeshTransport for MemoryLink {
    fn local_id(&self) -> NodeId {
        self.id
    }

    #[instrument(level = "trace", skip(self, bytes), fields(node = %self.id))]
    fn broadcast(&self, bytes: &[u8]) -> Result<(), TransportError> {
        self.check_link()?;
        let echo = self.hub.echo_broadcasts.load(Ordering::Relaxed);
        // Collected first: delivery and tracing may re-enter the hub.
        let targets: Vec<Arc<Mailbox>> = lock(&self.hub.mailboxes)
            .iter()
            .filter(|(id, _)| **id != self.id || echo)
            .map(|(_, mailbox)| Arc::clone(mailbox))
            .collect();
        for mailbox in &targets {
            mailbox.deliver(self.id, bytes);
        }
        trace!(len = bytes.len(), peers = targets.len(), "broadcast delivered");
        Ok(())
    }

    #[instrument(level = "trace", skip(self, bytes), fields(node = %self.id))]
    fn send_to(&self, destination: NodeId, bytes: &[u8]) -> Result<(), TransportError> {
        self.check_link()?;
        let target = if destination.is_root() {
            let root = *lock(&self.hub.root);
            root.ok_or(TransportError::UnknownDestination(destination))?
        } else {
            destination
        };
        let mailbox = lock(&self.hub.mailboxes)
            .get(&target)
            .cloned()
            .ok_or(TransportError::UnknownDestination(destination))?;
        mailbox.deliver(self.id, bytes);
        trace!(len = bytes.len(), %target, "unicast delivered");
        Ok(())
    }

    fn receive(&self) -> Result<Datagram, TransportError> {
        let queue = lock(&self.mailbox.queue);
        let mut queue = self
            .mailbox
            .ready
            .wait_while(queue, |q| {
                q.is_empty() && !self.mailbox.closed.load(Ordering::SeqCst)
            })
            .unwrap_or_else(PoisonError::into_inner);
        queue.pop_front().ok_or(TransportError::Closed)
    }
}
