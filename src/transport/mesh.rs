//! Collaborator interface to the underlying mesh stack.

use std::sync::Arc;

use super::TransportError;
use crate::protocol::NodeId;

/// Broadcast-capable, unreliable mesh transport.
///
/// Routing, topology and credentials live behind this trait. Implementations
/// must be safe to call from the receive thread, the sender worker and any
/// logging context at the same time.
pub trait MeshTransport: Send + Sync {
    /// Identifier of this node.
    fn local_id(&self) -> NodeId;

    /// Send to every reachable node.
    fn broadcast(&self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Send to a single node; [`NodeId::ROOT`] addresses the mesh root.
    fn send_to(&self, destination: NodeId, bytes: &[u8]) -> Result<(), TransportError>;

    /// Block until the next datagram arrives.
    fn receive(&self) -> Result<(NodeId, Vec<u8>), TransportError>;

    /// Whether `origin` is this node (own broadcasts echoed back).
    fn is_self(&self, origin: NodeId) -> bool {
        origin == self.local_id()
    }
}

/// Shared, type-erased transport handle.
pub type SharedTransport = Arc<dyn MeshTransport>;
