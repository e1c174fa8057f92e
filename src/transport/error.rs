//! Transport-level error types.

use std::io;

use thiserror::Error;

use crate::protocol::NodeId;

/// Failure reported by a [`MeshTransport`](super::MeshTransport).
///
/// Send failures are always recovered locally (retry or drop); they never
/// reach the application as a fatal condition.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The mesh is not reachable right now (no parent, link down, queue
    /// full inside the stack).
    #[error("mesh unavailable: {0}")]
    Unavailable(String),

    /// No route to the requested node.
    #[error("unknown destination {0}")]
    UnknownDestination(NodeId),

    /// The transport has shut down; receive loops should exit.
    #[error("transport closed")]
    Closed,

    /// Underlying I/O error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// Whether the failure is permanent for this transport instance.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
