//! meshlink - reliable messaging and diagnostic log streaming over a lossy
//! broadcast mesh
//!
//! The crate sits on top of any transport implementing
//! [`MeshTransport`](transport::MeshTransport) and provides:
//!
//! - **Checksummed text frames** - `body*HH` with CRC-8/Dallas-Maxim, so
//!   corrupted or foreign traffic is dropped before it reaches the
//!   application
//! - **Overwrite-on-full inbound queues** - the receive path never blocks on
//!   application work
//! - **Ordered, retried delivery to the root** - one worker, one queue,
//!   fixed-interval retries
//! - **Binary packets** - a fixed 14-byte header multiplexing application
//!   text and an out-of-band log stream the root can switch on and off
//!
//! # Quick Start
//!
//! ```rust
//! use meshlink::protocol::{add_checksum, verify_and_strip};
//!
//! let frame = add_checksum("pm1");
//! assert_eq!(frame, "pm1*DC");
//! assert_eq!(verify_and_strip(&frame)?, "pm1");
//! # Ok::<(), meshlink::protocol::FrameError>(())
//! ```
//!
//! A node over the in-process mesh:
//!
//! ```rust
//! use meshlink::{MeshNode, NodeConfig, NodeId};
//! use meshlink::transport::MemoryMesh;
//!
//! let mesh = MemoryMesh::new();
//! let _root = mesh.join_root(NodeId::new([0xAA; 6]));
//! let (node, _inbox) = MeshNode::new(mesh.join(NodeId::new([1; 6])), NodeConfig::default());
//!
//! node.on_transport_connected()?;
//! assert!(node.send_to_root("temp=21.5"));
//! node.shutdown();
//! # Ok::<(), meshlink::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod legacy;
pub mod logstream;
pub mod node;
pub mod protocol;
pub mod queue;
pub mod sender;
pub mod transport;

pub use logstream::{LogSink, LogStream, LogStreamConfig};
pub use node::{Inbound, MeshNode, NodeConfig};
pub use protocol::{
    DecodeError, Error, FrameError, MAGIC, NodeId, Packet, PacketCounter, PacketType, Payload,
    Result,
};
pub use sender::{BackoffPolicy, DropReason, ReliableSender, SenderConfig, SenderStats};
pub use transport::{MeshTransport, SharedTransport, TransportError};

/// Binary protocol version understood by this crate.
pub const VERSION: u8 = protocol::PROTOCOL_VERSION;
