//! Mesh transport collaborator interface and an in-process implementation

mod error;
mod memory;
mod mesh;

pub use error::TransportError;
pub use memory::{MemoryLink, MemoryMesh};
pub use mesh::{MeshTransport, SharedTransport};
