//! Byte Transport Abstraction
//!
//! Defines the boundary between the buffering core and whatever actually
//! moves bytes across the network. A transport has exactly one contract:
//! deliver bytes in order starting at a requested absolute offset, and
//! report the total resource length when it becomes known.
//!
//! Implementations live in sibling crates (`transport-http` for
//! reqwest-backed HTTP/HTTPS); tests use scripted in-memory transports.

pub mod error;
pub mod transport;

pub use error::{Result, TransportError};
pub use transport::{ByteStream, ByteTransport, TransferInfo, TransferRequest};
