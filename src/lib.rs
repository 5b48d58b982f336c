//! Workspace umbrella crate.
//!
//! This crate exists so host applications can depend on `stream-vfs` and
//! enable the documented features without wiring each workspace crate
//! individually. The `http` feature (default) pulls in the reqwest-based
//! transport; disabling it leaves only the transport traits and the
//! buffering core, for hosts that bring their own transport.

pub use core_stream;
pub use transport_traits;

#[cfg(feature = "http")]
pub use transport_http;
