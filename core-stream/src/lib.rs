//! # Streaming Buffer Core
//!
//! Presents remote audio resources as random-access, seekable byte
//! streams for the decoding pipeline.
//!
//! ## Overview
//!
//! This crate handles:
//! - A fixed-capacity ring buffer addressed by absolute stream offsets
//! - A background fetch task per stream, with cooperative cancellation
//! - Seeking by cursor resynchronization or transfer restart
//! - Inline (ICY) metadata stripping and track-title extraction
//!
//! The network itself lives behind the `transport-traits` boundary; see
//! `transport-http` for the reqwest-backed implementation.

pub mod config;
pub mod error;
pub mod icy;
pub mod ring;
pub mod stream;

mod fetch;
mod rt;

pub use config::StreamConfig;
pub use error::{Result, StreamError};
pub use ring::RingBuffer;
pub use stream::{RemoteStream, StreamMetadata};
