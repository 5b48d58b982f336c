//! # Stream Error Types
//!
//! Errors surfaced by [`RemoteStream`](crate::RemoteStream) operations.
//!
//! Mid-transfer network failures are deliberately absent: the fetch task
//! absorbs them, remaining buffered bytes still drain, and `read` then
//! reports end-of-stream. Only connect-time and seek-resolution failures
//! propagate as explicit errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    /// The transfer could not be established and nothing is buffered.
    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    /// End-relative seek on a resource whose length the server never
    /// reveals, even after a metadata probe. Callers should disable
    /// end-relative seeking rather than treat the stream as broken.
    #[error("Stream length is unknown")]
    UnknownLength,

    /// The resolved seek target is negative or beyond the known length.
    #[error("Invalid seek target: {0}")]
    InvalidSeek(i64),

    /// Rejected configuration at open time.
    #[error("Invalid stream configuration: {0}")]
    Config(String),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamError {
    /// Returns `true` if this error concerns resolving a seek target
    /// rather than moving data.
    pub fn is_seek_error(&self) -> bool {
        matches!(
            self,
            StreamError::UnknownLength | StreamError::InvalidSeek(_)
        )
    }

    /// Returns `true` if this error is due to network issues.
    pub fn is_network_error(&self) -> bool {
        matches!(self, StreamError::ConnectFailed(_))
    }
}

impl From<StreamError> for std::io::Error {
    fn from(err: StreamError) -> Self {
        let kind = match &err {
            StreamError::ConnectFailed(_) => std::io::ErrorKind::ConnectionRefused,
            StreamError::UnknownLength => std::io::ErrorKind::Unsupported,
            StreamError::InvalidSeek(_) => std::io::ErrorKind::InvalidInput,
            StreamError::Config(_) => std::io::ErrorKind::InvalidInput,
            StreamError::Internal(_) => std::io::ErrorKind::Other,
            StreamError::Io(e) => e.kind(),
        };
        std::io::Error::new(kind, err)
    }
}

/// Result type for stream operations.
pub type Result<T> = std::result::Result<T, StreamError>;
