use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    /// The transfer could not be established at all (DNS, TCP, TLS,
    /// request build). No bytes were delivered.
    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    /// The server answered with a non-success status.
    #[error("HTTP error status: {0}")]
    HttpStatus(u16),

    /// A resume-from offset was requested but the server ignored the
    /// range and restarted from byte zero.
    #[error("Server does not support range requests")]
    RangeNotSupported,

    /// The transfer was established and then broke mid-stream.
    #[error("Transfer interrupted: {0}")]
    TransferInterrupted(String),

    /// The server rejects metadata-only probes (common for live streams
    /// that refuse HEAD requests).
    #[error("Metadata probe not supported by server")]
    ProbeUnsupported,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Returns `true` if the transfer never delivered any payload bytes.
    pub fn is_connect_error(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectFailed(_) | TransportError::HttpStatus(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
