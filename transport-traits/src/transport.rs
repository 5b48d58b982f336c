//! Transport Traits
//!
//! `ByteTransport` starts transfers and probes; `ByteStream` is one live
//! transfer delivering ordered chunks. Dropping a `ByteStream` aborts the
//! underlying connection.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;

/// Request to begin delivering bytes from an absolute offset.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub url: String,
    /// Absolute byte offset the first delivered byte must have.
    pub resume_from: u64,
    /// Extra request headers.
    pub headers: HashMap<String, String>,
    /// Ask the server to interleave inline metadata (ICY) if it can.
    pub inline_metadata: bool,
    pub timeout: Option<Duration>,
}

impl TransferRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            resume_from: 0,
            headers: HashMap::new(),
            inline_metadata: false,
            timeout: None,
        }
    }

    pub fn resume_from(mut self, offset: u64) -> Self {
        self.resume_from = offset;
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn inline_metadata(mut self, enabled: bool) -> Self {
        self.inline_metadata = enabled;
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// What the transport learned from the response headers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferInfo {
    /// Total length of the resource in bytes, when the server revealed it.
    /// For ranged responses this is the full resource length, not the
    /// remaining range.
    pub total_length: Option<u64>,
    /// Station / stream name (`icy-name`), if advertised.
    pub station_name: Option<String>,
    /// Interval in bytes between inline metadata blocks (`icy-metaint`).
    /// `None` when the payload is pure audio bytes.
    pub metadata_interval: Option<usize>,
    /// MIME type of the payload.
    pub content_type: Option<String>,
}

/// One live transfer. Chunks arrive strictly in order, starting at the
/// offset the `TransferRequest` asked for.
#[async_trait]
pub trait ByteStream: Send {
    /// Response metadata, available as soon as the transfer is established.
    fn info(&self) -> &TransferInfo;

    /// Next in-order chunk of payload bytes. `Ok(None)` at the natural end
    /// of the transfer.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>>;
}

/// Factory for transfers against one kind of source.
///
/// # Example
///
/// ```ignore
/// use transport_traits::{ByteTransport, TransferRequest};
///
/// async fn first_chunk(transport: &dyn ByteTransport) -> Option<bytes::Bytes> {
///     let request = TransferRequest::new("https://example.com/stream.mp3")
///         .resume_from(4096);
///     let mut stream = transport.begin(request).await.ok()?;
///     stream.next_chunk().await.ok().flatten()
/// }
/// ```
#[async_trait]
pub trait ByteTransport: Send + Sync {
    /// Establish a transfer. The first delivered byte has absolute offset
    /// `request.resume_from`.
    async fn begin(&self, request: TransferRequest) -> Result<Box<dyn ByteStream>>;

    /// Metadata-only probe: fetch headers without a body, typically to
    /// discover the total length.
    async fn probe(&self, url: &str) -> Result<TransferInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_request_builder() {
        let request = TransferRequest::new("https://example.com/live")
            .resume_from(1024)
            .header("User-Agent", "test")
            .inline_metadata(true)
            .timeout(Duration::from_secs(3));

        assert_eq!(request.url, "https://example.com/live");
        assert_eq!(request.resume_from, 1024);
        assert_eq!(request.headers.get("User-Agent"), Some(&"test".to_string()));
        assert!(request.inline_metadata);
        assert_eq!(request.timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_transfer_info_defaults() {
        let info = TransferInfo::default();
        assert_eq!(info.total_length, None);
        assert_eq!(info.metadata_interval, None);
        assert_eq!(info.station_name, None);
    }
}
