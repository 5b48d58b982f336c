//! Scripted in-memory transport for integration tests.
//!
//! Plays the role the real HTTP layer plays in production: delivers a
//! fixed resource in configurable chunks, optionally with per-chunk
//! delays, scripted mid-transfer failures, refused connections, inline
//! metadata intervals, and toggleable probe support. Counters record how
//! many transfers were started and how many ran concurrently.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use transport_traits::{
    ByteStream, ByteTransport, Result, TransferInfo, TransferRequest, TransportError,
};

#[derive(Default)]
pub struct Counters {
    pub begins: AtomicUsize,
    pub probes: AtomicUsize,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
    /// `resume_from` of every transfer, in order.
    pub resumes: Mutex<Vec<u64>>,
}

pub struct FakeTransport {
    data: Vec<u8>,
    chunk_size: usize,
    chunk_delay: Option<Duration>,
    advertise_length: bool,
    probe_supported: bool,
    refuse_connect: bool,
    fail_after: Option<usize>,
    station_name: Option<String>,
    metadata_interval: Option<usize>,
    pub counters: Arc<Counters>,
}

impl FakeTransport {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            chunk_size: 4096,
            chunk_delay: None,
            advertise_length: false,
            probe_supported: false,
            refuse_connect: false,
            fail_after: None,
            station_name: None,
            metadata_interval: None,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    /// Advertise the resource length in transfer and probe responses.
    pub fn advertise_length(mut self) -> Self {
        self.advertise_length = true;
        self
    }

    /// Answer probes (with a length only if `advertise_length` is set).
    pub fn probe_supported(mut self) -> Self {
        self.probe_supported = true;
        self
    }

    /// Refuse every connection attempt.
    pub fn refuse_connect(mut self) -> Self {
        self.refuse_connect = true;
        self
    }

    /// Deliver exactly `bytes` payload bytes per transfer, then fail.
    pub fn fail_after(mut self, bytes: usize) -> Self {
        self.fail_after = Some(bytes);
        self
    }

    pub fn station_name(mut self, name: &str) -> Self {
        self.station_name = Some(name.to_string());
        self
    }

    /// Declare the payload as ICY-interleaved with the given interval.
    pub fn metadata_interval(mut self, interval: usize) -> Self {
        self.metadata_interval = Some(interval);
        self
    }

    fn info(&self) -> TransferInfo {
        TransferInfo {
            total_length: self.advertise_length.then_some(self.data.len() as u64),
            station_name: self.station_name.clone(),
            metadata_interval: self.metadata_interval,
            content_type: Some("audio/mpeg".to_string()),
        }
    }
}

#[async_trait]
impl ByteTransport for FakeTransport {
    async fn begin(&self, request: TransferRequest) -> Result<Box<dyn ByteStream>> {
        self.counters.begins.fetch_add(1, Ordering::SeqCst);
        self.counters.resumes.lock().push(request.resume_from);

        if self.refuse_connect {
            return Err(TransportError::ConnectFailed(
                "connection refused by script".to_string(),
            ));
        }
        let start = request.resume_from as usize;
        if start > self.data.len() {
            return Err(TransportError::HttpStatus(416));
        }

        let active = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_active.fetch_max(active, Ordering::SeqCst);

        Ok(Box::new(FakeStream {
            data: Bytes::copy_from_slice(&self.data[start..]),
            info: self.info(),
            chunk_size: self.chunk_size,
            chunk_delay: self.chunk_delay,
            remaining_before_failure: self.fail_after,
            counters: Arc::clone(&self.counters),
        }))
    }

    async fn probe(&self, _url: &str) -> Result<TransferInfo> {
        self.counters.probes.fetch_add(1, Ordering::SeqCst);
        if !self.probe_supported {
            return Err(TransportError::ProbeUnsupported);
        }
        Ok(self.info())
    }
}

struct FakeStream {
    data: Bytes,
    info: TransferInfo,
    chunk_size: usize,
    chunk_delay: Option<Duration>,
    remaining_before_failure: Option<usize>,
    counters: Arc<Counters>,
}

#[async_trait]
impl ByteStream for FakeStream {
    fn info(&self) -> &TransferInfo {
        &self.info
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if let Some(delay) = self.chunk_delay {
            tokio::time::sleep(delay).await;
        }
        let mut take = self.chunk_size.min(self.data.len());
        if let Some(remaining) = &mut self.remaining_before_failure {
            if *remaining == 0 {
                return Err(TransportError::TransferInterrupted(
                    "scripted mid-transfer failure".to_string(),
                ));
            }
            take = take.min(*remaining);
            *remaining -= take;
        }
        if take == 0 {
            return Ok(None);
        }
        Ok(Some(self.data.split_to(take)))
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        // One transfer stopped being active, however it ended.
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Wire bytes for `audio` with an ICY metadata block after every
/// `interval` audio bytes. `titles[i]` goes into the i-th block; `None`
/// emits the zero length byte.
pub fn build_icy_wire(audio: &[u8], interval: usize, titles: &[Option<&str>]) -> Vec<u8> {
    let mut wire = Vec::new();
    let mut block = 0;
    for chunk in audio.chunks(interval) {
        wire.extend_from_slice(chunk);
        if chunk.len() == interval {
            match titles.get(block).copied().flatten() {
                Some(title) => {
                    let text = format!("StreamTitle='{}';", title);
                    let units = text.len().div_ceil(16);
                    wire.push(units as u8);
                    wire.extend_from_slice(text.as_bytes());
                    wire.resize(wire.len() + units * 16 - text.len(), 0);
                }
                None => wire.push(0),
            }
            block += 1;
        }
    }
    wire
}

/// Deterministic non-repeating payload for integrity checks.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
