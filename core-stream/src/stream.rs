//! # Remote Stream Handle
//!
//! [`RemoteStream`] presents a random-access, seekable byte stream over a
//! strictly sequential, possibly slow network source. A background fetch
//! task deposits bytes into a fixed ring buffer; `read` blocks on a
//! condition variable until data arrives or the transfer is known to have
//! ended, so the reader never sees raw network latency beyond what the
//! window can absorb.
//!
//! Seeking either resynchronizes the read cursor against the buffered
//! window (the transfer continues untouched) or, when the target falls
//! outside it, cancels the transfer and restarts it at the target using a
//! resume-from request.
//!
//! ## Contract
//!
//! One foreground caller and at most one fetch task per stream. All
//! cursor-moving operations take `&mut self`, so the compiler enforces
//! the single foreground caller; the fetch lifecycle (spawn after join,
//! never overlapping) is enforced internally. The blocking calls must not
//! be issued from inside an async runtime.

use crate::config::StreamConfig;
use crate::error::{Result, StreamError};
use crate::fetch::{self, FetchHandle};
use crate::ring::RingBuffer;
use parking_lot::{Condvar, Mutex};
use std::io::{self, SeekFrom};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;
use transport_traits::{ByteTransport, TransferRequest};

/// What is known about the total resource length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Length {
    /// Not discovered yet.
    Unknown,
    Known(u64),
    /// A probe ran and the server still revealed nothing; end-relative
    /// seeks fail without re-probing.
    Unavailable,
}

pub(crate) struct StreamState {
    pub(crate) ring: RingBuffer,
    pub(crate) length: Length,
    /// The transfer delivered its last byte.
    pub(crate) completed: bool,
    /// The transfer ended in a way that must not be retried.
    pub(crate) failed: bool,
    /// Reason the transfer could not be established, when it never was.
    pub(crate) connect_error: Option<String>,
    /// A fetch task exists and has not observed its own exit yet.
    pub(crate) fetch_active: bool,
    pub(crate) station_name: Option<String>,
    pub(crate) track_title: Option<String>,
    pub(crate) content_type: Option<String>,
}

impl StreamState {
    fn new(capacity: usize) -> Self {
        Self {
            ring: RingBuffer::new(capacity),
            length: Length::Unknown,
            completed: false,
            failed: false,
            connect_error: None,
            fetch_active: false,
            station_name: None,
            track_title: None,
            content_type: None,
        }
    }

    /// No byte will ever arrive beyond what is buffered now.
    pub(crate) fn ended(&self) -> bool {
        self.completed || self.failed
    }
}

/// State shared between the stream handle and its fetch task, guarded by
/// a single lock.
pub(crate) struct Shared {
    pub(crate) state: Mutex<StreamState>,
    /// Signalled by the writer after every deposit and on task exit.
    pub(crate) data_ready: Condvar,
    /// Permit stored by the reader after consuming or jumping forward.
    pub(crate) space_ready: Notify,
}

/// Snapshot of what is known about the stream.
#[derive(Debug, Clone, Default)]
pub struct StreamMetadata {
    /// Station name advertised by the server.
    pub station_name: Option<String>,
    /// Most recent inline track title.
    pub track_title: Option<String>,
    /// MIME type of the payload.
    pub content_type: Option<String>,
    /// Total resource length, when known.
    pub content_length: Option<u64>,
}

/// A seekable byte stream over a sequential network source.
pub struct RemoteStream {
    url: String,
    transport: Arc<dyn ByteTransport>,
    config: StreamConfig,
    shared: Arc<Shared>,
    fetch: Option<FetchHandle>,
    /// Bytes pushed back by [`unread_byte`](Self::unread_byte); served
    /// before ring bytes, cleared by any seek.
    pushback: Vec<u8>,
}

impl RemoteStream {
    /// Open a stream over `url`. Lazy: no network activity happens until
    /// the first `read` or an end-relative `seek` forces it.
    pub fn open(
        url: impl Into<String>,
        transport: Arc<dyn ByteTransport>,
        config: StreamConfig,
    ) -> Result<Self> {
        config.validate().map_err(StreamError::Config)?;
        let url = url.into();
        debug!(url = %url, capacity = config.buffer_bytes, "Opening remote stream");
        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(StreamState::new(config.buffer_bytes)),
                data_ready: Condvar::new(),
                space_ready: Notify::new(),
            }),
            transport,
            url,
            config,
            fetch: None,
            pushback: Vec::new(),
        })
    }

    /// Read up to `buf.len()` bytes, blocking until the request is
    /// satisfied or no more data will arrive.
    ///
    /// Returns fewer bytes than requested only at end-of-stream or after
    /// a mid-transfer failure drained the buffered window; returns
    /// `Ok(0)` exactly at end-of-stream. `Err(ConnectFailed)` is returned
    /// only when the transfer could not be established at all and nothing
    /// is buffered.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut filled = 0;
        while filled < buf.len() {
            match self.pushback.pop() {
                Some(byte) => {
                    buf[filled] = byte;
                    filled += 1;
                }
                None => break,
            }
        }
        if filled == buf.len() {
            return Ok(filled);
        }

        self.ensure_fetch()?;

        let shared = Arc::clone(&self.shared);
        let mut state = shared.state.lock();
        while filled < buf.len() {
            let n = state.ring.read(&mut buf[filled..]);
            if n > 0 {
                filled += n;
                shared.space_ready.notify_one();
                continue;
            }
            if state.ended() {
                break;
            }
            if let Length::Known(len) = state.length {
                if state.ring.read_abs() >= len {
                    break;
                }
            }
            shared.data_ready.wait(&mut state);
        }

        if filled == 0 {
            if let Some(reason) = state.connect_error.clone() {
                return Err(StreamError::ConnectFailed(reason));
            }
        }
        Ok(filled)
    }

    /// Move the read position.
    ///
    /// Targets inside the buffered window only resynchronize the read
    /// cursor; the running transfer continues. Targets outside it cancel
    /// the transfer, and the next `read` restarts it at the target.
    ///
    /// End-relative seeks on a stream of unknown length trigger one
    /// synchronous metadata-only probe; if the length stays unknown the
    /// seek fails with [`StreamError::UnknownLength`].
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(delta) => self.tell() as i128 + delta as i128,
            SeekFrom::End(delta) => self.resolve_length()? as i128 + delta as i128,
        };
        if target < 0 || target > u64::MAX as i128 {
            return Err(StreamError::InvalidSeek(clamp_i64(target)));
        }
        let target = target as u64;
        {
            let state = self.shared.state.lock();
            if let Length::Known(len) = state.length {
                if target > len {
                    return Err(StreamError::InvalidSeek(clamp_i64(target as i128)));
                }
            }
        }

        self.pushback.clear();

        let resynced = {
            let mut state = self.shared.state.lock();
            if state.ring.contains(target) {
                state.ring.set_read_abs(target);
                debug!(target, "Seek resynchronized inside buffered window");
                // Jumping forward may have freed space under a stalled
                // writer; hand it a permit.
                self.shared.space_ready.notify_one();
                true
            } else {
                false
            }
        };

        if !resynced {
            self.cancel_fetch();
            let mut state = self.shared.state.lock();
            state.ring.reset_window(target);
            state.completed = false;
            state.connect_error = None;
            debug!(target, "Seek outside buffered window; transfer will restart");
        }
        Ok(target)
    }

    /// Current read position in absolute stream bytes.
    pub fn tell(&self) -> u64 {
        let read_abs = self.shared.state.lock().ring.read_abs();
        read_abs.saturating_sub(self.pushback.len() as u64)
    }

    /// Total resource length, or `None` while unknown.
    pub fn size(&self) -> Option<u64> {
        match self.shared.state.lock().length {
            Length::Known(len) => Some(len),
            _ => None,
        }
    }

    /// `true` once the read position reached the known length, or the
    /// transfer ended and the buffered window is drained.
    pub fn eof(&self) -> bool {
        if !self.pushback.is_empty() {
            return false;
        }
        let state = self.shared.state.lock();
        let drained_end = state.ended() && state.ring.available_total() == 0;
        match state.length {
            Length::Known(len) => state.ring.read_abs() >= len || drained_end,
            _ => drained_end,
        }
    }

    /// Bytes readable right now without blocking.
    pub fn buffered(&self) -> usize {
        self.pushback.len() + self.shared.state.lock().ring.available_total()
    }

    /// Snapshot of stream metadata (station name, inline track title,
    /// content type, length).
    pub fn metadata(&self) -> StreamMetadata {
        let state = self.shared.state.lock();
        StreamMetadata {
            station_name: state.station_name.clone(),
            track_title: state.track_title.clone(),
            content_type: state.content_type.clone(),
            content_length: match state.length {
                Length::Known(len) => Some(len),
                _ => None,
            },
        }
    }

    /// Read a single byte; `Ok(None)` at end-of-stream.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Push a byte back; it is returned by the next read, before any
    /// buffered data. Cleared by `seek`.
    pub fn unread_byte(&mut self, byte: u8) {
        self.pushback.push(byte);
    }

    /// Seek back to the start of the stream.
    pub fn rewind(&mut self) -> Result<()> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }

    /// Cancel any running transfer and release the stream. Equivalent to
    /// dropping the handle, spelled out for call sites that close
    /// explicitly.
    pub fn close(mut self) {
        self.shutdown();
    }

    /// Ensure a fetch task is running when more data can still arrive.
    fn ensure_fetch(&mut self) -> Result<()> {
        {
            let state = self.shared.state.lock();
            if self.fetch.is_some() || state.failed {
                return Ok(());
            }
            if let Length::Known(len) = state.length {
                if state.ring.read_abs() >= len {
                    return Ok(());
                }
            }
        }
        self.start_fetch()
    }

    fn start_fetch(&mut self) -> Result<()> {
        let start = {
            let mut state = self.shared.state.lock();
            debug_assert!(!state.fetch_active, "overlapping fetch tasks");
            state.completed = false;
            state.connect_error = None;
            state.ring.restart_at_read();
            state.fetch_active = true;
            state.ring.read_abs()
        };
        debug!(start, url = %self.url, "Starting transfer");
        let request = TransferRequest::new(&self.url)
            .resume_from(start)
            .inline_metadata(self.config.inline_metadata);
        match fetch::spawn(
            Arc::clone(&self.transport),
            request,
            self.config.guard_bytes,
            Arc::clone(&self.shared),
        ) {
            Ok(handle) => {
                self.fetch = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.shared.state.lock().fetch_active = false;
                Err(StreamError::Internal(format!(
                    "Failed to spawn fetch thread: {}",
                    e
                )))
            }
        }
    }

    /// Cancel the fetch task and block until it is joined. Never called
    /// with the state lock held.
    fn cancel_fetch(&mut self) {
        if let Some(handle) = self.fetch.take() {
            debug!("Stopping transfer");
            handle.cancel_and_join();
        }
    }

    /// Resolve the total length for an end-relative seek, probing the
    /// server once if it is still unknown.
    fn resolve_length(&mut self) -> Result<u64> {
        {
            let state = self.shared.state.lock();
            match state.length {
                Length::Known(len) => return Ok(len),
                Length::Unavailable => return Err(StreamError::UnknownLength),
                Length::Unknown => {}
            }
        }

        debug!(url = %self.url, "Probing for stream length");
        let probed = crate::rt::block_on(self.transport.probe(&self.url))
            .map_err(|e| StreamError::Internal(format!("Failed to start probe runtime: {}", e)))?;

        let mut state = self.shared.state.lock();
        // The running transfer may have discovered the length meanwhile.
        if let Length::Known(len) = state.length {
            return Ok(len);
        }
        match probed {
            Ok(info) => {
                if state.station_name.is_none() {
                    state.station_name = info.station_name;
                }
                match info.total_length {
                    Some(total) => {
                        state.length = Length::Known(total);
                        Ok(total)
                    }
                    None => {
                        state.length = Length::Unavailable;
                        Err(StreamError::UnknownLength)
                    }
                }
            }
            Err(e) => {
                debug!(error = %e, "Length probe failed");
                state.length = Length::Unavailable;
                Err(StreamError::UnknownLength)
            }
        }
    }

    fn shutdown(&mut self) {
        self.cancel_fetch();
    }
}

impl Drop for RemoteStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl io::Read for RemoteStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        RemoteStream::read(self, buf).map_err(Into::into)
    }
}

impl io::Seek for RemoteStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        RemoteStream::seek(self, pos).map_err(Into::into)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.tell())
    }
}

impl std::fmt::Debug for RemoteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStream")
            .field("url", &self.url)
            .field("position", &self.tell())
            .finish_non_exhaustive()
    }
}

fn clamp_i64(value: i128) -> i64 {
    value.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}
