//! # Background Fetch Task
//!
//! One task per active transfer. The task owns a dedicated thread running
//! a current-thread runtime, pulls ordered chunks from the transport,
//! strips inline metadata, and deposits audio bytes into the ring,
//! waiting for space as needed.
//!
//! Exit paths: natural completion, mid-transfer error (absorbed — the
//! reader drains what arrived, then sees end-of-stream), and cooperative
//! cancellation. Cancellation drops the in-flight transfer future, which
//! aborts the underlying connection, so joining completes in bounded
//! time.

use crate::icy::IcyInterceptor;
use crate::stream::{Length, Shared};
use bytes::Bytes;
use std::sync::Arc;
use std::thread;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use transport_traits::{ByteStream, ByteTransport, TransferRequest};

pub(crate) struct FetchHandle {
    thread: thread::JoinHandle<()>,
    cancel: CancellationToken,
}

impl FetchHandle {
    /// Request cancellation and block until the task thread exits.
    pub(crate) fn cancel_and_join(self) {
        self.cancel.cancel();
        if self.thread.join().is_err() {
            warn!("Fetch thread panicked during shutdown");
        }
    }
}

/// Spawn a fetch task delivering into `shared` from `request.resume_from`.
pub(crate) fn spawn(
    transport: Arc<dyn ByteTransport>,
    request: TransferRequest,
    guard: usize,
    shared: Arc<Shared>,
) -> std::io::Result<FetchHandle> {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let thread = thread::Builder::new()
        .name("stream-fetch".to_string())
        .spawn(move || match crate::rt::runtime() {
            Ok(rt) => rt.block_on(run(transport, request, guard, shared, token)),
            Err(e) => {
                warn!(error = %e, "Failed to start fetch runtime");
                {
                    let mut state = shared.state.lock();
                    state.connect_error = Some(format!("Failed to start fetch runtime: {}", e));
                    state.failed = true;
                }
                finish(&shared);
            }
        })?;
    Ok(FetchHandle { thread, cancel })
}

#[instrument(skip_all, fields(url = %request.url, start = request.resume_from))]
async fn run(
    transport: Arc<dyn ByteTransport>,
    request: TransferRequest,
    guard: usize,
    shared: Arc<Shared>,
    cancel: CancellationToken,
) {
    let mut stream = tokio::select! {
        _ = cancel.cancelled() => {
            debug!("Cancelled before the transfer was established");
            finish(&shared);
            return;
        }
        result = transport.begin(request) => match result {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "Failed to establish transfer");
                {
                    let mut state = shared.state.lock();
                    state.connect_error = Some(e.to_string());
                    state.failed = true;
                }
                finish(&shared);
                return;
            }
        }
    };

    // Response metadata is available as soon as the transfer stands,
    // independent of how many bytes the reader has consumed.
    let mut icy = {
        let info = stream.info();
        let mut state = shared.state.lock();
        if let Some(total) = info.total_length {
            if !matches!(state.length, Length::Known(_)) {
                state.length = Length::Known(total);
            }
        }
        if let Some(name) = &info.station_name {
            state.station_name = Some(name.clone());
        }
        if let Some(kind) = &info.content_type {
            state.content_type = Some(kind.clone());
        }
        // Strip inline metadata whenever the server interleaves it;
        // ring offsets must count audio bytes only.
        info.metadata_interval.map(IcyInterceptor::new)
    };

    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Transfer cancelled");
                break;
            }
            chunk = stream.next_chunk() => chunk,
        };

        match chunk {
            Ok(Some(bytes)) => {
                let (audio, title) = match &mut icy {
                    Some(icy) => {
                        let split = icy.split(bytes);
                        (split.audio, split.title)
                    }
                    None => (vec![bytes], None),
                };
                if let Some(title) = title {
                    debug!(title = %title, "Inline metadata update");
                    shared.state.lock().track_title = Some(title);
                }
                if deposit(&shared, &cancel, audio, guard).await == Deposit::Cancelled {
                    debug!("Transfer cancelled while waiting for buffer space");
                    break;
                }
            }
            Ok(None) => {
                let mut state = shared.state.lock();
                state.completed = true;
                if matches!(state.length, Length::Unknown) {
                    // A transfer that ends cleanly defines the length.
                    state.length = Length::Known(state.ring.write_abs());
                }
                info!(total = state.ring.write_abs(), "Transfer complete");
                break;
            }
            Err(e) => {
                // Absorbed: the reader drains the buffered window, then
                // sees end-of-stream instead of a hard error.
                warn!(error = %e, "Transfer failed mid-stream");
                shared.state.lock().failed = true;
                break;
            }
        }
    }

    finish(&shared);
}

#[derive(PartialEq)]
enum Deposit {
    Complete,
    Cancelled,
}

/// Deposit audio segments into the ring, waiting for space between
/// bounded copies.
async fn deposit(
    shared: &Shared,
    cancel: &CancellationToken,
    segments: Vec<Bytes>,
    guard: usize,
) -> Deposit {
    for segment in segments {
        let mut data = &segment[..];
        while !data.is_empty() {
            let wrote = {
                let mut state = shared.state.lock();
                let n = state.ring.write(data, guard);
                if n > 0 {
                    shared.data_ready.notify_all();
                }
                n
            };
            if wrote == 0 {
                tokio::select! {
                    _ = cancel.cancelled() => return Deposit::Cancelled,
                    _ = shared.space_ready.notified() => {}
                }
                continue;
            }
            data = &data[wrote..];
        }
    }
    Deposit::Complete
}

/// Mark the task inactive and wake any blocked reader so it can observe
/// the final state.
fn finish(shared: &Shared) {
    shared.state.lock().fetch_active = false;
    shared.data_ready.notify_all();
}
