//! Single-threaded runtime helpers for driving the async transport from
//! blocking call sites (the fetch thread, the synchronous length probe).

use std::future::Future;

pub(crate) fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

/// Drive a future to completion on a throwaway current-thread runtime.
///
/// Must not be called from inside an async runtime; the public stream API
/// is a blocking one and documents that contract.
pub(crate) fn block_on<F: Future>(future: F) -> std::io::Result<F::Output> {
    Ok(runtime()?.block_on(future))
}
