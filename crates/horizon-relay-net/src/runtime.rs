//! The shared tokio runtime behind the blocking engines.
//!
//! The reqwest transport is async, while the engines present a blocking
//! contract. Exchanges are dispatched onto this runtime's blocking pool,
//! which grows with the number of calls in flight, and each drives its
//! request to completion with [`block_on`].

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::OnceLock;

use horizon_relay_core::logging::targets;
use horizon_relay_core::{Dispatcher, Work};
use tokio::runtime::Runtime;

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

fn shared() -> &'static Runtime {
    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("relay-io")
            .enable_all()
            .build()
            .expect("Failed to create tokio runtime")
    })
}

/// Block on a future using the shared runtime.
///
/// Must not be called from within an async context.
pub(crate) fn block_on<F: Future>(future: F) -> F::Output {
    shared().block_on(future)
}

/// Dispatches onto the shared runtime's blocking pool.
///
/// This is the engines' default. A slow exchange holds one blocking thread
/// and never delays the dispatch of other calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeDispatcher;

impl Dispatcher for RuntimeDispatcher {
    fn run(&self, work: Work) {
        // The handle is dropped; work reports through its own call context.
        let _ = shared().spawn_blocking(move || {
            if catch_unwind(AssertUnwindSafe(work)).is_err() {
                tracing::error!(target: targets::DISPATCH, "dispatched work panicked");
            }
        });
    }
}
