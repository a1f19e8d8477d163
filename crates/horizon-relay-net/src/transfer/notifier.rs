//! Publication of resolved transfers to passive observers.
//!
//! # Example
//!
//! ```ignore
//! use horizon_relay_net::{EngineBuilder, TransferNotifier};
//!
//! let notifier = TransferNotifier::new();
//!
//! // Session-expiry watcher.
//! notifier.on_abnormal_response().connect(|result| {
//!     if result.status_code() == 401 {
//!         println!("session expired while calling {}", result.uri());
//!     }
//! });
//!
//! let engine = EngineBuilder::new().notifier(notifier.clone()).build_fetch()?;
//! ```

use std::sync::Arc;

use horizon_relay_core::Signal;
use horizon_relay_core::logging::targets;

use super::result::{TransferOutcome, TransferResult};

struct NotifierInner {
    resolved: Signal<TransferResult>,
    abnormal_response: Signal<TransferResult>,
}

/// A shared observer point for every resolved transfer.
///
/// Constructed explicitly and handed to each engine. Clones share the same
/// connections, so any party holding a clone observes every result
/// published by any engine built with it.
#[derive(Clone)]
pub struct TransferNotifier {
    inner: Arc<NotifierInner>,
}

impl Default for TransferNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferNotifier {
    /// Create a notifier with no observers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(NotifierInner {
                resolved: Signal::new(),
                abnormal_response: Signal::new(),
            }),
        }
    }

    /// Signal emitted with every resolved result, whatever its outcome.
    pub fn on_resolved(&self) -> &Signal<TransferResult> {
        &self.inner.resolved
    }

    /// Signal emitted when a service responded abnormally (protocol failure).
    pub fn on_abnormal_response(&self) -> &Signal<TransferResult> {
        &self.inner.abnormal_response
    }

    /// Publish a resolved result to all observers.
    ///
    /// Engines call this after the caller has its result, from the worker
    /// that resolved the call or, for timeouts, from a dispatched unit.
    /// Each observer is isolated: one that panics is logged and the others,
    /// on both signals, still run.
    pub fn publish(&self, result: &TransferResult) {
        let mut panicked = self.inner.resolved.emit(result.clone());
        if result.outcome() == TransferOutcome::ProtocolFailed {
            panicked += self.inner.abnormal_response.emit(result.clone());
        }

        if panicked > 0 {
            tracing::error!(
                target: targets::NOTIFY,
                call = %result.call_id(),
                uri = result.uri(),
                panicked,
                "transfer observer panicked"
            );
        }
    }
}

impl std::fmt::Debug for TransferNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferNotifier")
            .field("resolved", &self.inner.resolved.connection_count())
            .field("abnormal_response", &self.inner.abnormal_response.connection_count())
            .finish()
    }
}
