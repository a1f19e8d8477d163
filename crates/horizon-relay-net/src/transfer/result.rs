//! The normalized outcome of one transfer.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::headers::ResponseHeaders;
use crate::error::{TransferError, TransportErrorKind};
use crate::transport::HttpMethod;

/// Status code reported when no completion arrived within the timeout.
pub const STATUS_TIMED_OUT: i32 = -1;

/// Status code reported when the exchange failed before any HTTP status was obtained.
pub const STATUS_NO_RESPONSE: i32 = -2;

/// Unique identifier for one call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(u64);

impl CallId {
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Terminal state of a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransferOutcome {
    /// The exchange succeeded with an accepted status.
    Completed,
    /// The exchange completed but the status signals an application problem.
    ProtocolFailed,
    /// The exchange itself failed, or its payload could not be extracted.
    TransportFailed,
    /// No completion arrived within the timeout.
    TimedOut,
}

/// The value serialized by `post_object`, carried back to the caller.
#[derive(Clone)]
pub struct CorrelatedPayload {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl CorrelatedPayload {
    /// Wrap a value.
    pub fn new<V: Any + Send + Sync>(value: V) -> Self {
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<V>(),
        }
    }

    /// Borrow the value if it has type `V`.
    pub fn downcast_ref<V: Any>(&self) -> Option<&V> {
        self.value.downcast_ref()
    }

    /// Name of the wrapped type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl std::fmt::Debug for CorrelatedPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CorrelatedPayload").field(&self.type_name).finish()
    }
}

/// The outcome of one fetch or post call.
///
/// Built exactly once when the call resolves and never mutated afterwards.
/// Every call produces one, whatever happened on the network.
#[derive(Clone, Debug)]
pub struct TransferResult {
    pub(crate) call_id: CallId,
    pub(crate) uri: String,
    pub(crate) verb: HttpMethod,
    pub(crate) outcome: TransferOutcome,
    pub(crate) status_code: i32,
    pub(crate) transport_error_kind: TransportErrorKind,
    pub(crate) body: Option<(Bytes, String)>,
    pub(crate) headers: ResponseHeaders,
    pub(crate) expiration: DateTime<Utc>,
    pub(crate) attempt_refresh_at: DateTime<Utc>,
    pub(crate) downloaded_at: DateTime<Utc>,
    pub(crate) elapsed: Duration,
    pub(crate) message: Option<String>,
    pub(crate) error: Option<TransferError>,
    pub(crate) correlated_payload: Option<CorrelatedPayload>,
}

impl TransferResult {
    /// The call this result belongs to.
    pub fn call_id(&self) -> CallId {
        self.call_id
    }

    /// The URI that was requested.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The HTTP verb that was used.
    pub fn verb(&self) -> HttpMethod {
        self.verb
    }

    /// The terminal state of the call.
    pub fn outcome(&self) -> TransferOutcome {
        self.outcome
    }

    /// The HTTP status, or [`STATUS_TIMED_OUT`] / [`STATUS_NO_RESPONSE`].
    pub fn status_code(&self) -> i32 {
        self.status_code
    }

    /// Classification of the transport failure, if any.
    pub fn transport_error_kind(&self) -> TransportErrorKind {
        self.transport_error_kind
    }

    /// Decoded body bytes. Present exactly when [`body_text`](Self::body_text) is.
    pub fn body_bytes(&self) -> Option<&Bytes> {
        self.body.as_ref().map(|(bytes, _)| bytes)
    }

    /// Decoded body text. Present exactly when [`body_bytes`](Self::body_bytes) is.
    pub fn body_text(&self) -> Option<&str> {
        self.body.as_ref().map(|(_, text)| text.as_str())
    }

    /// All response headers.
    pub fn headers(&self) -> &ResponseHeaders {
        &self.headers
    }

    /// A response header, looked up case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// The `Expires` instant, or the minimum UTC instant.
    pub fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }

    /// The refresh-hint instant, or the minimum UTC instant.
    pub fn attempt_refresh_at(&self) -> DateTime<Utc> {
        self.attempt_refresh_at
    }

    /// When the call resolved.
    pub fn downloaded_at(&self) -> DateTime<Utc> {
        self.downloaded_at
    }

    /// Time between dispatch and resolution.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Human-readable description of a failure.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The captured failure, if any.
    pub fn error(&self) -> Option<&TransferError> {
        self.error.as_ref()
    }

    /// The value a `post_object` call serialized.
    pub fn correlated_payload(&self) -> Option<&CorrelatedPayload> {
        self.correlated_payload.as_ref()
    }

    /// The correlated value, if present and of type `V`.
    pub fn correlated<V: Any>(&self) -> Option<&V> {
        self.correlated_payload.as_ref()?.downcast_ref()
    }

    /// Whether the call completed with an accepted status.
    pub fn is_success(&self) -> bool {
        self.outcome == TransferOutcome::Completed
    }

    /// Whether the call timed out.
    pub fn is_timed_out(&self) -> bool {
        self.outcome == TransferOutcome::TimedOut
    }
}

static_assertions::assert_impl_all!(TransferResult: Send, Sync, Clone);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_ids_are_unique() {
        let a = CallId::new();
        let b = CallId::new();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn test_correlated_payload_downcast() {
        let payload = CorrelatedPayload::new(vec![1u8, 2, 3]);
        assert_eq!(payload.downcast_ref::<Vec<u8>>(), Some(&vec![1, 2, 3]));
        assert!(payload.downcast_ref::<String>().is_none());
        assert!(payload.type_name().contains("Vec"));
    }
}
