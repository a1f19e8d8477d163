//! Per-call state shared between a waiting caller and its background work.
//!
//! A [`CallContext`] is created by one engine call, shared only with the
//! work that call dispatches, and dropped when both are done. The first
//! path to [`claim`](CallContext::claim) it (completion, failure or timeout)
//! produces the result; every later claim fails and its outcome is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use horizon_relay_core::CancellationToken;
use parking_lot::{Condvar, Mutex};

use super::extract::{ExtractionError, Extracted};
use super::headers::{self, ResponseHeaders};
use super::result::{
    CallId, CorrelatedPayload, STATUS_NO_RESPONSE, STATUS_TIMED_OUT, TransferOutcome,
    TransferResult,
};
use crate::error::{TransferError, TransportErrorKind};
use crate::transport::{HttpMethod, TransportFailure};

pub(crate) struct CallContext {
    id: CallId,
    uri: String,
    verb: HttpMethod,
    timeout: Duration,
    started: Instant,
    refresh_header: String,
    correlated: Option<CorrelatedPayload>,
    resolved: AtomicBool,
    slot: Mutex<Option<TransferResult>>,
    ready: Condvar,
    abort: CancellationToken,
}

impl CallContext {
    pub(crate) fn new(
        uri: String,
        verb: HttpMethod,
        timeout: Duration,
        refresh_header: String,
        correlated: Option<CorrelatedPayload>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: CallId::new(),
            uri,
            verb,
            timeout,
            started: Instant::now(),
            refresh_header,
            correlated,
            resolved: AtomicBool::new(false),
            slot: Mutex::new(None),
            ready: Condvar::new(),
            abort: CancellationToken::new(),
        })
    }

    pub(crate) fn id(&self) -> CallId {
        self.id
    }

    pub(crate) fn uri(&self) -> &str {
        &self.uri
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn abort_token(&self) -> &CancellationToken {
        &self.abort
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }

    /// Try to become the path that resolves this call.
    pub(crate) fn claim(&self) -> bool {
        self.resolved
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Hand the result to the waiting caller. Only the claimant calls this.
    pub(crate) fn fulfil(&self, result: TransferResult) {
        let mut slot = self.slot.lock();
        *slot = Some(result);
        self.ready.notify_all();
    }

    /// Wait until the call is fulfilled or its timeout expires.
    pub(crate) fn wait(&self) -> Option<TransferResult> {
        let deadline = self.started + self.timeout;
        let mut slot = self.slot.lock();
        while slot.is_none() {
            if self.ready.wait_until(&mut slot, deadline).timed_out() {
                break;
            }
        }
        slot.take()
    }

    /// Wait for a claimant that has not fulfilled yet.
    pub(crate) fn wait_fulfilled(&self) -> TransferResult {
        let mut slot = self.slot.lock();
        loop {
            if let Some(result) = slot.take() {
                return result;
            }
            self.ready.wait(&mut slot);
        }
    }

    fn base(&self, outcome: TransferOutcome, status_code: i32) -> TransferResult {
        TransferResult {
            call_id: self.id,
            uri: self.uri.clone(),
            verb: self.verb,
            outcome,
            status_code,
            transport_error_kind: TransportErrorKind::None,
            body: None,
            headers: ResponseHeaders::new(),
            expiration: DateTime::<Utc>::MIN_UTC,
            attempt_refresh_at: DateTime::<Utc>::MIN_UTC,
            downloaded_at: Utc::now(),
            elapsed: self.started.elapsed(),
            message: None,
            error: None,
            correlated_payload: self.correlated.clone(),
        }
    }

    fn with_headers(
        mut result: TransferResult,
        headers: ResponseHeaders,
        refresh_header: &str,
    ) -> TransferResult {
        result.expiration = headers::expiration(&headers);
        result.attempt_refresh_at =
            headers::attempt_refresh_at(&headers, refresh_header, result.downloaded_at);
        result.headers = headers;
        result
    }

    pub(crate) fn timed_out(&self) -> TransferResult {
        let error = TransferError::Timeout(self.timeout);
        let mut result = self.base(TransferOutcome::TimedOut, STATUS_TIMED_OUT);
        result.transport_error_kind = TransportErrorKind::Timeout;
        result.message = Some(format!(
            "{} {} timed out after {} ms",
            self.verb,
            self.uri,
            self.timeout.as_millis()
        ));
        result.error = Some(error);
        result
    }

    pub(crate) fn transport_failed(&self, failure: TransportFailure) -> TransferResult {
        // A transport-level deadline is the same timeout the caller waits on.
        if failure.kind == TransportErrorKind::Timeout {
            return self.timed_out();
        }

        let error = TransferError::Transport {
            kind: failure.kind,
            phase: failure.phase,
            message: failure.message,
        };
        let mut result = self.base(TransferOutcome::TransportFailed, STATUS_NO_RESPONSE);
        result.transport_error_kind = failure.kind;
        result.message = Some(error.to_string());
        result.error = Some(error);
        result
    }

    pub(crate) fn extraction_failed(&self, err: ExtractionError) -> TransferResult {
        let error = TransferError::Extraction(err.to_string());
        let mut result = self.base(TransferOutcome::TransportFailed, i32::from(err.status));
        result.transport_error_kind = TransportErrorKind::Extraction;
        result.message = Some(error.to_string());
        result.error = Some(error);
        Self::with_headers(result, err.headers, &self.refresh_header)
    }

    pub(crate) fn completed(&self, extracted: Extracted) -> TransferResult {
        let mut result = self.base(TransferOutcome::Completed, i32::from(extracted.status));
        result.body = Some((extracted.bytes, extracted.text));
        Self::with_headers(result, extracted.headers, &self.refresh_header)
    }

    pub(crate) fn protocol_failed(&self, extracted: Extracted, description: String) -> TransferResult {
        let status = extracted.status;
        let mut result = self.base(TransferOutcome::ProtocolFailed, i32::from(status));
        result.body = Some((extracted.bytes, extracted.text));
        result.message = Some(format!(
            "{} {} returned HTTP {}: {}",
            self.verb, self.uri, status, description
        ));
        result.error = Some(TransferError::Protocol {
            status,
            message: description,
        });
        Self::with_headers(result, extracted.headers, &self.refresh_header)
    }
}

impl std::fmt::Debug for CallContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallContext")
            .field("id", &self.id)
            .field("uri", &self.uri)
            .field("verb", &self.verb)
            .field("timeout", &self.timeout)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransferPhase;

    fn context(timeout: Duration) -> Arc<CallContext> {
        CallContext::new(
            "http://example.test/a".into(),
            HttpMethod::Get,
            timeout,
            "X-Attempt-Refresh-At".into(),
            None,
        )
    }

    #[test]
    fn test_only_first_claim_wins() {
        let ctx = context(Duration::from_secs(1));
        assert!(ctx.claim());
        assert!(!ctx.claim());
        assert!(ctx.is_resolved());
    }

    #[test]
    fn test_wait_returns_fulfilled_result() {
        let ctx = context(Duration::from_secs(5));
        let worker = ctx.clone();
        std::thread::spawn(move || {
            assert!(worker.claim());
            let result = worker.timed_out();
            worker.fulfil(result);
        });

        let result = ctx.wait().expect("fulfilled before deadline");
        assert_eq!(result.call_id(), ctx.id());
    }

    #[test]
    fn test_wait_expires() {
        let ctx = context(Duration::from_millis(30));
        let start = Instant::now();
        assert!(ctx.wait().is_none());
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_timed_out_result() {
        let ctx = context(Duration::from_millis(100));
        let result = ctx.timed_out();
        assert_eq!(result.status_code(), STATUS_TIMED_OUT);
        assert_eq!(result.outcome(), TransferOutcome::TimedOut);
        assert!(result.message().unwrap().contains("timed out"));
        assert!(result.body_bytes().is_none());
        assert!(result.body_text().is_none());
        assert_eq!(result.expiration(), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn test_transport_timeout_maps_to_timed_out() {
        let ctx = context(Duration::from_millis(100));
        let result = ctx.transport_failed(TransportFailure::new(
            TransportErrorKind::Timeout,
            TransferPhase::Receive,
            "operation timed out",
        ));
        assert!(result.is_timed_out());
        assert_eq!(result.status_code(), STATUS_TIMED_OUT);
    }

    #[test]
    fn test_transport_failure_has_no_status() {
        let ctx = context(Duration::from_millis(100));
        let result = ctx.transport_failed(TransportFailure::new(
            TransportErrorKind::ConnectFailure,
            TransferPhase::Send,
            "connection refused",
        ));
        assert_eq!(result.status_code(), STATUS_NO_RESPONSE);
        assert_eq!(result.transport_error_kind(), TransportErrorKind::ConnectFailure);
        assert!(result.message().unwrap().starts_with("[send]"));
    }
}
