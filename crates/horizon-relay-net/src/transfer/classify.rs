//! Status acceptance and log-level classification of resolved transfers.

use horizon_relay_core::logging::targets;

use super::result::{TransferOutcome, TransferResult};
use crate::error::{TransferError, TransportErrorKind};

/// Which statuses count as success for a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StatusPolicy {
    /// Reads: an empty 204 usually means the resource is missing.
    Fetch,
    /// Mutations: 204 is a normal terminal state.
    Post,
}

impl StatusPolicy {
    pub(crate) fn accepts(self, status: u16) -> bool {
        match self {
            Self::Fetch => matches!(status, 200..=202),
            Self::Post => matches!(status, 200..=202 | 204),
        }
    }
}

/// Describe a status the policy rejected.
pub(crate) fn describe_status(status: u16) -> String {
    match status {
        204 => "no content returned".to_string(),
        304 => "not modified".to_string(),
        401 => "unauthorized, the session may have expired".to_string(),
        500 => "internal server error".to_string(),
        503 => "service unavailable".to_string(),
        other => http::StatusCode::from_u16(other)
            .ok()
            .and_then(|code| code.canonical_reason())
            .map(|reason| reason.to_ascii_lowercase())
            .unwrap_or_else(|| "unexpected status".to_string()),
    }
}

// Matched against the transport's own failure text, never the URI.
const INFORMATIONAL_PATTERNS: &[&str] = &[
    "network unreachable",
    "network is unreachable",
    "host unreachable",
    "no route to host",
    "connect failure",
    "connection refused",
    "name resolution",
    "failed to lookup address",
    "dns error",
];

/// Whether a failure is expected and transient (offline, DNS, not modified).
pub(crate) fn is_informational(result: &TransferResult) -> bool {
    if matches!(
        result.transport_error_kind(),
        TransportErrorKind::NetworkUnreachable
            | TransportErrorKind::ConnectFailure
            | TransportErrorKind::NameResolutionFailure
    ) {
        return true;
    }
    if result.status_code() == 304 {
        return true;
    }
    let Some(TransferError::Transport { message, .. }) = result.error() else {
        return false;
    };
    // Client errors often quote the request URL.
    let message = message.replace(result.uri(), "").to_ascii_lowercase();
    INFORMATIONAL_PATTERNS
        .iter()
        .any(|pattern| message.contains(pattern))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

fn level_for(result: &TransferResult) -> LogLevel {
    match result.outcome() {
        TransferOutcome::Completed => LogLevel::Debug,
        TransferOutcome::TimedOut => LogLevel::Warn,
        TransferOutcome::ProtocolFailed if result.status_code() == 304 => LogLevel::Info,
        TransferOutcome::ProtocolFailed => LogLevel::Warn,
        TransferOutcome::TransportFailed if is_informational(result) => LogLevel::Info,
        TransferOutcome::TransportFailed => LogLevel::Error,
    }
}

macro_rules! log_with_target {
    ($target:expr, $level:expr, $result:expr) => {{
        let result = $result;
        let message = result.message().unwrap_or("ok");
        match $level {
            LogLevel::Debug => tracing::debug!(
                target: $target,
                call = %result.call_id(),
                verb = %result.verb(),
                uri = result.uri(),
                status = result.status_code(),
                elapsed_ms = result.elapsed().as_millis() as u64,
                "transfer completed"
            ),
            LogLevel::Info => tracing::info!(
                target: $target,
                call = %result.call_id(),
                uri = result.uri(),
                status = result.status_code(),
                kind = %result.transport_error_kind(),
                "{}", message
            ),
            LogLevel::Warn => tracing::warn!(
                target: $target,
                call = %result.call_id(),
                uri = result.uri(),
                status = result.status_code(),
                "{}", message
            ),
            LogLevel::Error => tracing::error!(
                target: $target,
                call = %result.call_id(),
                uri = result.uri(),
                status = result.status_code(),
                kind = %result.transport_error_kind(),
                "{}", message
            ),
        }
    }};
}

/// Log a resolved result at the level its classification calls for.
pub(crate) fn log_result(result: &TransferResult, policy: StatusPolicy) {
    let level = level_for(result);
    match policy {
        StatusPolicy::Fetch => log_with_target!(targets::FETCH, level, result),
        StatusPolicy::Post => log_with_target!(targets::POST, level, result),
    }
}
