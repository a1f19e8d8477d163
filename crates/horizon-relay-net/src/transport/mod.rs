//! Transport abstraction for pluggable HTTP backends.
//!
//! A [`Transport`] performs one HTTP exchange synchronously on the thread it
//! is called from. The engines call it from dispatched background work, never
//! from the caller's thread, and hand it a [`CancellationToken`] that is
//! cancelled when the caller stops waiting. Honouring the token is optional.
//!
//! # Implementations
//!
//! - [`ReqwestTransport`]: Production implementation using `reqwest`
//! - Mock implementations for testing

mod reqwest_transport;

use std::time::Duration;

use bytes::Bytes;
use horizon_relay_core::CancellationToken;
use url::Url;

use crate::error::{TransferPhase, TransportErrorKind};
use crate::transfer::ResponseHeaders;

pub use reqwest_transport::ReqwestTransport;

/// HTTP request methods supported by the engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP GET method.
    Get,
    /// HTTP POST method.
    Post,
    /// HTTP PUT method.
    Put,
    /// HTTP DELETE method.
    Delete,
    /// HTTP PATCH method.
    Patch,
}

impl HttpMethod {
    /// Convert to reqwest method.
    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
            Self::Patch => reqwest::Method::PATCH,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Patch => write!(f, "PATCH"),
        }
    }
}

/// A fully validated request handed to a [`Transport`].
#[derive(Clone, Debug)]
pub struct TransportRequest {
    /// The HTTP method.
    pub method: HttpMethod,
    /// The target URL.
    pub url: Url,
    /// Caller headers, already checked against the reserved list.
    pub headers: Vec<(http::HeaderName, http::HeaderValue)>,
    /// Request body, if any.
    pub body: Option<Bytes>,
    /// Content type of the body, if any.
    pub content_type: Option<http::HeaderValue>,
    /// Deadline for the whole exchange; the same value bounds the caller's wait.
    pub timeout: Duration,
}

/// A completed exchange whose body has been read but not decoded.
#[derive(Clone, Debug)]
pub struct TransportResponse {
    /// The HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: ResponseHeaders,
    /// Raw body bytes, still content-encoded.
    pub body: Bytes,
}

/// A failed exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportFailure {
    /// Failure classification.
    pub kind: TransportErrorKind,
    /// Phase in which the exchange failed.
    pub phase: TransferPhase,
    /// Underlying error text.
    pub message: String,
}

impl TransportFailure {
    /// Create a new failure.
    pub fn new(kind: TransportErrorKind, phase: TransferPhase, message: impl Into<String>) -> Self {
        Self {
            kind,
            phase,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.phase.tag(), self.kind, self.message)
    }
}

/// Trait for pluggable, blocking HTTP transports.
pub trait Transport: Send + Sync {
    /// Perform one exchange.
    ///
    /// `abort` is cancelled if the caller stops waiting. Implementations
    /// should stop early when they can; a failure reported after an abort is
    /// discarded by the engine.
    fn execute(
        &self,
        request: TransportRequest,
        abort: &CancellationToken,
    ) -> Result<TransportResponse, TransportFailure>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn execute(
        &self,
        request: TransportRequest,
        abort: &CancellationToken,
    ) -> Result<TransportResponse, TransportFailure> {
        (**self).execute(request, abort)
    }
}
