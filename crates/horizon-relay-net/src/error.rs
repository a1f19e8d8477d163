//! Error types for the transfer engine.
//!
//! Two families exist. [`ConfigError`] is caller misuse detected before any
//! I/O and is the only error an engine call returns as `Err`. Everything that
//! happens once a request has been dispatched is captured as a
//! [`TransferError`] inside the returned result.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::transport::HttpMethod;

/// Caller misuse detected synchronously, before any network activity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A header controlled by the transport layer was supplied by the caller.
    #[error("header `{0}` is reserved and cannot be set by callers")]
    ReservedHeader(String),

    /// A header name or value is not valid HTTP.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The post engine was asked to send a body with a verb that takes none.
    #[error("{0} is not a body-carrying verb; use POST, PUT, DELETE or PATCH")]
    UnsupportedVerb(HttpMethod),

    /// The target URI could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The value handed to `post_object` could not be serialized.
    #[error("failed to serialize request body: {0}")]
    Serialization(String),

    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl From<url::ParseError> for ConfigError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl From<http::header::InvalidHeaderName> for ConfigError {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for ConfigError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

/// Classification of an underlying transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportErrorKind {
    /// No transport failure occurred.
    #[default]
    None,
    /// The exchange did not finish within the call's timeout.
    Timeout,
    /// The host name could not be resolved.
    NameResolutionFailure,
    /// No route to the network (typically airplane mode).
    NetworkUnreachable,
    /// The TCP/TLS connection could not be established.
    ConnectFailure,
    /// The request could not be written.
    SendFailure,
    /// The response could not be read.
    ReceiveFailure,
    /// The peer violated HTTP (bad framing, redirect loop, ...).
    ProtocolError,
    /// The exchange was aborted by cancellation.
    RequestCanceled,
    /// The response arrived but could not be decoded.
    Extraction,
    /// Any other failure.
    Unknown,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Timeout => "timeout",
            Self::NameResolutionFailure => "name resolution failure",
            Self::NetworkUnreachable => "network unreachable",
            Self::ConnectFailure => "connect failure",
            Self::SendFailure => "send failure",
            Self::ReceiveFailure => "receive failure",
            Self::ProtocolError => "protocol error",
            Self::RequestCanceled => "request canceled",
            Self::Extraction => "extraction failure",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Which half of an exchange a transport failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferPhase {
    /// Opening the connection and writing the request (body never delivered).
    Send,
    /// Awaiting and reading the response (sent, but no usable response).
    Receive,
}

impl TransferPhase {
    /// Short tag prefixed to failure messages.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Send => "[send]",
            Self::Receive => "[receive]",
        }
    }
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send => write!(f, "{} request was not sent", self.tag()),
            Self::Receive => write!(f, "{} no usable response", self.tag()),
        }
    }
}

/// A failure captured inside a `TransferResult`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// No completion arrived within the call's timeout.
    #[error("request timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    /// The HTTP exchange itself failed.
    #[error("{phase}: {message}")]
    Transport {
        /// Failure classification.
        kind: TransportErrorKind,
        /// Phase in which the failure happened.
        phase: TransferPhase,
        /// Underlying error text.
        message: String,
    },

    /// The exchange completed with a status the caller must treat as failure.
    #[error("HTTP {status}: {message}")]
    Protocol {
        /// The HTTP status code.
        status: u16,
        /// Descriptive message.
        message: String,
    },

    /// The response arrived but its payload could not be read or decoded.
    #[error("failed to extract response: {0}")]
    Extraction(String),
}

impl TransferError {
    /// The transport classification this error maps to.
    pub fn kind(&self) -> TransportErrorKind {
        match self {
            Self::Timeout(_) => TransportErrorKind::Timeout,
            Self::Transport { kind, .. } => *kind,
            Self::Protocol { .. } => TransportErrorKind::None,
            Self::Extraction(_) => TransportErrorKind::Extraction,
        }
    }
}

/// A specialized Result type for engine calls.
pub type Result<T> = std::result::Result<T, ConfigError>;
