//! Reqwest-based transport.
//!
//! The exchange runs on the shared tokio runtime and is raced against the
//! abort token, so a caller that gives up releases the worker promptly.

use std::error::Error as StdError;

use horizon_relay_core::CancellationToken;
use horizon_relay_core::logging::targets;
use http::HeaderMap;
use http::header::CONTENT_TYPE;
use reqwest::redirect::Policy;

use super::{Transport, TransportFailure, TransportRequest, TransportResponse};
use crate::config::TransferConfig;
use crate::error::{ConfigError, TransferPhase, TransportErrorKind};
use crate::runtime;
use crate::transfer::ResponseHeaders;

/// A [`Transport`] backed by an async [`reqwest::Client`].
///
/// The client is cheaply cloneable; clones share one connection pool.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestTransport {
    /// Create a transport with default configuration.
    pub fn new() -> Self {
        Self::from_config(&TransferConfig::default())
            .expect("Failed to create HTTP client with default configuration")
    }

    /// Create a transport from an engine configuration.
    pub fn from_config(config: &TransferConfig) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder();

        if let Some(connect_timeout) = config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        if config.follow_redirects {
            builder = builder.redirect(Policy::limited(config.max_redirects));
        } else {
            builder = builder.redirect(Policy::none());
        }

        if let Some(ref ua) = config.user_agent {
            builder = builder.user_agent(ua);
        }

        let client = builder
            .build()
            .map_err(|e| ConfigError::Client(error_chain(&e)))?;

        Ok(Self { client })
    }

    /// Wrap an existing reqwest client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn execute(
        &self,
        request: TransportRequest,
        abort: &CancellationToken,
    ) -> Result<TransportResponse, TransportFailure> {
        let TransportRequest {
            method,
            url,
            headers,
            body,
            content_type,
            timeout,
        } = request;

        let mut header_map = HeaderMap::with_capacity(headers.len() + 1);
        for (name, value) in headers {
            header_map.append(name, value);
        }
        if let Some(content_type) = content_type {
            header_map.insert(CONTENT_TYPE, content_type);
        }

        let mut req_builder = self
            .client
            .request(method.to_reqwest(), url)
            .timeout(timeout)
            .headers(header_map);
        if let Some(body) = body {
            req_builder = req_builder.body(body);
        }

        let exchange = async move {
            let response = req_builder
                .send()
                .await
                .map_err(|e| classify(&e, TransferPhase::Send))?;

            let status = response.status().as_u16();
            let headers = ResponseHeaders::from(response.headers());
            let body = response
                .bytes()
                .await
                .map_err(|e| classify(&e, TransferPhase::Receive))?;

            Ok(TransportResponse {
                status,
                headers,
                body,
            })
        };

        runtime::block_on(async {
            tokio::select! {
                result = exchange => result,
                _ = abort.cancelled() => {
                    tracing::debug!(target: targets::TRANSPORT, "exchange aborted");
                    Err(TransportFailure::new(
                        TransportErrorKind::RequestCanceled,
                        TransferPhase::Receive,
                        "the request was aborted",
                    ))
                }
            }
        })
    }
}

/// Map a reqwest error onto the transport taxonomy.
///
/// `phase` is where the error surfaced; connect failures are always
/// attributed to the send phase.
fn classify(err: &reqwest::Error, phase: TransferPhase) -> TransportFailure {
    let message = error_chain(err);

    if err.is_timeout() {
        let phase = if err.is_connect() { TransferPhase::Send } else { phase };
        return TransportFailure::new(TransportErrorKind::Timeout, phase, message);
    }

    if err.is_connect() {
        let lower = message.to_ascii_lowercase();
        let kind = if ["dns error", "failed to lookup address", "name or service not known", "no such host"]
            .iter()
            .any(|pattern| lower.contains(pattern))
        {
            TransportErrorKind::NameResolutionFailure
        } else if lower.contains("unreachable") {
            TransportErrorKind::NetworkUnreachable
        } else {
            TransportErrorKind::ConnectFailure
        };
        return TransportFailure::new(kind, TransferPhase::Send, message);
    }

    let kind = if err.is_redirect() {
        TransportErrorKind::ProtocolError
    } else if err.is_body() || err.is_decode() {
        TransportErrorKind::ReceiveFailure
    } else if err.is_request() || err.is_builder() {
        TransportErrorKind::SendFailure
    } else {
        TransportErrorKind::Unknown
    };
    TransportFailure::new(kind, phase, message)
}

/// Render an error and all of its sources as one line.
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::transport::HttpMethod;

    #[test]
    fn test_from_config() {
        let config = TransferConfig::builder()
            .user_agent("RelayTest/1.0")
            .no_redirects()
            .build();
        assert!(ReqwestTransport::from_config(&config).is_ok());
    }

    #[test]
    fn test_connection_refused_is_send_phase() {
        // Bind then drop to find a port with nothing listening.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let transport = ReqwestTransport::new();
        let request = TransportRequest {
            method: HttpMethod::Get,
            url: format!("http://127.0.0.1:{port}/").parse().unwrap(),
            headers: Vec::new(),
            body: None,
            content_type: None,
            timeout: Duration::from_secs(5),
        };

        let failure = transport
            .execute(request, &CancellationToken::new())
            .unwrap_err();
        assert_eq!(failure.phase, TransferPhase::Send);
        assert_eq!(failure.kind, TransportErrorKind::ConnectFailure);
    }

    #[test]
    fn test_abort_stops_exchange() {
        // Accepts connections (via the backlog) but never answers.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let transport = ReqwestTransport::new();
        let request = TransportRequest {
            method: HttpMethod::Get,
            url: format!("http://127.0.0.1:{port}/").parse().unwrap(),
            headers: Vec::new(),
            body: None,
            content_type: None,
            timeout: Duration::from_secs(30),
        };

        let abort = CancellationToken::new();
        let trigger = abort.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            trigger.cancel();
        });

        let start = std::time::Instant::now();
        let failure = transport.execute(request, &abort).unwrap_err();
        assert_eq!(failure.kind, TransportErrorKind::RequestCanceled);
        assert!(start.elapsed() < Duration::from_secs(5));
        drop(listener);
    }
}
