//! Bounded POST, PUT, DELETE and PATCH transfers.

use std::any::Any;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;

use super::classify::StatusPolicy;
use super::engine::{EngineBuilder, EngineCore};
use super::notifier::TransferNotifier;
use super::request::{FORM_URLENCODED, PostRequest, Prepared};
use super::result::{CorrelatedPayload, TransferResult};
use super::serializer::{ObjectSerializer, XmlSerializer};
use crate::config::TransferConfig;
use crate::error::Result;

/// Content type used by `post_bytes` when none is given.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Sends request bodies and blocks the caller for a bounded time.
///
/// 200, 201, 202 and 204 complete a call. Transport failure messages are
/// tagged `[send]` when the request never went out and `[receive]` when it
/// was sent but no usable response came back.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use horizon_relay_net::{HttpMethod, PostEngine, PostRequest};
///
/// #[derive(serde::Serialize)]
/// struct Reading {
///     sensor: String,
///     value: i32,
/// }
///
/// let engine = PostEngine::new();
/// let request = PostRequest::new("https://example.com/readings").verb(HttpMethod::Put);
/// let reading = Reading { sensor: "t1".into(), value: 7 };
///
/// let result = engine.post_object(&request, reading, Duration::from_secs(5))?;
/// let sent: &Reading = result.correlated().unwrap();
/// println!("{} stored: {}", sent.sensor, result.is_success());
/// # Ok::<(), horizon_relay_net::ConfigError>(())
/// ```
#[derive(Clone, Debug)]
pub struct PostEngine {
    core: EngineCore,
}

impl Default for PostEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PostEngine {
    /// Create an engine with default collaborators.
    pub fn new() -> Self {
        EngineBuilder::new()
            .build_post()
            .expect("Failed to create post engine with default configuration")
    }

    /// Create a builder.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub(crate) fn from_core(core: EngineCore) -> Self {
        Self { core }
    }

    /// Send raw bytes, waiting at most `timeout`.
    ///
    /// The content type defaults to `application/octet-stream`.
    pub fn post_bytes(
        &self,
        request: &PostRequest,
        body: impl Into<Bytes>,
        timeout: Duration,
    ) -> Result<TransferResult> {
        self.send(
            request,
            body.into(),
            OCTET_STREAM,
            request.correlated_payload(),
            timeout,
        )
    }

    /// Send text, waiting at most `timeout`.
    ///
    /// The content type defaults to `application/x-www-form-urlencoded`.
    pub fn post_string(
        &self,
        request: &PostRequest,
        text: impl Into<String>,
        timeout: Duration,
    ) -> Result<TransferResult> {
        let body = Bytes::from(text.into());
        self.send(
            request,
            body,
            FORM_URLENCODED,
            request.correlated_payload(),
            timeout,
        )
    }

    /// Serialize `value` as XML and send it, waiting at most `timeout`.
    ///
    /// The content type defaults to `application/xml`. The result carries
    /// `value` as its correlated payload.
    pub fn post_object<V>(
        &self,
        request: &PostRequest,
        value: V,
        timeout: Duration,
    ) -> Result<TransferResult>
    where
        V: Serialize + Any + Send + Sync,
    {
        self.post_object_with(&XmlSerializer, request, value, timeout)
    }

    /// Serialize `value` with `serializer` and send it, waiting at most `timeout`.
    ///
    /// The content type defaults to the serializer's.
    pub fn post_object_with<S, V>(
        &self,
        serializer: &S,
        request: &PostRequest,
        value: V,
        timeout: Duration,
    ) -> Result<TransferResult>
    where
        S: ObjectSerializer,
        V: Serialize + Any + Send + Sync,
    {
        let prepared = request.prepare(self.core.config(), serializer.content_type())?;
        let body = Bytes::from(serializer.serialize(&value)?);
        Ok(self.execute(
            request,
            prepared,
            body,
            Some(CorrelatedPayload::new(value)),
            timeout,
        ))
    }

    fn send(
        &self,
        request: &PostRequest,
        body: Bytes,
        default_content_type: &str,
        correlated: Option<CorrelatedPayload>,
        timeout: Duration,
    ) -> Result<TransferResult> {
        let prepared = request.prepare(self.core.config(), default_content_type)?;
        Ok(self.execute(request, prepared, body, correlated, timeout))
    }

    fn execute(
        &self,
        request: &PostRequest,
        prepared: Prepared,
        body: Bytes,
        correlated: Option<CorrelatedPayload>,
        timeout: Duration,
    ) -> TransferResult {
        self.core.execute(
            request.method(),
            prepared,
            Some(body),
            timeout,
            correlated,
            StatusPolicy::Post,
        )
    }

    /// The configuration this engine was built with.
    pub fn config(&self) -> &TransferConfig {
        self.core.config()
    }

    /// The notifier results are published to.
    pub fn notifier(&self) -> &TransferNotifier {
        self.core.notifier()
    }
}
