//! The bounded wait shared by every engine.
//!
//! Each call builds its own [`CallContext`], dispatches the exchange and
//! blocks on the context until it resolves or the timeout expires. Engines
//! themselves hold only shared, call-independent collaborators.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use horizon_relay_core::logging::targets;
use horizon_relay_core::Dispatcher;

use super::classify::{self, StatusPolicy};
use super::context::CallContext;
use super::extract::ResponseExtractor;
use super::facade::SyncFacade;
use super::fetch::FetchEngine;
use super::notifier::TransferNotifier;
use super::post::PostEngine;
use super::request::Prepared;
use super::result::{CorrelatedPayload, TransferResult};
use crate::config::TransferConfig;
use crate::error::Result;
use crate::runtime::RuntimeDispatcher;
use crate::transport::{
    HttpMethod, ReqwestTransport, Transport, TransportFailure, TransportRequest,
    TransportResponse,
};

/// Collaborators shared by the engines built from one [`EngineBuilder`].
#[derive(Clone)]
pub(crate) struct EngineCore {
    transport: Arc<dyn Transport>,
    dispatcher: Arc<dyn Dispatcher>,
    notifier: TransferNotifier,
    config: Arc<TransferConfig>,
}

impl EngineCore {
    pub(crate) fn config(&self) -> &TransferConfig {
        &self.config
    }

    pub(crate) fn notifier(&self) -> &TransferNotifier {
        &self.notifier
    }

    /// Run one exchange, blocking for at most `timeout`.
    pub(crate) fn execute(
        &self,
        method: HttpMethod,
        prepared: Prepared,
        body: Option<Bytes>,
        timeout: Duration,
        correlated: Option<CorrelatedPayload>,
        policy: StatusPolicy,
    ) -> TransferResult {
        let ctx = CallContext::new(
            prepared.url.to_string(),
            method,
            timeout,
            self.config.refresh_header.clone(),
            correlated,
        );

        let request = TransportRequest {
            method,
            url: prepared.url,
            headers: prepared.headers,
            body,
            content_type: prepared.content_type,
            timeout,
        };

        match policy {
            StatusPolicy::Fetch => tracing::debug!(
                target: targets::FETCH,
                call = %ctx.id(),
                uri = ctx.uri(),
                timeout_ms = timeout.as_millis() as u64,
                "dispatching fetch"
            ),
            StatusPolicy::Post => tracing::debug!(
                target: targets::POST,
                call = %ctx.id(),
                verb = %method,
                uri = ctx.uri(),
                timeout_ms = timeout.as_millis() as u64,
                "dispatching post"
            ),
        }

        let worker_ctx = ctx.clone();
        let transport = self.transport.clone();
        let notifier = self.notifier.clone();
        self.dispatcher.run(Box::new(move || {
            if worker_ctx.is_resolved() {
                discard_late(&worker_ctx, policy);
                return;
            }

            let exchange = transport.execute(request, worker_ctx.abort_token());
            if worker_ctx.is_resolved() {
                discard_late(&worker_ctx, policy);
                return;
            }

            let result = resolve_exchange(&worker_ctx, exchange, policy);
            if worker_ctx.claim() {
                classify::log_result(&result, policy);
                // The caller is released first; observers cannot extend its wait.
                worker_ctx.fulfil(result.clone());
                notifier.publish(&result);
            } else {
                discard_late(&worker_ctx, policy);
            }
        }));

        match ctx.wait() {
            Some(result) => result,
            None if ctx.claim() => {
                ctx.abort_token().cancel();
                let result = ctx.timed_out();
                classify::log_result(&result, policy);
                let published = result.clone();
                let notifier = self.notifier.clone();
                self.dispatcher
                    .run(Box::new(move || notifier.publish(&published)));
                result
            }
            // The worker claimed the call just before the deadline.
            None => ctx.wait_fulfilled(),
        }
    }
}

impl std::fmt::Debug for EngineCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineCore")
            .field("notifier", &self.notifier)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Turn a finished exchange into a result: extract, then apply the status policy.
fn resolve_exchange(
    ctx: &CallContext,
    exchange: std::result::Result<TransportResponse, TransportFailure>,
    policy: StatusPolicy,
) -> TransferResult {
    let response = match exchange {
        Ok(response) => response,
        Err(failure) => return ctx.transport_failed(failure),
    };

    match ResponseExtractor.extract(response) {
        Ok(extracted) if policy.accepts(extracted.status) => ctx.completed(extracted),
        Ok(extracted) => {
            let description = classify::describe_status(extracted.status);
            ctx.protocol_failed(extracted, description)
        }
        Err(err) => ctx.extraction_failed(err),
    }
}

fn discard_late(ctx: &CallContext, policy: StatusPolicy) {
    match policy {
        StatusPolicy::Fetch => tracing::debug!(
            target: targets::FETCH,
            call = %ctx.id(),
            timeout_ms = ctx.timeout().as_millis() as u64,
            "discarding completion after the call resolved"
        ),
        StatusPolicy::Post => tracing::debug!(
            target: targets::POST,
            call = %ctx.id(),
            timeout_ms = ctx.timeout().as_millis() as u64,
            "discarding completion after the call resolved"
        ),
    }
}

/// Builder for [`FetchEngine`], [`PostEngine`] and [`SyncFacade`].
///
/// Unset collaborators fall back to a [`ReqwestTransport`] built from the
/// configuration, the [`RuntimeDispatcher`], and a fresh [`TransferNotifier`].
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use horizon_relay_net::{EngineBuilder, FetchRequest, TransferNotifier};
///
/// let notifier = TransferNotifier::new();
/// let engine = EngineBuilder::new().notifier(notifier.clone()).build_fetch()?;
/// let result = engine.fetch(&FetchRequest::new("https://example.com/feed"), Duration::from_secs(5))?;
/// println!("{} -> {}", result.uri(), result.status_code());
/// # Ok::<(), horizon_relay_net::ConfigError>(())
/// ```
#[derive(Default)]
pub struct EngineBuilder {
    transport: Option<Arc<dyn Transport>>,
    dispatcher: Option<Arc<dyn Dispatcher>>,
    notifier: Option<TransferNotifier>,
    config: TransferConfig,
}

impl EngineBuilder {
    /// Create a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific transport.
    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Run exchanges on a specific dispatcher.
    pub fn dispatcher<D: Dispatcher + 'static>(mut self, dispatcher: D) -> Self {
        self.dispatcher = Some(Arc::new(dispatcher));
        self
    }

    /// Publish results to `notifier`.
    pub fn notifier(mut self, notifier: TransferNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Use a specific configuration.
    pub fn config(mut self, config: TransferConfig) -> Self {
        self.config = config;
        self
    }

    fn build_core(self) -> Result<EngineCore> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::from_config(&self.config)?),
        };

        Ok(EngineCore {
            transport,
            dispatcher: self.dispatcher.unwrap_or_else(|| Arc::new(RuntimeDispatcher)),
            notifier: self.notifier.unwrap_or_default(),
            config: Arc::new(self.config),
        })
    }

    /// Build a fetch engine.
    pub fn build_fetch(self) -> Result<FetchEngine> {
        self.build_core().map(FetchEngine::from_core)
    }

    /// Build a post engine.
    pub fn build_post(self) -> Result<PostEngine> {
        self.build_core().map(PostEngine::from_core)
    }

    /// Build a facade over a fetch and a post engine sharing one transport.
    pub fn build_sync(self) -> Result<SyncFacade> {
        self.build_core().map(SyncFacade::from_core)
    }
}

impl std::fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("custom_transport", &self.transport.is_some())
            .field("custom_dispatcher", &self.dispatcher.is_some())
            .field("notifier", &self.notifier)
            .field("config", &self.config)
            .finish()
    }
}
