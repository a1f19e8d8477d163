//! Transfers with configured default timeouts.

use std::any::Any;

use bytes::Bytes;
use serde::Serialize;

use super::engine::{EngineBuilder, EngineCore};
use super::fetch::FetchEngine;
use super::notifier::TransferNotifier;
use super::post::PostEngine;
use super::request::{FetchRequest, PostRequest};
use super::result::TransferResult;
use crate::config::TransferConfig;
use crate::error::Result;

/// The fetch and post operations without a per-call timeout.
///
/// Fetches wait for [`TransferConfig::fetch_timeout`] (180 s by default) and
/// posts for [`TransferConfig::post_timeout`] (60 s by default). Behaviour is
/// otherwise identical to [`FetchEngine`] and [`PostEngine`].
#[derive(Clone, Debug)]
pub struct SyncFacade {
    fetch: FetchEngine,
    post: PostEngine,
}

impl Default for SyncFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncFacade {
    /// Create a facade with default collaborators.
    pub fn new() -> Self {
        EngineBuilder::new()
            .build_sync()
            .expect("Failed to create sync facade with default configuration")
    }

    pub(crate) fn from_core(core: EngineCore) -> Self {
        Self {
            fetch: FetchEngine::from_core(core.clone()),
            post: PostEngine::from_core(core),
        }
    }

    /// Fetch with the configured fetch timeout.
    pub fn fetch(&self, request: &FetchRequest) -> Result<TransferResult> {
        self.fetch.fetch(request, self.config().fetch_timeout)
    }

    /// Send raw bytes with the configured post timeout.
    pub fn post_bytes(&self, request: &PostRequest, body: impl Into<Bytes>) -> Result<TransferResult> {
        self.post.post_bytes(request, body, self.config().post_timeout)
    }

    /// Send text with the configured post timeout.
    pub fn post_string(&self, request: &PostRequest, text: impl Into<String>) -> Result<TransferResult> {
        self.post.post_string(request, text, self.config().post_timeout)
    }

    /// Send `value` as XML with the configured post timeout.
    pub fn post_object<V>(&self, request: &PostRequest, value: V) -> Result<TransferResult>
    where
        V: Serialize + Any + Send + Sync,
    {
        self.post.post_object(request, value, self.config().post_timeout)
    }

    /// The underlying fetch engine.
    pub fn fetch_engine(&self) -> &FetchEngine {
        &self.fetch
    }

    /// The underlying post engine.
    pub fn post_engine(&self) -> &PostEngine {
        &self.post
    }

    /// The configuration both engines share.
    pub fn config(&self) -> &TransferConfig {
        self.fetch.config()
    }

    /// The notifier both engines publish to.
    pub fn notifier(&self) -> &TransferNotifier {
        self.fetch.notifier()
    }
}
