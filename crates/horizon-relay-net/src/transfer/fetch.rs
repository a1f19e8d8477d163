//! Bounded GET transfers.

use std::time::Duration;

use super::classify::StatusPolicy;
use super::engine::{EngineBuilder, EngineCore};
use super::notifier::TransferNotifier;
use super::request::FetchRequest;
use super::result::TransferResult;
use crate::config::TransferConfig;
use crate::error::Result;
use crate::transport::HttpMethod;

/// Performs GET requests that block the caller for a bounded time.
///
/// The engine keeps no per-call state, so one instance may serve any number
/// of concurrent callers. 200, 201 and 202 complete a call; every other
/// status, including 204, is a protocol failure.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use horizon_relay_net::{FetchEngine, FetchRequest};
///
/// let engine = FetchEngine::new();
/// let request = FetchRequest::new("https://example.com/exports/")
///     .file_name("daily.csv")
///     .header("Accept", "text/csv");
///
/// let result = engine.fetch(&request, Duration::from_secs(10))?;
/// if result.is_success() {
///     println!("{}", result.body_text().unwrap_or_default());
/// }
/// # Ok::<(), horizon_relay_net::ConfigError>(())
/// ```
#[derive(Clone, Debug)]
pub struct FetchEngine {
    core: EngineCore,
}

impl Default for FetchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchEngine {
    /// Create an engine with default collaborators.
    pub fn new() -> Self {
        EngineBuilder::new()
            .build_fetch()
            .expect("Failed to create fetch engine with default configuration")
    }

    /// Create a builder.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub(crate) fn from_core(core: EngineCore) -> Self {
        Self { core }
    }

    /// Fetch `request`, waiting at most `timeout`.
    ///
    /// Returns `Err` only for a request that fails validation, before
    /// anything is sent. Every network outcome is reported in the result.
    pub fn fetch(&self, request: &FetchRequest, timeout: Duration) -> Result<TransferResult> {
        let prepared = request.prepare(self.core.config())?;
        Ok(self.core.execute(
            HttpMethod::Get,
            prepared,
            None,
            timeout,
            None,
            StatusPolicy::Fetch,
        ))
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
