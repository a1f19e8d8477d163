//! Engine configuration.

use std::time::Duration;

/// Default bounded wait for fetch calls made without an explicit timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(180_000);

/// Default bounded wait for post calls made without an explicit timeout.
pub const DEFAULT_POST_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Default name of the response header carrying a refresh hint.
pub const DEFAULT_REFRESH_HEADER: &str = "X-Attempt-Refresh-At";

/// Configuration shared by the transport, the engines and the sync facade.
#[derive(Clone, Debug)]
pub struct TransferConfig {
    /// Timeout used by [`SyncFacade`](crate::SyncFacade) fetches.
    pub fetch_timeout: Duration,
    /// Timeout used by [`SyncFacade`](crate::SyncFacade) posts.
    pub post_timeout: Duration,
    /// Connect timeout applied by the transport.
    pub connect_timeout: Option<Duration>,
    /// Whether to follow redirects.
    pub follow_redirects: bool,
    /// Maximum number of redirects to follow.
    pub max_redirects: usize,
    /// User agent sent with every request.
    pub user_agent: Option<String>,
    /// Response header parsed into `attempt_refresh_at`.
    pub refresh_header: String,
    /// Header names callers may not set (compared case-insensitively).
    pub reserved_headers: Vec<String>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            post_timeout: DEFAULT_POST_TIMEOUT,
            connect_timeout: Some(Duration::from_secs(10)),
            follow_redirects: true,
            max_redirects: 10,
            user_agent: Some(format!("HorizonRelay/{} (Rust)", env!("CARGO_PKG_VERSION"))),
            refresh_header: DEFAULT_REFRESH_HEADER.to_string(),
            reserved_headers: vec!["host".to_string()],
        }
    }
}

impl TransferConfig {
    /// Create a builder starting from the defaults.
    pub fn builder() -> TransferConfigBuilder {
        TransferConfigBuilder::new()
    }

    /// Check whether `name` is a reserved header.
    pub fn is_reserved_header(&self, name: &str) -> bool {
        self.reserved_headers
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(name.trim()))
    }
}

/// Builder for [`TransferConfig`].
#[derive(Debug, Default)]
pub struct TransferConfigBuilder {
    config: TransferConfig,
}

impl TransferConfigBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default fetch timeout.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch_timeout = timeout;
        self
    }

    /// Set the default post timeout.
    pub fn post_timeout(mut self, timeout: Duration) -> Self {
        self.config.post_timeout = timeout;
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Disable the connect timeout.
    pub fn no_connect_timeout(mut self) -> Self {
        self.config.connect_timeout = None;
        self
    }

    /// Disable redirect following.
    pub fn no_redirects(mut self) -> Self {
        self.config.follow_redirects = false;
        self
    }

    /// Set the maximum number of redirects to follow.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Set the name of the refresh-hint response header.
    pub fn refresh_header(mut self, name: impl Into<String>) -> Self {
        self.config.refresh_header = name.into();
        self
    }

    /// Add a header name that callers may not set.
    pub fn reserve_header(mut self, name: impl Into<String>) -> Self {
        self.config.reserved_headers.push(name.into());
        self
    }

    /// Build the configuration.
    pub fn build(self) -> TransferConfig {
        self.config
    }
}
