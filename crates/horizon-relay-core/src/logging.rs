//! Logging targets for Horizon Relay.
//!
//! Horizon Relay uses the `tracing` crate for instrumentation and never
//! installs a subscriber itself. Applications that want to see diagnostics
//! install one, for example:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_relay_net=info")
//!     .init();
//! ```
//!
//! Without a subscriber every event is discarded and behaviour is unchanged.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "horizon_relay_core";
    /// Background dispatch target.
    pub const DISPATCH: &str = "horizon_relay_core::dispatch";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_relay_core::signal";
    /// Fetch engine target.
    pub const FETCH: &str = "horizon_relay_net::fetch";
    /// Post engine target.
    pub const POST: &str = "horizon_relay_net::post";
    /// Response extraction target.
    pub const EXTRACT: &str = "horizon_relay_net::extract";
    /// Notifier target.
    pub const NOTIFY: &str = "horizon_relay_net::notify";
    /// Transport target.
    pub const TRANSPORT: &str = "horizon_relay_net::transport";
}
