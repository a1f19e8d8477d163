//! Bounded HTTP transfers for Horizon Relay.
//!
//! This crate turns callback-completed HTTP exchanges into calls that block
//! the caller for at most a caller-chosen duration and always hand back a
//! [`TransferResult`]:
//!
//! - **Fetch**: GET requests through [`FetchEngine`]
//! - **Post**: POST/PUT/DELETE/PATCH bodies through [`PostEngine`], as raw
//!   bytes, text, or serialized objects
//! - **Defaults**: [`SyncFacade`] applies configured timeouts
//! - **Observation**: every resolved result is published on a
//!   [`TransferNotifier`]
//!
//! Network failures never surface as `Err`. The only error a call returns is
//! a [`ConfigError`] for a request that could not be sent at all, such as one
//! that sets the reserved `Host` header.
//!
//! # Fetching
//!
//! ```no_run
//! use std::time::Duration;
//! use horizon_relay_net::{FetchEngine, FetchRequest, STATUS_TIMED_OUT};
//!
//! let engine = FetchEngine::new();
//! let result = engine.fetch(&FetchRequest::new("https://example.com/data"), Duration::from_secs(5))?;
//!
//! match result.status_code() {
//!     200 => println!("{}", result.body_text().unwrap_or_default()),
//!     STATUS_TIMED_OUT => println!("timed out"),
//!     other => println!("failed with {other}: {:?}", result.message()),
//! }
//! # Ok::<(), horizon_relay_net::ConfigError>(())
//! ```
//!
//! # Observing Results
//!
//! ```no_run
//! use horizon_relay_net::{EngineBuilder, TransferNotifier};
//!
//! let notifier = TransferNotifier::new();
//! notifier.on_abnormal_response().connect(|result| {
//!     if result.status_code() == 401 {
//!         println!("session expired");
//!     }
//! });
//!
//! let facade = EngineBuilder::new().notifier(notifier).build_sync()?;
//! # Ok::<(), horizon_relay_net::ConfigError>(())
//! ```
//!
//! # Custom Transports
//!
//! Engines reach the network only through the [`Transport`] trait. The
//! default is [`ReqwestTransport`]; tests and embedders can substitute their
//! own with [`EngineBuilder::transport`].

mod config;
mod error;
mod runtime;
pub mod transfer;
pub mod transport;

pub use config::{
    DEFAULT_FETCH_TIMEOUT, DEFAULT_POST_TIMEOUT, DEFAULT_REFRESH_HEADER, TransferConfig,
    TransferConfigBuilder,
};
pub use error::{ConfigError, Result, TransferError, TransferPhase, TransportErrorKind};
pub use runtime::RuntimeDispatcher;

// Re-export commonly used types at the crate root
pub use transfer::{
    CallId, CorrelatedPayload, EngineBuilder, FetchEngine, FetchRequest, JsonSerializer,
    ObjectSerializer, PostEngine, PostRequest, ResponseHeaders, STATUS_NO_RESPONSE,
    STATUS_TIMED_OUT, SyncFacade, TransferNotifier, TransferOutcome, TransferResult,
    XmlSerializer,
};
pub use transport::{
    HttpMethod, ReqwestTransport, Transport, TransportFailure, TransportRequest,
    TransportResponse,
};
