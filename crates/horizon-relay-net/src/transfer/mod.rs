//! Bounded, cancellable transfers.
//!
//! Every call follows the same path: the request is validated, a
//! call-scoped context is created, the exchange is dispatched off the
//! caller's thread, and the caller waits until the context resolves or the
//! timeout expires. Exactly one of completion, failure or timeout produces
//! the returned [`TransferResult`], which is then published through the
//! [`TransferNotifier`].
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use horizon_relay_net::transfer::{FetchRequest, FetchEngine};
//!
//! let engine = FetchEngine::new();
//! let result = engine.fetch(&FetchRequest::new("https://example.com/"), Duration::from_millis(500))?;
//! if result.is_timed_out() {
//!     println!("gave up after {:?}", result.elapsed());
//! }
//! # Ok::<(), horizon_relay_net::ConfigError>(())
//! ```

mod classify;
mod context;
mod engine;
mod extract;
mod facade;
mod fetch;
mod headers;
mod notifier;
mod post;
mod request;
mod result;
mod serializer;

pub use engine::EngineBuilder;
pub use extract::{Extracted, ExtractionError, ResponseExtractor};
pub use facade::SyncFacade;
pub use fetch::FetchEngine;
pub use headers::{ResponseHeaders, attempt_refresh_at, expiration, parse_http_date};
pub use notifier::TransferNotifier;
pub use post::{OCTET_STREAM, PostEngine};
pub use request::{APPLICATION_XML, FORM_URLENCODED, FetchRequest, PostRequest};
pub use result::{
    CallId, CorrelatedPayload, STATUS_NO_RESPONSE, STATUS_TIMED_OUT, TransferOutcome,
    TransferResult,
};
pub use serializer::{JsonSerializer, ObjectSerializer, XmlSerializer};
