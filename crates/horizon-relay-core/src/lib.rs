//! Core systems for Horizon Relay.
//!
//! This crate provides the runtime-neutral building blocks used by the
//! transfer engine in `horizon-relay-net`:
//!
//! - **Dispatch**: A [`Dispatcher`] seam for running work off the caller's
//!   thread, with a rayon-backed [`ThreadPool`]
//! - **Cancellation**: A [`CancellationToken`] usable from blocking and async code
//! - **Signal/Slot System**: Type-safe observer registration via [`Signal`]
//! - **Logging**: `tracing` target names for filtering diagnostics
//!
//! # Dispatch Example
//!
//! ```no_run
//! use horizon_relay_core::{Dispatcher, ThreadPool, ThreadPoolConfig};
//!
//! let pool = ThreadPool::new(ThreadPoolConfig::with_threads(4)).unwrap();
//! pool.run(Box::new(|| println!("running on a worker")));
//! ```
//!
//! # Signal Example
//!
//! ```
//! use horizon_relay_core::Signal;
//!
//! let value_changed = Signal::<i32>::new();
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//! value_changed.emit(42);
//! value_changed.disconnect(conn_id);
//! ```

pub mod dispatch;
mod error;
pub mod logging;
pub mod signal;

pub use dispatch::{CancellationToken, Dispatcher, ThreadPool, ThreadPoolConfig, Work};
pub use error::{RelayError, Result, ThreadPoolError};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
