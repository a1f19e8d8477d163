//! Background dispatch for off-thread work.
//!
//! Provides the [`Dispatcher`] seam used to hand a unit of work to another
//! thread, a rayon-backed [`ThreadPool`] implementing it, and the
//! [`CancellationToken`] used to ask in-flight work to stop.
//!
//! # Example
//!
//! ```no_run
//! use horizon_relay_core::dispatch::{Dispatcher, ThreadPool, ThreadPoolConfig};
//!
//! let pool = ThreadPool::new(ThreadPoolConfig::with_threads(2)).unwrap();
//! pool.run(Box::new(|| {
//!     // Runs on a pool worker.
//! }));
//! ```
//!
//! # Cancellation Example
//!
//! ```no_run
//! use horizon_relay_core::dispatch::CancellationToken;
//! use std::time::Duration;
//!
//! let token = CancellationToken::new();
//! let worker_token = token.clone();
//!
//! std::thread::spawn(move || {
//!     // Wakes as soon as the token is cancelled.
//!     worker_token.wait_timeout(Duration::from_secs(30));
//! });
//!
//! token.cancel();
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rayon::{ThreadPool as RayonThreadPool, ThreadPoolBuilder};
use tokio::sync::Notify;

use crate::error::{RelayError, ThreadPoolError};
use crate::logging::targets;

/// A unit of work handed to a [`Dispatcher`].
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Runs units of work off the caller's thread.
///
/// Dispatch is fire-and-forget: nothing is returned to the caller, and any
/// result must be delivered by the work itself.
pub trait Dispatcher: Send + Sync {
    /// Run `work` on some other thread.
    fn run(&self, work: Work);
}

impl<D: Dispatcher + ?Sized> Dispatcher for Arc<D> {
    fn run(&self, work: Work) {
        (**self).run(work)
    }
}

/// A cancellation token for cooperative, best-effort cancellation.
///
/// Cancelling is idempotent. Work can poll [`is_cancelled`](Self::is_cancelled),
/// block with [`wait_timeout`](Self::wait_timeout), or await
/// [`cancelled`](Self::cancelled) from async code.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    inner: Arc<CancellationState>,
}

#[derive(Debug)]
struct CancellationState {
    cancelled: AtomicBool,
    wakeup: TaskWakeup,
    notify: Notify,
}

impl CancellationToken {
    /// Create a new cancellation token.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancellationState {
                cancelled: AtomicBool::new(false),
                wakeup: TaskWakeup::new(),
                notify: Notify::new(),
            }),
        }
    }

    /// Check if cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Request cancellation.
    ///
    /// Returns `true` if this call performed the cancellation, `false` if the
    /// token was already cancelled.
    pub fn cancel(&self) -> bool {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.inner.wakeup.wake();
        self.inner.notify.notify_waiters();
        true
    }

    /// Block until the token is cancelled or `timeout` elapses.
    ///
    /// Returns `true` if the token was cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.inner.wakeup.wait_timeout(timeout)
    }

    /// Resolve once the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent cancel is not lost.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Internal wakeup mechanism for blocked waiters.
#[derive(Debug)]
struct TaskWakeup {
    ready: AtomicBool,
    condvar: Condvar,
    mutex: Mutex<()>,
}

impl TaskWakeup {
    fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            condvar: Condvar::new(),
            mutex: Mutex::new(()),
        }
    }

    fn wake(&self) {
        // Hold the lock while setting ready to avoid a lost wakeup.
        let _guard = self.mutex.lock();
        self.ready.store(true, Ordering::Release);
        self.condvar.notify_all();
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut guard = self.mutex.lock();
        if self.ready.load(Ordering::Acquire) {
            return true;
        }
        let _ = self.condvar.wait_while_for(
            &mut guard,
            |_| !self.ready.load(Ordering::Acquire),
            timeout,
        );
        self.ready.load(Ordering::Acquire)
    }
}

/// Configuration for creating a thread pool.
#[derive(Debug, Clone)]
pub struct ThreadPoolConfig {
    /// Number of worker threads. `None` means use the number of CPU cores.
    pub num_threads: Option<usize>,
    /// Name prefix for worker threads.
    pub thread_name: String,
    /// Stack size for worker threads in bytes.
    pub stack_size: Option<usize>,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            thread_name: "relay-worker".to_string(),
            stack_size: None,
        }
    }
}

impl ThreadPoolConfig {
    /// Create a new configuration with a custom thread count.
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
            ..Default::default()
        }
    }
}

/// A thread pool for executing background work.
///
/// Uses rayon's work-stealing scheduler. Work that blocks (for example a
/// network exchange) occupies a worker for its whole duration, so size the
/// pool for the expected number of concurrent transfers.
pub struct ThreadPool {
    pool: RayonThreadPool,
    active_tasks: Arc<AtomicUsize>,
}

impl ThreadPool {
    /// Create a new thread pool with the given configuration.
    pub fn new(config: ThreadPoolConfig) -> Result<Self, RelayError> {
        let mut builder = ThreadPoolBuilder::new()
            .thread_name(move |index| format!("{}-{}", config.thread_name, index));

        if let Some(num_threads) = config.num_threads {
            builder = builder.num_threads(num_threads);
        }

        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let pool = builder
            .build()
            .map_err(|e| ThreadPoolError::CreationFailed(e.to_string()))?;

        Ok(Self {
            pool,
            active_tasks: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Get the number of threads in the pool.
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Get the number of currently running units of work.
    pub fn active_tasks(&self) -> usize {
        self.active_tasks.load(Ordering::Acquire)
    }
}

impl Dispatcher for ThreadPool {
    fn run(&self, work: Work) {
        self.active_tasks.fetch_add(1, Ordering::AcqRel);
        let active_tasks = self.active_tasks.clone();

        self.pool.spawn(move || {
            if std::panic::catch_unwind(std::panic::AssertUnwindSafe(work)).is_err() {
                tracing::error!(target: targets::DISPATCH, "dispatched work panicked");
            }
            active_tasks.fetch_sub(1, Ordering::AcqRel);
        });
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("num_threads", &self.num_threads())
            .field("active_tasks", &self.active_tasks())
            .finish()
    }
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
static_assertions::assert_impl_all!(ThreadPool: Send, Sync);
