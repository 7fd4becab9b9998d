//! Broadcast-once cancellation.
//!
//! A [`CancelSignal`] starts out live and can be cancelled exactly once;
//! every clone observes the same state. Observers either poll
//! [`CancelSignal::is_cancelled`] between units of work or await
//! [`CancelSignal::cancelled`] inside a `select!`.
//!
//! # Example
//!
//! ```rust
//! use lantern_core::CancelSignal;
//!
//! # tokio_test::block_on(async {
//! let signal = CancelSignal::new();
//! let observer = signal.clone();
//!
//! let worker = tokio::spawn(async move {
//!     observer.cancelled().await;
//!     "abandoned"
//! });
//!
//! signal.cancel();
//! assert_eq!(worker.await.unwrap(), "abandoned");
//! # });
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// A cloneable, idempotent cancellation signal.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelSignal {
    /// Creates a signal that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the signal and wakes every waiter.
    ///
    /// Calling this more than once is harmless. Returns `true` only for
    /// the call that actually flipped the signal.
    pub fn cancel(&self) -> bool {
        let first = self
            .inner
            .cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if first {
            self.inner.notify.notify_waiters();
        }
        first
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Completes when the signal is cancelled.
    ///
    /// Completes immediately if it already was.
    pub async fn cancelled(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent cancel cannot
        // slip between the check and the await.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }

    /// Returns true if both handles observe the same signal.
    #[must_use]
    pub fn same_signal(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
