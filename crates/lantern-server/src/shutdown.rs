//! Connection accounting for bounded drains.
//!
//! Every accepted connection holds a [`ConnectionToken`]. Stop waits on
//! [`ConnectionTracker::wait_idle`] for the tokens to come back, bounded
//! by the caller's timeout; whatever is still out when the timeout fires
//! gets force-closed through the instance's force signal.
//!
//! ```rust
//! use lantern_server::shutdown::ConnectionTracker;
//!
//! let tracker = ConnectionTracker::new();
//! let token = tracker.acquire();
//! assert_eq!(tracker.active_connections(), 1);
//!
//! drop(token);
//! assert_eq!(tracker.active_connections(), 0);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

/// Counts live connections of one server instance.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    inner: Arc<TrackerInner>,
}

#[derive(Debug, Default)]
struct TrackerInner {
    active: AtomicUsize,
    idle: Notify,
}

impl ConnectionTracker {
    /// Creates a tracker with no connections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires a token for a newly accepted connection.
    #[must_use]
    pub fn acquire(&self) -> ConnectionToken {
        self.inner.active.fetch_add(1, Ordering::SeqCst);
        ConnectionToken {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Returns the number of live connections.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Completes once no connections are live.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.active_connections() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Waits up to `timeout` for every connection to close.
    ///
    /// Returns `true` if the tracker went idle in time.
    pub async fn wait_idle_for(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_idle()).await.is_ok()
    }
}

/// Held by a connection task for as long as the connection lives.
#[derive(Debug)]
pub struct ConnectionToken {
    inner: Arc<TrackerInner>,
}

impl Drop for ConnectionToken {
    fn drop(&mut self) {
        let prev = self.inner.active.fetch_sub(1, Ordering::SeqCst);
        if prev == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}
