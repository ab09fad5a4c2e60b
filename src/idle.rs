//! Counts in-flight resolutions so the host knows when it may shut down.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Default)]
struct Inner {
    in_flight: AtomicUsize,
    idle: Notify,
}

#[derive(Clone, Default)]
pub struct IdleTracker {
    inner: Arc<Inner>,
}

impl IdleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark one resolution as started. It stays in flight until the returned
    /// guard is dropped.
    pub fn begin(&self) -> InFlight {
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlight {
            inner: self.inner.clone(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight() == 0
    }

    /// Wait until no resolution is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

#[must_use = "the resolution stops counting as in flight when this is dropped"]
pub struct InFlight {
    inner: Arc<Inner>,
}

impl fmt::Debug for InFlight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlight").finish_non_exhaustive()
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_idle_before_any_work() {
        let tracker = IdleTracker::new();
        assert!(tracker.is_idle());
        assert_eq!(tracker.in_flight(), 0);
    }

    #[test]
    fn test_guard_counts_until_dropped() {
        let tracker = IdleTracker::new();
        let first = tracker.begin();
        let second = tracker.begin();
        assert_eq!(tracker.in_flight(), 2);
        assert!(!tracker.is_idle());

        drop(first);
        assert_eq!(tracker.in_flight(), 1);
        drop(second);
        assert!(tracker.is_idle());
    }

    #[test]
    fn test_shared_guard_counts_once() {
        let tracker = IdleTracker::new();
        let guard = Arc::new(tracker.begin());
        let copy = guard.clone();
        assert_eq!(tracker.in_flight(), 1);

        drop(guard);
        assert!(!tracker.is_idle());
        drop(copy);
        assert!(tracker.is_idle());
    }

    #[tokio::test]
    async fn test_wait_idle_returns_immediately_when_idle() {
        let tracker = IdleTracker::new();
        tokio::time::timeout(Duration::from_secs(1), tracker.wait_idle())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_guards_return_to_zero() {
        let tracker = IdleTracker::new();
        let mut handles = Vec::new();

        for i in 0..50 {
            let guard = tracker.begin();
            handles.push(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(i % 5)).await;
                drop(guard);
            }));
        }

        tokio::time::timeout(Duration::from_secs(5), tracker.wait_idle())
            .await
            .unwrap();
        assert!(tracker.is_idle());

        for handle in handles {
            handle.await.unwrap();
        }
    }
}
