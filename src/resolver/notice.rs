use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;
use url::Url;

/// User-facing notices raised while a resolution runs.
pub trait Notifier {
    fn resolving(&self, _origin: &Url) {}
    fn taking_longer(&self, _origin: &Url) {}
}

/// Notifier that only writes to the log.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn resolving(&self, origin: &Url) {
        info!("Resolving {}", origin);
    }

    fn taking_longer(&self, origin: &Url) {
        info!("Resolving {} is taking longer than usual", origin);
    }
}

/// Raises [`Notifier::taking_longer`] once `after` elapses, unless dropped first.
#[must_use = "the notice is cancelled as soon as this is dropped"]
pub struct SlowNotice {
    handle: JoinHandle<()>,
}

impl SlowNotice {
    pub fn arm(after: Duration, origin: Url, notifier: Arc<dyn Notifier + Send + Sync>) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            notifier.taking_longer(&origin);
        });
        Self { handle }
    }
}

impl Drop for SlowNotice {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
