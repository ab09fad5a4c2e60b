//! Redirect-following resolution engine.
//!
//! A resolution probes the candidate URL with `HEAD`, follows 301/302/303/307
//! responses through their `Location` header, and stops at the first other
//! status. Each run publishes exactly one terminal event on the bus.

pub mod notice;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::app::ResolveError;
use crate::bus::EventBus;
use crate::client::{ProbeRequest, RedirectClient};
use crate::domain::{EventKind, UrlEvent};
use crate::idle::{IdleTracker, InFlight};

pub use notice::{Notifier, SlowNotice, TracingNotifier};

pub const DEFAULT_MAX_REDIRECTS: usize = 10;
pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_SLOW_NOTICE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Redirects followed before giving up
    pub max_redirects: usize,
    /// Delay before the "taking longer" notice
    pub slow_notice_after: Duration,
    /// Resolutions allowed to hit the network at once
    pub max_concurrency: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            max_redirects: DEFAULT_MAX_REDIRECTS,
            slow_notice_after: DEFAULT_SLOW_NOTICE,
            max_concurrency: DEFAULT_WORKERS,
        }
    }
}

pub struct Resolver {
    client: Arc<dyn RedirectClient + Send + Sync>,
    bus: EventBus,
    idle: IdleTracker,
    notifier: Arc<dyn Notifier + Send + Sync>,
    semaphore: Arc<Semaphore>,
    settings: ResolverSettings,
}

impl Resolver {
    pub fn new(
        client: Arc<dyn RedirectClient + Send + Sync>,
        bus: EventBus,
        idle: IdleTracker,
        notifier: Arc<dyn Notifier + Send + Sync>,
        settings: ResolverSettings,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(settings.max_concurrency.max(1)));
        Self {
            client,
            bus,
            idle,
            notifier,
            semaphore,
            settings,
        }
    }

    /// Follow the redirect chain starting at `origin` and return where it ends.
    pub async fn resolve(&self, origin: &Url) -> Result<Url, ResolveError> {
        let mut candidate = origin.clone();
        let mut hops = 0;

        loop {
            let response = self
                .client
                .send(&ProbeRequest::head(candidate.clone()))
                .await?;

            if !response.is_redirect() {
                debug!("{} answered {}, resolution ends", candidate, response.status);
                return Ok(candidate);
            }

            let next = match response.location.as_deref() {
                Some(location) => match candidate.join(location) {
                    Ok(next) => next,
                    Err(e) => {
                        warn!(
                            "{} redirected to unusable location {:?}: {}",
                            candidate, location, e
                        );
                        return Ok(candidate);
                    }
                },
                None => {
                    warn!("{} answered {} without a Location", candidate, response.status);
                    return Ok(candidate);
                }
            };

            if hops == self.settings.max_redirects {
                return Err(ResolveError::TooManyRedirects(hops));
            }
            hops += 1;

            debug!("Hop {}: {} -> {}", hops, candidate, next);
            candidate = next;
        }
    }

    /// Resolve `origin` and publish the outcome.
    ///
    /// In-flight accounting belongs to the caller; see [`Resolver::dispatch`].
    pub async fn resolve_and_publish(&self, origin: Url) {
        self.notifier.resolving(&origin);
        let notice = SlowNotice::arm(
            self.settings.slow_notice_after,
            origin.clone(),
            self.notifier.clone(),
        );

        let event = match self.resolve(&origin).await {
            Ok(resolved) => {
                info!("Resolved {} to {}", origin, resolved);
                UrlEvent::Resolved { origin, resolved }
            }
            Err(e) => {
                error!("Failed to resolve {}: {}", origin, e);
                UrlEvent::ResolutionFailed {
                    origin,
                    error: Arc::new(e),
                }
            }
        };

        drop(notice);
        self.bus.publish(event).await;
    }

    /// Run a resolution on its own task. The resolution counts as in flight
    /// from this call until its terminal event has been published.
    pub fn dispatch(self: &Arc<Self>, origin: Url) -> JoinHandle<()> {
        let in_flight = Arc::new(self.idle.begin());
        self.dispatch_request(origin, in_flight)
    }

    /// Run a resolution that was already marked in flight by whoever asked
    /// for it. `in_flight` is held until the terminal event is published.
    pub fn dispatch_request(
        self: &Arc<Self>,
        origin: Url,
        in_flight: Arc<InFlight>,
    ) -> JoinHandle<()> {
        let resolver = Arc::clone(self);

        tokio::spawn(async move {
            let _permit = resolver.semaphore.acquire().await.ok();
            resolver.resolve_and_publish(origin).await;
            drop(in_flight);
        })
    }

    pub fn is_idle(&self) -> bool {
        self.idle.is_idle()
    }
}

/// Subscribe `resolver` to resolve requests and serve them until the bus closes.
pub fn spawn_resolver(resolver: Arc<Resolver>, bus: &EventBus) -> JoinHandle<()> {
    let mut rx = bus.subscribe(&EventKind::REQUESTS);

    tokio::spawn(async move {
        info!("Resolver started");

        while let Some(event) = rx.recv().await {
            match event {
                UrlEvent::ResolveRequest { origin, in_flight }
                | UrlEvent::ResolveFacebookRequest { origin, in_flight } => {
                    resolver.dispatch_request(origin, in_flight);
                }
                other => debug!("Resolver ignoring {:?}", other.kind()),
            }
        }

        info!("Resolver stopped");
    })
}
