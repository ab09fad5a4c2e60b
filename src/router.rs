//! Entry point for inbound URLs: answer from the cache or ask for a resolution.

use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::app::{Result, UrlsetterError};
use crate::bus::EventBus;
use crate::cache::ResolutionCache;
use crate::domain::UrlEvent;
use crate::idle::IdleTracker;

pub const DEFAULT_MOBILE_REDIRECT_HOSTS: &[&str] = &["m.facebook.com"];

/// What [`Router::dispatch`] did with a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A `Resolved` event was published straight from the cache.
    CacheHit(Url),
    /// A resolve request was published for the resolver. The resolution is
    /// already in flight when this is returned.
    Requested,
}

/// Parse an inbound URL; it must be absolute and carry a host.
pub fn parse_inbound(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())?;
    if url.host_str().is_none() {
        return Err(UrlsetterError::MissingHost(raw.to_string()));
    }
    Ok(url)
}

#[derive(Clone)]
pub struct Router {
    bus: EventBus,
    cache: ResolutionCache,
    idle: IdleTracker,
    mobile_redirect_hosts: Vec<String>,
}

impl Router {
    pub fn new(
        bus: EventBus,
        cache: ResolutionCache,
        idle: IdleTracker,
        mobile_redirect_hosts: Vec<String>,
    ) -> Self {
        let mobile_redirect_hosts = mobile_redirect_hosts
            .into_iter()
            .map(|h| h.to_ascii_lowercase())
            .collect();
        Self {
            bus,
            cache,
            idle,
            mobile_redirect_hosts,
        }
    }

    pub fn is_mobile_redirect(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|host| self.mobile_redirect_hosts.iter().any(|h| h == host))
    }

    /// Wrap `origin` in the request event matching its host. The resolution
    /// is in flight from here until the event and all its copies are dropped.
    pub fn request(&self, origin: Url) -> UrlEvent {
        let in_flight = Arc::new(self.idle.begin());

        if self.is_mobile_redirect(&origin) {
            UrlEvent::ResolveFacebookRequest { origin, in_flight }
        } else {
            UrlEvent::ResolveRequest { origin, in_flight }
        }
    }

    pub async fn dispatch(&self, origin: Url) -> Dispatch {
        if let Some(resolved) = self.cache.lookup(&origin) {
            debug!("Serving {} from cache", origin);
            self.bus
                .publish(UrlEvent::Resolved {
                    origin,
                    resolved: resolved.clone(),
                })
                .await;
            return Dispatch::CacheHit(resolved);
        }

        self.bus.publish(self.request(origin)).await;
        Dispatch::Requested
    }
}
