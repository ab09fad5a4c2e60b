use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::bus::EventBus;
use crate::cache::ResolutionCache;
use crate::domain::{EventKind, UrlEvent};

/// Stores every successful resolution seen on the bus.
pub struct CacheWriter {
    cache: ResolutionCache,
}

impl CacheWriter {
    pub fn new(cache: ResolutionCache) -> Self {
        Self { cache }
    }

    pub fn handle(&self, event: &UrlEvent) {
        match event {
            UrlEvent::Resolved { origin, resolved } => {
                debug!("Caching {} -> {}", origin, resolved);
                self.cache.remember(origin, resolved);
            }
            other => debug!("Cache writer ignoring {:?}", other.kind()),
        }
    }
}

/// Subscribe a [`CacheWriter`] to `Resolved` events until the bus closes.
pub fn spawn_cache_writer(cache: ResolutionCache, bus: &EventBus) -> JoinHandle<()> {
    let mut rx = bus.subscribe(&[EventKind::Resolved]);
    let writer = CacheWriter::new(cache);

    tokio::spawn(async move {
        info!("Cache writer started");
        while let Some(event) = rx.recv().await {
            writer.handle(&event);
        }
        info!("Cache writer stopped");
    })
}
