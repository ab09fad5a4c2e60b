//! Best-effort resolution cache.
//!
//! Failures of the underlying [`Store`] never reach callers: a failed read is
//! a miss and a failed write is logged and dropped.

pub mod writer;

use std::sync::Arc;

use tracing::{debug, warn};
use url::Url;

use crate::domain::CacheKey;
use crate::store::Store;

pub use writer::{spawn_cache_writer, CacheWriter};

#[derive(Clone)]
pub struct ResolutionCache {
    store: Arc<dyn Store + Send + Sync>,
}

impl ResolutionCache {
    pub fn new(store: Arc<dyn Store + Send + Sync>) -> Self {
        Self { store }
    }

    pub fn lookup(&self, origin: &Url) -> Option<Url> {
        let key = CacheKey::for_url(origin);

        let raw = match self.store.get(&key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Cache read failed for {}: {}", origin, e);
                return None;
            }
        };

        match Url::parse(&raw) {
            Ok(url) => {
                debug!("Cache hit for {}", origin);
                Some(url)
            }
            Err(e) => {
                warn!("Ignoring unparseable cache entry for {}: {}", origin, e);
                None
            }
        }
    }

    pub fn remember(&self, origin: &Url, resolved: &Url) {
        let key = CacheKey::for_url(origin);
        if let Err(e) = self.store.put(&key, resolved.as_str()) {
            warn!("Cache write failed for {}: {}", origin, e);
        }
    }
}
