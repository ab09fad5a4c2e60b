use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::error;

use crate::analytics::spawn_analytics;
use crate::app::error::{Result, UrlsetterError};
use crate::bus::EventBus;
use crate::cache::{spawn_cache_writer, ResolutionCache};
use crate::client::{HttpRedirectClient, RedirectClient};
use crate::config::Config;
use crate::idle::IdleTracker;
use crate::resolver::{spawn_resolver, Notifier, Resolver};
use crate::router::Router;
use crate::store::SqliteStore;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub cache: ResolutionCache,
    pub bus: EventBus,
    pub idle: IdleTracker,
    pub resolver: Arc<Resolver>,
    pub router: Router,
}

/// Subscriber tasks started by [`AppContext::start`].
pub struct Services {
    handles: Vec<JoinHandle<()>>,
}

impl AppContext {
    pub fn new(config: Config, notifier: Arc<dyn Notifier + Send + Sync>) -> Result<Self> {
        let db_path = match config.cache.path.clone() {
            Some(p) => p,
            None => Self::default_db_path()?,
        };
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let store = Arc::new(SqliteStore::new(&db_path, config.cache.capacity_bytes)?);
        let client = Arc::new(HttpRedirectClient::new(
            config.resolver.request_timeout(),
            &config.resolver.user_agent,
        )?);

        Ok(Self::with_parts(config, store, client, notifier))
    }

    pub fn in_memory(config: Config, notifier: Arc<dyn Notifier + Send + Sync>) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory_with_capacity(
            config.cache.capacity_bytes,
        )?);
        let client = Arc::new(HttpRedirectClient::new(
            config.resolver.request_timeout(),
            &config.resolver.user_agent,
        )?);

        Ok(Self::with_parts(config, store, client, notifier))
    }

    pub fn with_parts(
        config: Config,
        store: Arc<SqliteStore>,
        client: Arc<dyn RedirectClient + Send + Sync>,
        notifier: Arc<dyn Notifier + Send + Sync>,
    ) -> Self {
        let bus = EventBus::new();
        let idle = IdleTracker::new();
        let cache = ResolutionCache::new(store.clone());
        let resolver = Arc::new(Resolver::new(
            client,
            bus.clone(),
            idle.clone(),
            notifier,
            config.resolver.settings(),
        ));
        let router = Router::new(
            bus.clone(),
            cache.clone(),
            idle.clone(),
            config.routing.mobile_redirect_hosts.clone(),
        );

        Self {
            config,
            store,
            cache,
            bus,
            idle,
            resolver,
            router,
        }
    }

    /// Start the resolver, cache writer and analytics subscribers.
    pub fn start(&self) -> Services {
        let handles = vec![
            spawn_resolver(self.resolver.clone(), &self.bus),
            spawn_cache_writer(self.cache.clone(), &self.bus),
            spawn_analytics(&self.bus),
        ];
        Services { handles }
    }

    /// Wait for in-flight resolutions, close the bus and let every
    /// subscriber drain its queue. Requests the router has already published
    /// count as in flight, so they finish and reach the cache first.
    pub async fn shutdown(&self, services: Services) {
        self.idle.wait_idle().await;
        self.bus.close();

        for handle in services.handles {
            if let Err(e) = handle.await {
                error!("Task join error: {}", e);
            }
        }
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| UrlsetterError::Config("Could not find data directory".into()))?;
        Ok(data_dir.join("urlsetter").join("cache.db"))
    }
}
