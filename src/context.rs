//! Process-wide state handed to every request.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{CacheBackend, MemoryCache};
use crate::config::Settings;

/// Settings plus the cache backend, built once at startup.
#[derive(Clone)]
pub struct Context {
    settings: Arc<Settings>,
    cache: Arc<dyn CacheBackend>,
}

impl Context {
    pub fn new(settings: Settings, cache: Arc<dyn CacheBackend>) -> Self {
        Self {
            settings: Arc::new(settings),
            cache,
        }
    }

    /// Context backed by an in-process cache.
    pub fn in_memory(settings: Settings) -> Self {
        Self::new(settings, Arc::new(MemoryCache::new()))
    }

    /// Uses Redis when a URL is configured and reachable, the in-process
    /// cache otherwise.
    pub async fn connect(settings: Settings) -> Self {
        let Some(url) = settings.cache.redis_url.clone() else {
            return Self::in_memory(settings);
        };
        Self::connect_redis(settings, &url).await
    }

    #[cfg(feature = "with-redis")]
    async fn connect_redis(settings: Settings, url: &str) -> Self {
        match crate::cache::RedisCache::connect(url).await {
            Ok(cache) => {
                info!("using redis cache");
                Self::new(settings, Arc::new(cache))
            }
            Err(err) => {
                warn!(error = %err, "redis unavailable, falling back to in-memory cache");
                Self::in_memory(settings)
            }
        }
    }

    #[cfg(not(feature = "with-redis"))]
    async fn connect_redis(settings: Settings, _url: &str) -> Self {
        warn!("redis_url is set but the with-redis feature is disabled, using in-memory cache");
        info!("using in-memory cache");
        Self::in_memory(settings)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache(&self) -> &dyn CacheBackend {
        self.cache.as_ref()
    }
}
