//! Key/value store with per-entry time-to-live.
//!
//! Two backends share the [`CacheBackend`] contract: the in-process
//! [`MemoryCache`] and, behind the `with-redis` feature, [`RedisCache`].
//! Expiry is passive: an expired entry is simply never returned again.

mod error;
mod memory;
#[cfg(feature = "with-redis")]
mod redis_cache;

pub use error::CacheError;
pub use memory::MemoryCache;
#[cfg(feature = "with-redis")]
pub use redis_cache::RedisCache;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Reads and decodes a JSON value.
pub async fn get_json<T>(cache: &dyn CacheBackend, key: &str) -> Result<Option<T>, CacheError>
where
    T: DeserializeOwned,
{
    match cache.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encodes `value` as JSON and stores it for `ttl`.
pub async fn set_json<T>(
    cache: &dyn CacheBackend,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<(), CacheError>
where
    T: Serialize + Sync,
{
    let raw = serde_json::to_string(value)?;
    cache.set(key, raw, ttl).await
}
