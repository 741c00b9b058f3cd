use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Backend(String),
    #[error("cached value could not be (de)serialized: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

#[cfg(feature = "with-redis")]
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        Self::Backend(err.to_string())
    }
}
