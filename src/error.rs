use std::time::Duration;

use thiserror::Error;

use crate::cache::CacheError;

/// Errors surfaced by the validation pipeline and the discovery aggregator.
/// Stage failures are not errors; they are reported in the result.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("none of the requested discovery methods is available")]
    NoAvailableMethods,
    #[error("request timed out after {after:?}")]
    Timeout { after: Duration },
    #[error("cache failure: {0}")]
    Cache(#[source] CacheError),
    #[error("cached value could not be decoded: {0}")]
    Serialization(#[source] serde_json::Error),
}

impl CoreError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    /// Maps to the exit/status class the inbound layer reports.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::NoAvailableMethods)
    }
}

impl From<CacheError> for CoreError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Serialization { source } => Self::Serialization(source),
            other => Self::Cache(other),
        }
    }
}
