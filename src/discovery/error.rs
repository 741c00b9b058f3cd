use thiserror::Error;

/// Failure of a single runner. The aggregator logs it and carries on with
/// the other runners.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("provider {0} is not available")]
    Unavailable(&'static str),
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("HTTP request failed: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },
    #[error("provider returned an error: {0}")]
    Provider(String),
}
