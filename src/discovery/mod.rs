//! Finding candidate addresses for a domain.
//!
//! Each [`DiscoveryMethod`] is served by a [`DiscoveryRunner`]; the
//! [`DiscoveryAggregator`] runs the requested ones concurrently, isolates
//! their failures and merges the candidates.

mod aggregator;
mod error;
pub mod runners;
mod types;

pub use aggregator::{DiscoveryAggregator, cache_key, normalize_domain};
pub use error::DiscoveryError;
pub use runners::DiscoveryRunner;
pub use types::{
    CandidateSource, DiscoveryMethod, DiscoveryRequest, DiscoveryResult, EmailCandidate,
    ProviderStatus,
};
