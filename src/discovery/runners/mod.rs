//! Discovery runners: one per [`DiscoveryMethod`]. New providers implement
//! [`DiscoveryRunner`] and register with the aggregator.

mod pattern;
mod scraper;
mod third_party;

pub use pattern::PatternRunner;
pub use scraper::{HttpFetcher, Page, PageFetcher, ScraperOptions, ScraperRunner};
pub use third_party::{ThirdPartyRunner, parse_domain_search};

use async_trait::async_trait;

use super::{DiscoveryError, DiscoveryMethod, EmailCandidate};

#[async_trait]
pub trait DiscoveryRunner: Send + Sync {
    fn method(&self) -> DiscoveryMethod;
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn is_available(&self) -> bool;
    /// `domain` is already normalized (lower-case ASCII, no scheme or path).
    async fn discover(&self, domain: &str) -> Result<Vec<EmailCandidate>, DiscoveryError>;
}
