use async_trait::async_trait;

use super::DiscoveryRunner;
use crate::discovery::{CandidateSource, DiscoveryError, DiscoveryMethod, EmailCandidate};

const PATTERN_CONFIDENCE: f64 = 0.7;

const ROLE_LOCAL_PARTS: &[&str] = &[
    "info", "contact", "admin", "sales", "support", "hello", "help", "service", "marketing",
    "team", "office", "general", "inquiries", "business", "careers", "jobs", "hr", "press",
    "media", "billing", "accounts", "finance", "legal", "privacy", "security", "webmaster",
    "postmaster", "abuse", "partnerships", "partners", "investors", "tech",
];

/// Role addresses most organisations run. Always available, no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternRunner;

impl PatternRunner {
    pub fn candidates(domain: &str) -> Vec<EmailCandidate> {
        let domain = domain.to_ascii_lowercase();
        ROLE_LOCAL_PARTS
            .iter()
            .map(|local| {
                EmailCandidate::new(
                    format!("{local}@{domain}"),
                    CandidateSource::Pattern,
                    PATTERN_CONFIDENCE,
                )
            })
            .collect()
    }
}

#[async_trait]
impl DiscoveryRunner for PatternRunner {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::Patterns
    }

    fn name(&self) -> &'static str {
        "pattern_matching"
    }

    fn description(&self) -> &'static str {
        "common role addresses (info@, sales@, support@, ...)"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn discover(&self, domain: &str) -> Result<Vec<EmailCandidate>, DiscoveryError> {
        Ok(Self::candidates(domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn generates_unique_role_addresses() {
        let out = PatternRunner.discover("Example.com").await.unwrap();
        assert_eq!(out.len(), ROLE_LOCAL_PARTS.len());
        let unique: HashSet<_> = out.iter().map(|c| c.email.as_str()).collect();
        assert_eq!(unique.len(), out.len());
        assert!(unique.contains("info@example.com"));
        assert!(unique.contains("postmaster@example.com"));
        assert!(out.iter().all(|c| c.source == CandidateSource::Pattern));
        assert!(out.iter().all(|c| (c.confidence - 0.7).abs() < f64::EPSILON));
        assert!(out.iter().all(|c| c.found_at.is_none()));
    }
}
