use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::DiscoveryRunner;
use crate::config::DiscoverySettings;
use crate::discovery::{CandidateSource, DiscoveryError, DiscoveryMethod, EmailCandidate};

const NAME: &str = "hunter_io";
const RESULT_LIMIT: &str = "100";
/// Used when the provider omits a score.
const DEFAULT_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Deserialize)]
struct DomainSearch {
    #[serde(default)]
    data: Option<DomainSearchData>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct DomainSearchData {
    #[serde(default)]
    emails: Vec<ApiEmail>,
}

#[derive(Debug, Deserialize)]
struct ApiEmail {
    value: String,
    /// Percent, 0..=100.
    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

/// Hunter.io domain search. Only offered when third-party lookups are
/// enabled and an API key is configured.
pub struct ThirdPartyRunner {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    enabled: bool,
}

impl ThirdPartyRunner {
    pub fn new(client: Client, settings: &DiscoverySettings) -> Self {
        Self {
            client,
            base_url: settings.hunter_base_url.trim_end_matches('/').to_string(),
            api_key: settings.hunter_api_key.clone().filter(|key| !key.is_empty()),
            enabled: settings.enable_third_party,
        }
    }
}

#[async_trait]
impl DiscoveryRunner for ThirdPartyRunner {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::ThirdParty
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Hunter.io domain search (needs an API key)"
    }

    fn is_available(&self) -> bool {
        self.enabled && self.api_key.is_some()
    }

    #[instrument(skip(self))]
    async fn discover(&self, domain: &str) -> Result<Vec<EmailCandidate>, DiscoveryError> {
        let api_key = match (&self.api_key, self.enabled) {
            (Some(key), true) => key,
            _ => return Err(DiscoveryError::Unavailable(NAME)),
        };
        let url = format!("{}/v2/domain-search", self.base_url);
        let body = self
            .client
            .get(url)
            .query(&[("domain", domain), ("api_key", api_key.as_str()), ("limit", RESULT_LIMIT)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let found = parse_domain_search(&body, domain)?;
        debug!(domain, found = found.len(), "domain search finished");
        Ok(found)
    }
}

/// Parses a domain-search response body. Scores are converted from percent;
/// addresses outside `domain` are dropped.
pub fn parse_domain_search(body: &str, domain: &str) -> Result<Vec<EmailCandidate>, DiscoveryError> {
    let parsed: DomainSearch = serde_json::from_str(body)
        .map_err(|err| DiscoveryError::Provider(format!("malformed response: {err}")))?;

    if let Some(first) = parsed.errors.first() {
        let reason = first
            .details
            .clone()
            .or_else(|| first.id.clone())
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(DiscoveryError::Provider(reason));
    }

    let suffix = format!("@{}", domain.to_ascii_lowercase());
    let emails = parsed.data.map(|data| data.emails).unwrap_or_default();
    Ok(emails
        .into_iter()
        .filter_map(|entry| {
            let email = entry.value.trim().to_ascii_lowercase();
            if !email.ends_with(&suffix) {
                return None;
            }
            let confidence = entry
                .confidence
                .map(|percent| percent / 100.0)
                .unwrap_or(DEFAULT_CONFIDENCE);
            Some(EmailCandidate::new(email, CandidateSource::ThirdParty, confidence))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(enabled: bool, key: Option<&str>) -> DiscoverySettings {
        DiscoverySettings {
            enable_third_party: enabled,
            hunter_api_key: key.map(str::to_string),
            ..DiscoverySettings::default()
        }
    }

    #[test]
    fn availability_needs_flag_and_key() {
        let client = Client::new();
        assert!(!ThirdPartyRunner::new(client.clone(), &settings(false, Some("k"))).is_available());
        assert!(!ThirdPartyRunner::new(client.clone(), &settings(true, None)).is_available());
        assert!(!ThirdPartyRunner::new(client.clone(), &settings(true, Some(""))).is_available());
        assert!(ThirdPartyRunner::new(client, &settings(true, Some("k"))).is_available());
    }

    #[tokio::test]
    async fn unavailable_runner_refuses_without_network() {
        let runner = ThirdPartyRunner::new(Client::new(), &settings(false, Some("k")));
        let err = runner.discover("example.com").await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Unavailable("hunter_io")));
    }

    #[test]
    fn scores_are_scaled_and_foreign_domains_dropped() {
        let body = r#"{
            "data": {
                "domain": "example.com",
                "emails": [
                    {"value": "Jane@Example.com", "confidence": 92},
                    {"value": "ops@example.com"},
                    {"value": "someone@elsewhere.org", "confidence": 99}
                ]
            },
            "meta": {"results": 3}
        }"#;
        let found = parse_domain_search(body, "example.com").unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].email, "jane@example.com");
        assert!((found[0].confidence - 0.92).abs() < 1e-9);
        assert_eq!(found[1].confidence, 0.5);
        assert!(found.iter().all(|c| c.source == CandidateSource::ThirdParty));
    }

    #[test]
    fn api_errors_surface_as_provider_errors() {
        let body = r#"{"errors": [{"id": "wrong_params", "code": 400, "details": "You are missing the domain parameter"}]}"#;
        let err = parse_domain_search(body, "example.com").unwrap_err();
        assert!(
            matches!(err, DiscoveryError::Provider(ref msg) if msg.contains("missing the domain"))
        );
    }

    #[test]
    fn empty_and_malformed_bodies() {
        assert!(parse_domain_search(r#"{"data": {}}"#, "example.com").unwrap().is_empty());
        assert!(matches!(
            parse_domain_search("<html>", "example.com"),
            Err(DiscoveryError::Provider(_))
        ));
    }
}
