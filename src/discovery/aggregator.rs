use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use super::runners::{
    DiscoveryRunner, HttpFetcher, PatternRunner, ScraperOptions, ScraperRunner, ThirdPartyRunner,
};
use super::{DiscoveryError, DiscoveryMethod, DiscoveryRequest, DiscoveryResult, EmailCandidate, ProviderStatus};
use crate::cache::{get_json, set_json};
use crate::config::Settings;
use crate::context::Context;
use crate::error::CoreError;
use crate::syntax::parse_domain;

/// Fans a request out to every available runner and merges what they find.
pub struct DiscoveryAggregator {
    runners: Vec<Arc<dyn DiscoveryRunner>>,
}

impl DiscoveryAggregator {
    /// No runners; add them with [`with_runner`](Self::with_runner).
    pub fn new() -> Self {
        Self {
            runners: Vec::new(),
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn DiscoveryRunner>) -> Self {
        self.runners.push(runner);
        self
    }

    /// Pattern, scraper and third-party runners sharing one HTTP client.
    pub fn from_settings(settings: &Settings) -> Result<Self, reqwest::Error> {
        let discovery = &settings.discovery;
        let client = Client::builder()
            .user_agent(discovery.user_agent.as_str())
            .timeout(Duration::from_secs(discovery.page_timeout_secs))
            .build()?;
        let fetcher = Arc::new(HttpFetcher::new(client.clone()));
        Ok(Self::new()
            .with_runner(Arc::new(ScraperRunner::new(
                fetcher,
                ScraperOptions::from(discovery),
            )))
            .with_runner(Arc::new(ThirdPartyRunner::new(client, discovery)))
            .with_runner(Arc::new(PatternRunner)))
    }

    pub fn provider_status(&self) -> Vec<ProviderStatus> {
        self.runners
            .iter()
            .map(|runner| ProviderStatus {
                method: runner.method(),
                name: runner.name().to_string(),
                available: runner.is_available(),
                description: runner.description().to_string(),
            })
            .collect()
    }

    #[instrument(skip(self, ctx, request), fields(domain = %request.domain))]
    pub async fn discover(
        &self,
        ctx: &Context,
        request: &DiscoveryRequest,
    ) -> Result<DiscoveryResult, CoreError> {
        let domain = normalize_domain(&request.domain)?;
        if request.methods.is_empty() {
            return Err(CoreError::invalid("at least one discovery method is required"));
        }
        let key = cache_key(&domain, &request.methods, request.detailed);
        if let Some(mut hit) = get_json::<DiscoveryResult>(ctx.cache(), &key).await? {
            debug!(%key, "discovery cache hit");
            hit.cached = true;
            return Ok(hit);
        }

        let selected: Vec<Arc<dyn DiscoveryRunner>> = self
            .runners
            .iter()
            .filter(|runner| request.methods.contains(&runner.method()) && runner.is_available())
            .cloned()
            .collect();
        if selected.is_empty() {
            return Err(CoreError::NoAvailableMethods);
        }

        let deadline = ctx.settings().discovery_timeout();
        let runner_timeout = ctx.settings().runner_timeout();
        let result = timeout(
            deadline,
            run_all(&selected, &domain, runner_timeout, request.detailed),
        )
        .await
        .map_err(|_| CoreError::Timeout { after: deadline })?;

        set_json(ctx.cache(), &key, &result, ctx.settings().cache_ttl()).await?;
        info!(
            found = result.total_found,
            methods = ?result.methods_used,
            "discovery finished"
        );
        Ok(result)
    }
}

impl Default for DiscoveryAggregator {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_all(
    runners: &[Arc<dyn DiscoveryRunner>],
    domain: &str,
    runner_timeout: Duration,
    detailed: bool,
) -> DiscoveryResult {
    let outcomes = join_all(runners.iter().map(|runner| async move {
        let outcome = match timeout(runner_timeout, runner.discover(domain)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(DiscoveryError::Transient(format!(
                "timed out after {runner_timeout:?}"
            ))),
        };
        (runner.method(), runner.name(), outcome)
    }))
    .await;

    let mut methods_used = BTreeSet::new();
    let mut candidates = Vec::new();
    for (method, name, outcome) in outcomes {
        match outcome {
            Ok(found) => {
                debug!(runner = name, found = found.len(), "runner finished");
                methods_used.insert(method);
                candidates.extend(found);
            }
            Err(DiscoveryError::Unavailable(_)) => {
                debug!(runner = name, "runner unavailable");
            }
            Err(err) => {
                warn!(runner = name, error = %err, "runner failed");
            }
        }
    }

    let mut emails = merge(candidates);
    if !detailed {
        for candidate in &mut emails {
            candidate.found_at = None;
        }
    }
    DiscoveryResult {
        domain: domain.to_string(),
        total_found: emails.len(),
        emails,
        cached: false,
        methods_used,
    }
}

/// One entry per lower-cased address: highest confidence wins, then the
/// higher-priority method. Sorted by confidence, priority, address.
pub(crate) fn merge(candidates: Vec<EmailCandidate>) -> Vec<EmailCandidate> {
    let mut best: HashMap<String, EmailCandidate> = HashMap::new();
    for mut candidate in candidates {
        candidate.email = candidate.email.trim().to_lowercase();
        match best.get(&candidate.email) {
            Some(existing) if rank(existing, &candidate) != Ordering::Greater => {}
            _ => {
                best.insert(candidate.email.clone(), candidate);
            }
        }
    }
    let mut merged: Vec<EmailCandidate> = best.into_values().collect();
    merged.sort_by(|a, b| rank(a, b).then_with(|| a.email.cmp(&b.email)));
    merged
}

/// `Less` when `a` should come first.
fn rank(a: &EmailCandidate, b: &EmailCandidate) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| a.source.method().priority().cmp(&b.source.method().priority()))
}

/// `discovery:<domain>:<methods, sorted>:<detailed>`
pub fn cache_key(domain: &str, methods: &BTreeSet<DiscoveryMethod>, detailed: bool) -> String {
    let methods: Vec<&str> = methods.iter().map(DiscoveryMethod::as_str).collect();
    format!("discovery:{domain}:{}:{detailed}", methods.join(","))
}

/// Accepts bare domains as well as pasted URLs (`https://www.Example.com/about`).
pub fn normalize_domain(raw: &str) -> Result<String, CoreError> {
    let mut host = raw.trim().to_lowercase();
    if let Some((_, rest)) = host.split_once("://") {
        host = rest.to_string();
    }
    if let Some(end) = host.find(['/', '?', '#']) {
        host.truncate(end);
    }
    if let Some((_, rest)) = host.rsplit_once('@') {
        host = rest.to_string();
    }
    if let Some((name, port)) = host.rsplit_once(':') {
        if port.chars().all(|c| c.is_ascii_digit()) {
            host = name.to_string();
        }
    }
    let host = host.trim_end_matches('.');
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.is_empty() {
        return Err(CoreError::invalid("domain is empty"));
    }
    parse_domain(host)
        .map_err(|reasons| CoreError::invalid(format!("invalid domain: {}", reasons.join("; "))))
}
