use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tokio::time::{Instant, timeout};
use tracing::{debug, instrument};
use url::Url;

use super::DiscoveryRunner;
use crate::config::DiscoverySettings;
use crate::discovery::{CandidateSource, DiscoveryError, DiscoveryMethod, EmailCandidate};

const CONTACT_CONFIDENCE: f64 = 0.9;
const PAGE_TEXT_CONFIDENCE: f64 = 0.6;
/// Crawl budgets too large for an `Instant` are clamped to this.
const MAX_CRAWL_BUDGET: Duration = Duration::from_secs(24 * 60 * 60);

/// Visited right after the homepage, before any discovered link.
const TARGETED_PATHS: &[&str] = &[
    "/contact", "/contact-us", "/about", "/about-us", "/team", "/people", "/leadership", "/press",
];

const CONTACT_KEYWORDS: &[&str] = &[
    "contact", "about", "team", "people", "staff", "leadership", "impressum", "imprint",
];

const SKIPPED_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".ico", ".pdf", ".zip", ".css", ".js",
    ".xml", ".mp4", ".mp3", ".woff", ".woff2",
];

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").expect("valid email regex")
});

static MAILTO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)mailto:([^"'?\s<>]+)"#).expect("valid mailto regex")
});

static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)href\s*=\s*["']([^"'#]+)"#).expect("valid href regex")
});

/// A fetched HTML page. `url` is the final URL after redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: Url,
    pub body: String,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Page, DiscoveryError>;
}

/// `reqwest` fetcher; non-2xx answers are errors.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Page, DiscoveryError> {
        let response = self.client.get(url.clone()).send().await?.error_for_status()?;
        let url = response.url().clone();
        let body = response.text().await?;
        Ok(Page { url, body })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScraperOptions {
    /// Link hops followed from the homepage (targeted pages count as one).
    pub crawl_depth: usize,
    pub max_pages: usize,
    pub page_timeout: Duration,
    /// Total time the crawl may take.
    pub crawl_budget: Duration,
}

impl Default for ScraperOptions {
    fn default() -> Self {
        Self::from(&DiscoverySettings::default())
    }
}

impl From<&DiscoverySettings> for ScraperOptions {
    fn from(settings: &DiscoverySettings) -> Self {
        Self {
            crawl_depth: settings.crawl_depth,
            max_pages: settings.max_pages,
            page_timeout: Duration::from_secs(settings.page_timeout_secs),
            crawl_budget: Duration::from_secs(settings.crawl_budget_secs),
        }
    }
}

/// Crawls the domain's own website for addresses at that domain.
pub struct ScraperRunner {
    fetcher: Arc<dyn PageFetcher>,
    options: ScraperOptions,
}

impl ScraperRunner {
    pub fn new(fetcher: Arc<dyn PageFetcher>, options: ScraperOptions) -> Self {
        Self { fetcher, options }
    }
}

#[async_trait]
impl DiscoveryRunner for ScraperRunner {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::Scraping
    }

    fn name(&self) -> &'static str {
        "web_scraping"
    }

    fn description(&self) -> &'static str {
        "addresses published on the domain's website (contact, about and team pages first)"
    }

    fn is_available(&self) -> bool {
        true
    }

    #[instrument(skip(self))]
    async fn discover(&self, domain: &str) -> Result<Vec<EmailCandidate>, DiscoveryError> {
        let homepage = Url::parse(&format!("https://{domain}/"))
            .map_err(|err| DiscoveryError::Transient(format!("bad homepage url: {err}")))?;
        let mut crawl = Crawl::new(domain, self.options.crawl_depth);
        crawl.push(homepage.clone(), 0, true);
        if self.options.crawl_depth > 0 {
            for path in TARGETED_PATHS {
                if let Ok(url) = homepage.join(path) {
                    crawl.push(url, 1, true);
                }
            }
        }

        let started = Instant::now();
        let deadline = started
            .checked_add(self.options.crawl_budget)
            .unwrap_or_else(|| started + MAX_CRAWL_BUDGET);
        let mut found: HashMap<String, EmailCandidate> = HashMap::new();
        let mut attempted = 0usize;
        let mut fetched = 0usize;

        while let Some((url, depth)) = crawl.pop() {
            if attempted >= self.options.max_pages {
                break;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!(domain, "crawl budget exhausted");
                break;
            }
            attempted += 1;

            let page_deadline = remaining.min(self.options.page_timeout);
            let page = match timeout(page_deadline, self.fetcher.fetch(&url)).await {
                Ok(Ok(page)) => page,
                Ok(Err(err)) => {
                    debug!(%url, error = %err, "page skipped");
                    continue;
                }
                Err(_) => {
                    debug!(%url, "page timed out");
                    continue;
                }
            };
            fetched += 1;

            for candidate in extract_candidates(&page, domain) {
                keep_best(&mut found, candidate);
            }
            for link in extract_links(&page) {
                crawl.push(link, depth + 1, false);
            }
        }

        if fetched == 0 {
            return Err(DiscoveryError::Transient(format!(
                "no page of {domain} could be fetched"
            )));
        }
        debug!(domain, pages = fetched, found = found.len(), "crawl finished");
        Ok(found.into_values().collect())
    }
}

/// Crawl frontier: contact-like pages jump ahead of ordinary links.
struct Crawl {
    domain: String,
    max_depth: usize,
    seen: HashSet<String>,
    priority: VecDeque<(Url, usize)>,
    regular: VecDeque<(Url, usize)>,
}

impl Crawl {
    fn new(domain: &str, max_depth: usize) -> Self {
        Self {
            domain: domain.to_string(),
            max_depth,
            seen: HashSet::new(),
            priority: VecDeque::new(),
            regular: VecDeque::new(),
        }
    }

    fn push(&mut self, mut url: Url, depth: usize, targeted: bool) {
        if depth > self.max_depth || !is_same_site(&url, &self.domain) || is_asset(&url) {
            return;
        }
        url.set_fragment(None);
        let key = canonical_key(&url);
        if !self.seen.insert(key) {
            return;
        }
        if targeted || is_contact_url(&url) {
            self.priority.push_back((url, depth));
        } else {
            self.regular.push_back((url, depth));
        }
    }

    fn pop(&mut self) -> Option<(Url, usize)> {
        self.priority
            .pop_front()
            .or_else(|| self.regular.pop_front())
    }
}

fn canonical_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(host);
    let path = url.path().trim_end_matches('/');
    match url.query() {
        Some(query) => format!("{host}{path}?{query}"),
        None => format!("{host}{path}"),
    }
}

fn is_same_site(url: &Url, domain: &str) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    match url.host_str() {
        Some(host) => {
            let host = host.to_ascii_lowercase();
            host == domain || host.strip_prefix("www.") == Some(domain)
        }
        None => false,
    }
}

fn is_asset(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    SKIPPED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

fn is_contact_url(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    CONTACT_KEYWORDS.iter().any(|keyword| path.contains(keyword))
}

fn keep_best(found: &mut HashMap<String, EmailCandidate>, candidate: EmailCandidate) {
    match found.get(&candidate.email) {
        Some(existing) if existing.confidence >= candidate.confidence => {}
        _ => {
            found.insert(candidate.email.clone(), candidate);
        }
    }
}

/// Addresses at `domain` on the page. `mailto:` links and any address on a
/// contact-like page score higher than plain page text.
pub(crate) fn extract_candidates(page: &Page, domain: &str) -> Vec<EmailCandidate> {
    let suffix = format!("@{domain}");
    let on_target = |email: &str| email.ends_with(&suffix);
    let text_confidence = if is_contact_url(&page.url) {
        CONTACT_CONFIDENCE
    } else {
        PAGE_TEXT_CONFIDENCE
    };
    let found_at = page.url.as_str();

    let mut out: HashMap<String, EmailCandidate> = HashMap::new();
    for capture in MAILTO_RE.captures_iter(&page.body) {
        let email = capture[1].trim().to_ascii_lowercase();
        if on_target(&email) {
            let candidate = EmailCandidate::new(email, CandidateSource::Scraping, CONTACT_CONFIDENCE)
                .found_at(found_at);
            keep_best(&mut out, candidate);
        }
    }
    for hit in EMAIL_RE.find_iter(&page.body) {
        let email = hit.as_str().to_ascii_lowercase();
        if on_target(&email) {
            let candidate = EmailCandidate::new(email, CandidateSource::Scraping, text_confidence)
                .found_at(found_at);
            keep_best(&mut out, candidate);
        }
    }
    out.into_values().collect()
}

pub(crate) fn extract_links(page: &Page) -> Vec<Url> {
    HREF_RE
        .captures_iter(&page.body)
        .filter_map(|capture| {
            let href = capture[1].trim();
            if href.starts_with("mailto:") || href.starts_with("javascript:") {
                return None;
            }
            page.url.join(href).ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serves bodies keyed by URL; anything else is a 404. Each answer
    /// arrives after `delay`, or after the URL's entry in `overrides`.
    struct StubFetcher {
        pages: HashMap<String, String>,
        requested: Mutex<Vec<String>>,
        delay: Duration,
        overrides: HashMap<String, Duration>,
    }

    impl StubFetcher {
        fn new(pages: &[(&str, &str)]) -> Arc<Self> {
            Self::slow(pages, Duration::ZERO, &[])
        }

        fn slow(
            pages: &[(&str, &str)],
            delay: Duration,
            overrides: &[(&str, Duration)],
        ) -> Arc<Self> {
            Arc::new(Self {
                pages: pages
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.to_string()))
                    .collect(),
                requested: Mutex::new(Vec::new()),
                delay,
                overrides: overrides
                    .iter()
                    .map(|(url, delay)| (url.to_string(), *delay))
                    .collect(),
            })
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &Url) -> Result<Page, DiscoveryError> {
            self.requested.lock().unwrap().push(url.to_string());
            let delay = self.overrides.get(url.as_str()).copied().unwrap_or(self.delay);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match self.pages.get(url.as_str()) {
                Some(body) => Ok(Page {
                    url: url.clone(),
                    body: body.clone(),
                }),
                None => Err(DiscoveryError::Transient(format!("404 {url}"))),
            }
        }
    }

    fn runner(fetcher: Arc<StubFetcher>, options: ScraperOptions) -> ScraperRunner {
        ScraperRunner::new(fetcher, options)
    }

    fn find<'a>(found: &'a [EmailCandidate], email: &str) -> &'a EmailCandidate {
        found
            .iter()
            .find(|c| c.email == email)
            .unwrap_or_else(|| panic!("{email} not found in {found:?}"))
    }

    #[tokio::test]
    async fn scores_mailto_contact_pages_and_plain_text() {
        let fetcher = StubFetcher::new(&[
            (
                "https://example.com/",
                r#"<p>Write to news@example.com</p>
                   <a href="mailto:sales@example.com?subject=hi">Sales</a>
                   <a href="/blog/post">post</a>
                   <p>partner: bob@other.org</p>"#,
            ),
            ("https://example.com/contact", "<p>Reach jane@Example.com</p>"),
            ("https://example.com/blog/post", "<p>author: amy@example.com</p>"),
        ]);
        let found = runner(fetcher, ScraperOptions::default())
            .discover("example.com")
            .await
            .unwrap();

        assert_eq!(find(&found, "sales@example.com").confidence, 0.9);
        assert_eq!(find(&found, "news@example.com").confidence, 0.6);
        assert_eq!(find(&found, "amy@example.com").confidence, 0.6);
        let jane = find(&found, "jane@example.com");
        assert_eq!(jane.confidence, 0.9);
        assert_eq!(jane.found_at.as_deref(), Some("https://example.com/contact"));
        assert!(found.iter().all(|c| c.email.ends_with("@example.com")));
        assert!(found.iter().all(|c| c.source == CandidateSource::Scraping));
    }

    #[tokio::test]
    async fn targeted_pages_come_before_discovered_links() {
        let fetcher = StubFetcher::new(&[(
            "https://example.com/",
            r#"<a href="/zzz">z</a><a href="https://www.example.com/our-team">team</a>"#,
        )]);
        let options = ScraperOptions {
            max_pages: 20,
            ..ScraperOptions::default()
        };
        let _ = runner(fetcher.clone(), options)
            .discover("example.com")
            .await
            .unwrap();
        let requested = fetcher.requested.lock().unwrap().clone();
        assert_eq!(requested[0], "https://example.com/");
        assert_eq!(requested[1], "https://example.com/contact");
        let team = requested.iter().position(|u| u.ends_with("/our-team")).unwrap();
        let other = requested.iter().position(|u| u.ends_with("/zzz")).unwrap();
        assert!(team < other);
    }

    #[tokio::test]
    async fn foreign_hosts_are_not_crawled() {
        let fetcher = StubFetcher::new(&[(
            "https://example.com/",
            r#"<a href="https://evil.test/contact">x</a><a href="https://sub.example.com/a">y</a>"#,
        )]);
        let _ = runner(fetcher.clone(), ScraperOptions::default())
            .discover("example.com")
            .await
            .unwrap();
        let requested = fetcher.requested.lock().unwrap();
        assert!(requested.iter().all(|u| u.starts_with("https://example.com/")));
    }

    #[tokio::test]
    async fn max_pages_bounds_the_crawl() {
        let fetcher = StubFetcher::new(&[("https://example.com/", "info@example.com")]);
        let options = ScraperOptions {
            max_pages: 3,
            ..ScraperOptions::default()
        };
        let _ = runner(fetcher.clone(), options).discover("example.com").await;
        assert_eq!(fetcher.requested.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn depth_zero_fetches_only_the_homepage() {
        let fetcher = StubFetcher::new(&[(
            "https://example.com/",
            r#"<a href="/contact">c</a> info@example.com"#,
        )]);
        let options = ScraperOptions {
            crawl_depth: 0,
            ..ScraperOptions::default()
        };
        let found = runner(fetcher.clone(), options)
            .discover("example.com")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(fetcher.requested.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_page_is_skipped_and_crawl_continues() {
        let fetcher = StubFetcher::slow(
            &[
                ("https://example.com/", "info@example.com"),
                ("https://example.com/contact", "jane@example.com"),
                ("https://example.com/contact-us", "bob@example.com"),
            ],
            Duration::ZERO,
            &[("https://example.com/contact", Duration::from_secs(30))],
        );
        let options = ScraperOptions {
            page_timeout: Duration::from_secs(2),
            crawl_budget: Duration::from_secs(60),
            ..ScraperOptions::default()
        };
        let found = runner(fetcher.clone(), options)
            .discover("example.com")
            .await
            .unwrap();

        assert!(found.iter().any(|c| c.email == "info@example.com"));
        assert!(found.iter().any(|c| c.email == "bob@example.com"));
        assert!(found.iter().all(|c| c.email != "jane@example.com"));
        let requested = fetcher.requested.lock().unwrap();
        assert_eq!(requested[1], "https://example.com/contact");
        assert_eq!(requested[2], "https://example.com/contact-us");
    }

    #[tokio::test(start_paused = true)]
    async fn crawl_stops_when_budget_is_spent() {
        let fetcher = StubFetcher::slow(
            &[("https://example.com/", "info@example.com")],
            Duration::from_secs(4),
            &[("https://example.com/", Duration::ZERO)],
        );
        let options = ScraperOptions {
            page_timeout: Duration::from_secs(5),
            crawl_budget: Duration::from_secs(10),
            max_pages: 20,
            ..ScraperOptions::default()
        };
        let started = Instant::now();
        let found = runner(fetcher.clone(), options)
            .discover("example.com")
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert!(started.elapsed() <= Duration::from_secs(10));
        // homepage, /contact, /contact-us and /about (cut short); 5 targeted pages left
        assert_eq!(fetcher.requested.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn oversized_budget_does_not_overflow() {
        let fetcher = StubFetcher::new(&[("https://example.com/", "info@example.com")]);
        let options = ScraperOptions {
            crawl_budget: Duration::MAX,
            ..ScraperOptions::default()
        };
        let found = runner(fetcher, options).discover("example.com").await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn unreachable_site_is_an_error() {
        let fetcher = StubFetcher::new(&[]);
        let err = runner(fetcher, ScraperOptions::default())
            .discover("example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::Transient(_)));
    }

    #[test]
    fn links_resolve_relative_to_page() {
        let page = Page {
            url: Url::parse("https://example.com/a/b").unwrap(),
            body: r#"<a href="c">x</a><a href='/d?x=1'>y</a><a href="mailto:a@example.com">z</a>"#
                .to_string(),
        };
        let links: Vec<String> = extract_links(&page).iter().map(Url::to_string).collect();
        assert_eq!(links, vec!["https://example.com/a/c", "https://example.com/d?x=1"]);
    }
}
