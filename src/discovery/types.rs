use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Ways of finding addresses for a domain. Lower [`priority`](Self::priority)
/// wins ties when the same address is found twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    Scraping,
    Patterns,
    ThirdParty,
}

impl DiscoveryMethod {
    pub const ALL: [DiscoveryMethod; 3] = [Self::Scraping, Self::Patterns, Self::ThirdParty];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scraping => "scraping",
            Self::Patterns => "patterns",
            Self::ThirdParty => "third_party",
        }
    }

    pub fn priority(&self) -> u8 {
        match self {
            Self::Scraping => 0,
            Self::ThirdParty => 1,
            Self::Patterns => 2,
        }
    }
}

impl fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscoveryMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "scraping" => Ok(Self::Scraping),
            "patterns" => Ok(Self::Patterns),
            "third_party" => Ok(Self::ThirdParty),
            other => Err(format!("unknown discovery method '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Pattern,
    Scraping,
    ThirdParty,
}

impl CandidateSource {
    pub fn method(&self) -> DiscoveryMethod {
        match self {
            Self::Pattern => DiscoveryMethod::Patterns,
            Self::Scraping => DiscoveryMethod::Scraping,
            Self::ThirdParty => DiscoveryMethod::ThirdParty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailCandidate {
    pub email: String,
    pub source: CandidateSource,
    /// In `[0, 1]`.
    pub confidence: f64,
    /// Page the address was seen on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found_at: Option<String>,
}

impl EmailCandidate {
    pub fn new(email: impl Into<String>, source: CandidateSource, confidence: f64) -> Self {
        Self {
            email: email.into(),
            source,
            confidence: confidence.clamp(0.0, 1.0),
            found_at: None,
        }
    }

    pub fn found_at(mut self, url: impl Into<String>) -> Self {
        self.found_at = Some(url.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryRequest {
    pub domain: String,
    #[serde(default = "default_methods")]
    pub methods: BTreeSet<DiscoveryMethod>,
    #[serde(default = "default_detailed")]
    pub detailed: bool,
}

fn default_methods() -> BTreeSet<DiscoveryMethod> {
    [DiscoveryMethod::Scraping, DiscoveryMethod::Patterns]
        .into_iter()
        .collect()
}

fn default_detailed() -> bool {
    true
}

impl DiscoveryRequest {
    /// Scraping and patterns, detailed.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            methods: default_methods(),
            detailed: true,
        }
    }

    pub fn methods<I>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = DiscoveryMethod>,
    {
        self.methods = methods.into_iter().collect();
        self
    }

    pub fn detailed(mut self, detailed: bool) -> Self {
        self.detailed = detailed;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub domain: String,
    pub emails: Vec<EmailCandidate>,
    pub total_found: usize,
    pub cached: bool,
    pub methods_used: BTreeSet<DiscoveryMethod>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub method: DiscoveryMethod,
    pub name: String,
    pub available: bool,
    pub description: String,
}
