//! Runtime settings: defaults, TOML file, then `MAILSCOUT_*` environment
//! overrides, validated once on load.

mod error;

pub use error::ConfigError;

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backoff::Backoff;
use crate::check::Stage;
use crate::mx::DnsOptions;
use crate::smtp_verify::SmtpProbeOptions;

const ENV_PREFIX: &str = "MAILSCOUT_";
/// Upper bound for `cache.ttl_secs` (30 days).
const MAX_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;
/// Upper bound for `discovery.crawl_budget_secs`.
const MAX_CRAWL_BUDGET_SECS: u64 = 60 * 60;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub cache: CacheSettings,
    pub dns: DnsSettings,
    pub smtp: SmtpSettings,
    pub validation: ValidationSettings,
    pub discovery: DiscoverySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    /// Durable shared cache. Without it (or without the `with-redis`
    /// feature) an in-process cache is used.
    pub redis_url: Option<String>,
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DnsSettings {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl Default for DnsSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            max_retries: 2,
            backoff_base_ms: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmtpSettings {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub port: u16,
    pub helo_domain: String,
    /// Empty means the null sender `<>`.
    pub mail_from: String,
    pub max_mx: usize,
    pub catch_all_check: bool,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_retries: 3,
            backoff_base_ms: 500,
            port: 25,
            helo_domain: "localhost".to_string(),
            mail_from: String::new(),
            max_mx: 3,
            catch_all_check: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationSettings {
    pub request_timeout_secs: u64,
    /// Stages whose failure does not stop the pipeline. Only `dns` is allowed.
    pub non_fatal_stages: Vec<Stage>,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 60,
            non_fatal_stages: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoverySettings {
    pub request_timeout_secs: u64,
    pub runner_timeout_secs: u64,
    pub user_agent: String,
    pub crawl_depth: usize,
    pub max_pages: usize,
    pub page_timeout_secs: u64,
    pub crawl_budget_secs: u64,
    pub enable_third_party: bool,
    pub hunter_api_key: Option<String>,
    pub hunter_base_url: String,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 45,
            runner_timeout_secs: 30,
            user_agent: concat!("mailscout/", env!("CARGO_PKG_VERSION")).to_string(),
            crawl_depth: 1,
            max_pages: 10,
            page_timeout_secs: 10,
            crawl_budget_secs: 25,
            enable_third_party: false,
            hunter_api_key: None,
            hunter_base_url: "https://api.hunter.io".to_string(),
        }
    }
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "reading configuration file");
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Defaults (or `path`), then the process environment, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env_vars(std::env::vars())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Applies the `MAILSCOUT_*` overrides found in `vars`; other variables
    /// are ignored.
    pub fn apply_env_vars<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.trim();
            match key {
                "REDIS_URL" => {
                    self.cache.redis_url = non_empty(value);
                }
                "CACHE_TTL" => self.cache.ttl_secs = parse_env(&name, value)?,
                "SMTP_TIMEOUT" => self.smtp.timeout_secs = parse_env(&name, value)?,
                "SMTP_MAX_RETRIES" => self.smtp.max_retries = parse_env(&name, value)?,
                "ENABLE_THIRD_PARTY" => {
                    self.discovery.enable_third_party = parse_bool(&name, value)?;
                }
                "HUNTER_API_KEY" => {
                    self.discovery.hunter_api_key = non_empty(value);
                }
                _ => debug!(variable = %name, "ignoring unknown environment override"),
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("cache.ttl_secs", self.cache.ttl_secs),
            ("dns.timeout_secs", self.dns.timeout_secs),
            ("smtp.timeout_secs", self.smtp.timeout_secs),
            ("validation.request_timeout_secs", self.validation.request_timeout_secs),
            ("discovery.request_timeout_secs", self.discovery.request_timeout_secs),
            ("discovery.runner_timeout_secs", self.discovery.runner_timeout_secs),
            ("discovery.page_timeout_secs", self.discovery.page_timeout_secs),
            ("discovery.crawl_budget_secs", self.discovery.crawl_budget_secs),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::invalid(key, "must be greater than zero"));
            }
        }
        let bounded = [
            ("cache.ttl_secs", self.cache.ttl_secs, MAX_CACHE_TTL_SECS),
            (
                "discovery.crawl_budget_secs",
                self.discovery.crawl_budget_secs,
                MAX_CRAWL_BUDGET_SECS,
            ),
        ];
        for (key, value, max) in bounded {
            if value > max {
                return Err(ConfigError::invalid(key, format!("must be at most {max}")));
            }
        }
        if self.discovery.max_pages == 0 {
            return Err(ConfigError::invalid("discovery.max_pages", "must be greater than zero"));
        }
        if let Some(stage) = self
            .validation
            .non_fatal_stages
            .iter()
            .find(|stage| **stage != Stage::Dns)
        {
            return Err(ConfigError::invalid(
                "validation.non_fatal_stages",
                format!("only dns may be marked non-fatal, got {stage}"),
            ));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn validation_timeout(&self) -> Duration {
        Duration::from_secs(self.validation.request_timeout_secs)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery.request_timeout_secs)
    }

    pub fn runner_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery.runner_timeout_secs)
    }

    pub fn is_non_fatal(&self, stage: Stage) -> bool {
        self.validation.non_fatal_stages.contains(&stage)
    }

    pub fn dns_options(&self) -> DnsOptions {
        let base = Duration::from_millis(self.dns.backoff_base_ms);
        DnsOptions {
            timeout: Duration::from_secs(self.dns.timeout_secs),
            max_retries: self.dns.max_retries,
            backoff: Backoff::new(base, base.saturating_mul(10)),
        }
    }

    pub fn smtp_options(&self) -> SmtpProbeOptions {
        let timeout = Duration::from_secs(self.smtp.timeout_secs);
        let base = Duration::from_millis(self.smtp.backoff_base_ms);
        SmtpProbeOptions {
            helo_domain: self.smtp.helo_domain.clone(),
            mail_from: self.smtp.mail_from.clone(),
            port: self.smtp.port,
            connect_timeout: timeout,
            command_timeout: timeout,
            max_retries: self.smtp.max_retries,
            backoff: Backoff::new(base, base.saturating_mul(16)),
            max_mx: self.smtp.max_mx,
            catch_all_check: self.smtp.catch_all_check,
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::invalid(name, format!("'{value}' is not a valid number")))
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::invalid(name, format!("'{value}' is not a boolean"))),
    }
}
