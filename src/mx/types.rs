use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backoff::Backoff;
use crate::check::CheckResult;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

impl MxRecord {
    pub fn new(preference: u16, exchange: impl Into<String>) -> Self {
        Self {
            preference,
            exchange: exchange.into(),
        }
    }

    /// RFC 7505 "null MX": the domain explicitly does not accept mail.
    pub fn is_null(&self) -> bool {
        self.exchange.is_empty() || self.exchange == "."
    }
}

/// Classified failure of a single DNS query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupFailure {
    /// The name does not exist (NXDOMAIN).
    NxDomain,
    /// The name exists but has no records of the requested type.
    NoRecords,
    /// Timeouts, connection resets, SERVFAIL: worth retrying.
    Transient(String),
}

impl fmt::Display for LookupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NxDomain => f.write_str("NXDOMAIN"),
            Self::NoRecords => f.write_str("no records"),
            Self::Transient(reason) => write!(f, "transient error: {reason}"),
        }
    }
}

/// Knobs of the DNS stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsOptions {
    /// Deadline of a single query.
    pub timeout: Duration,
    /// Retries after a transient failure (0 = single attempt).
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for DnsOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_retries: 2,
            backoff: Backoff::new(Duration::from_millis(200), Duration::from_secs(2)),
        }
    }
}

/// Outcome of the DNS stage: the stage result plus the mail exchangers to
/// hand to the SMTP stage, ordered by preference.
#[derive(Debug, Clone, PartialEq)]
pub struct MxResolution {
    pub result: CheckResult,
    pub hosts: Vec<String>,
    /// True when `hosts` comes from the implicit MX (A/AAAA of the domain).
    pub fallback: bool,
}
