#![forbid(unsafe_code)]
//! mailscout_lib: finds candidate addresses for a domain and validates
//! addresses in layers (syntax, DNS, SMTP probe), with a TTL cache in front.

pub mod backoff;
pub mod cache;
pub mod check;
pub mod config;
pub mod context;
pub mod discovery;
pub mod error;
pub mod mx;
pub mod pipeline;
pub mod smtp_verify;
pub mod syntax;

pub use check::{CheckResult, Stage};
pub use config::{ConfigError, Settings};
pub use context::Context;
pub use discovery::{
    CandidateSource, DiscoveryAggregator, DiscoveryMethod, DiscoveryRequest, DiscoveryResult,
    EmailCandidate, ProviderStatus,
};
pub use error::CoreError;
pub use mx::{MxRecord, check_dns};
pub use pipeline::{ValidationLevel, ValidationPipeline, ValidationRequest, ValidationResponse};
pub use smtp_verify::{MailboxVerdict, SmtpProbeOptions, SmtpProbeReport};
pub use syntax::{NormalizedAddress, check_syntax, parse_address};
