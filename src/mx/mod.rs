//! DNS stage: MX resolution with implicit-MX fallback.
//!
//! The entry point is [`check_dns`], which drives any [`LookupMx`]
//! implementation (the tokio resolver in production) and returns the stage
//! result together with the hosts the SMTP stage should try.

mod error;
mod provider;
mod resolver;
mod types;

pub use error::MxError as Error;
pub use provider::{EmailProvider, ProviderKind, detect_provider};
pub use resolver::{LookupMx, build_resolver, check_dns};
pub use types::{DnsOptions, LookupFailure, MxRecord, MxResolution};
