use std::future::Future;
use std::net::IpAddr;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, instrument, warn};
use trust_dns_resolver::{
    TokioAsyncResolver,
    config::ResolverOpts,
    error::{ResolveError, ResolveErrorKind},
    proto::op::ResponseCode,
    system_conf::read_system_conf,
};

use super::provider::detect_provider;
use super::{DnsOptions, Error, LookupFailure, MxRecord, MxResolution};
use crate::check::{CheckResult, Stage};

/// DNS queries the stage needs. Implemented by the tokio resolver in
/// production and by stubs in tests.
#[async_trait]
pub trait LookupMx: Send + Sync {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, LookupFailure>;
    async fn lookup_ip(&self, domain: &str) -> Result<Vec<IpAddr>, LookupFailure>;
}

#[async_trait]
impl LookupMx for TokioAsyncResolver {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, LookupFailure> {
        let lookup = self.mx_lookup(domain).await.map_err(classify)?;
        let mut records = Vec::new();
        for mx in lookup.iter() {
            let exchange = normalize_exchange(mx.exchange().to_utf8());
            records.push(MxRecord::new(mx.preference(), exchange));
        }
        Ok(records)
    }

    async fn lookup_ip(&self, domain: &str) -> Result<Vec<IpAddr>, LookupFailure> {
        let lookup = TokioAsyncResolver::lookup_ip(self, domain)
            .await
            .map_err(classify)?;
        Ok(lookup.iter().collect())
    }
}

/// Resolver built from the host's configuration (`/etc/resolv.conf` on
/// unix), with a bounded per-query deadline. Retries are driven by
/// [`check_dns`], so the resolver itself makes a single attempt.
pub fn build_resolver(options: &DnsOptions) -> Result<TokioAsyncResolver, Error> {
    let (config, opts) = read_system_conf().map_err(|err| Error::resolver_init(err.into()))?;
    debug!(nameservers = config.name_servers().len(), "resolver configured from system");
    Ok(TokioAsyncResolver::tokio(config, bounded(opts, options)))
}

/// Keeps the host's options but takes the deadline from `options`.
pub(crate) fn bounded(mut opts: ResolverOpts, options: &DnsOptions) -> ResolverOpts {
    opts.timeout = options.timeout;
    opts.attempts = 1;
    opts
}

fn classify(err: ResolveError) -> LookupFailure {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => match *response_code {
            ResponseCode::NXDomain => LookupFailure::NxDomain,
            ResponseCode::NoError => LookupFailure::NoRecords,
            other => LookupFailure::Transient(format!("server answered {other}")),
        },
        _ => LookupFailure::Transient(err.to_string()),
    }
}

pub(crate) fn normalize_domain(domain: &str) -> Result<String, Error> {
    let trimmed = domain.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(Error::EmptyDomain);
    }
    idna::domain_to_ascii(trimmed).map_err(Error::idna)
}

pub(crate) fn normalize_exchange(exchange: String) -> String {
    let trimmed = exchange.trim_end_matches('.');
    if trimmed.is_empty() {
        return ".".to_string();
    }
    trimmed.to_ascii_lowercase()
}

async fn with_retries<T, F, Fut>(
    options: &DnsOptions,
    what: &str,
    domain: &str,
    mut op: F,
) -> Result<T, LookupFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LookupFailure>>,
{
    let mut retry = 0;
    loop {
        match op().await {
            Err(LookupFailure::Transient(reason)) if retry < options.max_retries => {
                retry += 1;
                debug!(%domain, what, retry, %reason, "transient DNS failure, retrying");
                options.backoff.wait(retry).await;
            }
            other => return other,
        }
    }
}

/// DNS stage: resolves the mail exchangers of `domain`, falling back to the
/// domain's own address records when it publishes no MX.
#[instrument(skip(resolver, options))]
pub async fn check_dns<R>(resolver: &R, domain: &str, options: &DnsOptions) -> MxResolution
where
    R: LookupMx + ?Sized,
{
    let ascii = match normalize_domain(domain) {
        Ok(ascii) => ascii,
        Err(err) => return failed(err.to_string(), "invalid_domain"),
    };

    let mx = with_retries(options, "MX", &ascii, || resolver.lookup_mx(&ascii)).await;
    let mut records = match mx {
        Ok(records) => records,
        Err(LookupFailure::NxDomain) => return failed("domain does not exist", "domain_not_found"),
        Err(LookupFailure::NoRecords) => Vec::new(),
        Err(LookupFailure::Transient(reason)) => {
            warn!(domain = %ascii, %reason, "MX lookup failed after retries");
            return failed(format!("dns lookup failed: {reason}"), "dns_error");
        }
    };

    records.sort();
    records.dedup();

    if records.len() == 1 && records[0].is_null() {
        return failed("domain does not accept mail", "null_mx");
    }
    records.retain(|record| !record.is_null());

    if !records.is_empty() {
        let hosts: Vec<String> = records.iter().map(|r| r.exchange.clone()).collect();
        debug!(domain = %ascii, count = hosts.len(), "MX records resolved");
        return resolved(hosts, false);
    }

    let ips = with_retries(options, "A/AAAA", &ascii, || resolver.lookup_ip(&ascii)).await;
    match ips {
        Ok(ips) if !ips.is_empty() => {
            debug!(domain = %ascii, "no MX, using implicit MX from address records");
            resolved(vec![ascii], true)
        }
        Ok(_) | Err(LookupFailure::NoRecords) => failed("no mail exchanger", "no_mx_records"),
        Err(LookupFailure::NxDomain) => failed("domain does not exist", "domain_not_found"),
        Err(LookupFailure::Transient(reason)) => {
            warn!(domain = %ascii, %reason, "address lookup failed after retries");
            failed(format!("dns lookup failed: {reason}"), "dns_error")
        }
    }
}

fn resolved(hosts: Vec<String>, fallback: bool) -> MxResolution {
    let provider = detect_provider(&hosts);
    let result = CheckResult::pass(Stage::Dns, "domain has a mail exchanger")
        .with_detail("mx_records", json!(hosts))
        .with_detail("mx_count", hosts.len())
        .with_detail("fallback", fallback)
        .with_detail("email_provider", json!(provider));
    MxResolution {
        result,
        hosts,
        fallback,
    }
}

fn failed(message: impl Into<String>, error_type: &str) -> MxResolution {
    MxResolution {
        result: CheckResult::fail(Stage::Dns, message).with_detail("error_type", error_type),
        hosts: Vec::new(),
        fallback: false,
    }
}
