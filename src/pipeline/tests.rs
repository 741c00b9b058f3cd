use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{ValidationLevel, ValidationPipeline, ValidationRequest, cache_key};
use crate::cache::CacheBackend;
use crate::check::Stage;
use crate::config::Settings;
use crate::context::Context;
use crate::error::CoreError;
use crate::mx::{LookupFailure, LookupMx, MxRecord};
use crate::smtp_verify::{MailboxProber, MailboxVerdict, SmtpProbeReport};

/// `good.test` has MX records, `bare.test` only an address, everything else
/// is NXDOMAIN.
struct FixedDns;

#[async_trait]
impl LookupMx for FixedDns {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, LookupFailure> {
        match domain {
            "good.test" => Ok(vec![MxRecord::new(10, "mx.good.test")]),
            "bare.test" => Err(LookupFailure::NoRecords),
            _ => Err(LookupFailure::NxDomain),
        }
    }

    async fn lookup_ip(&self, domain: &str) -> Result<Vec<IpAddr>, LookupFailure> {
        match domain {
            "bare.test" => Ok(vec![IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7))]),
            _ => Err(LookupFailure::NxDomain),
        }
    }
}

struct CountingProber {
    verdict: MailboxVerdict,
    calls: AtomicUsize,
    delay: Duration,
    hosts_seen: std::sync::Mutex<Vec<String>>,
}

impl CountingProber {
    fn new(verdict: MailboxVerdict) -> Arc<Self> {
        Arc::new(Self {
            verdict,
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            hosts_seen: std::sync::Mutex::new(Vec::new()),
        })
    }

    fn slow(verdict: MailboxVerdict, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            verdict,
            calls: AtomicUsize::new(0),
            delay,
            hosts_seen: std::sync::Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl MailboxProber for CountingProber {
    async fn probe(&self, _email: &str, _domain: &str, hosts: &[String]) -> SmtpProbeReport {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.hosts_seen.lock().unwrap().extend_from_slice(hosts);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let mut report = SmtpProbeReport::new(self.verdict);
        report.mx_host = hosts.first().cloned();
        report.mx_tried = hosts.to_vec();
        report.attempts = 1;
        report
    }
}

fn pipeline(prober: Arc<CountingProber>) -> ValidationPipeline {
    ValidationPipeline::new(Arc::new(FixedDns), prober)
}

fn context() -> Context {
    Context::in_memory(Settings::default())
}

fn request(email: &str, level: ValidationLevel) -> ValidationRequest {
    ValidationRequest::new(email, level)
}

#[tokio::test]
async fn syntax_failure_stops_with_full_risk() {
    let prober = CountingProber::new(MailboxVerdict::Deliverable);
    let out = pipeline(prober.clone())
        .validate(&context(), &request("not-an-email", ValidationLevel::Advanced))
        .await
        .unwrap();

    assert!(!out.valid);
    assert_eq!(out.risk_score, 1.0);
    let results = out.validation_results.unwrap();
    assert_eq!(results.keys().copied().collect::<Vec<_>>(), vec![Stage::Syntax]);
    assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dns_failure_stops_before_smtp() {
    let prober = CountingProber::new(MailboxVerdict::Deliverable);
    let out = pipeline(prober.clone())
        .validate(&context(), &request("a@missing.test", ValidationLevel::Advanced))
        .await
        .unwrap();

    assert!(!out.valid);
    assert_eq!(out.risk_score, 0.9);
    let results = out.validation_results.unwrap();
    assert_eq!(results[&Stage::Dns].message, "domain does not exist");
    assert!(!results.contains_key(&Stage::Smtp));
    assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn basic_level_never_probes_smtp() {
    let prober = CountingProber::new(MailboxVerdict::Rejected);
    let out = pipeline(prober.clone())
        .validate(&context(), &request("a@good.test", ValidationLevel::Basic))
        .await
        .unwrap();

    assert!(out.valid);
    assert_eq!(out.risk_score, 0.1);
    assert_eq!(out.validation_results.unwrap().len(), 2);
    assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn advanced_risk_follows_smtp_verdict() {
    let cases = [
        (MailboxVerdict::Deliverable, true, 0.1),
        (MailboxVerdict::CatchAll, true, 0.4),
        (MailboxVerdict::Inconclusive, false, 0.5),
        (MailboxVerdict::Unreachable, false, 0.5),
        (MailboxVerdict::Rejected, false, 0.9),
    ];
    for (verdict, valid, risk) in cases {
        let prober = CountingProber::new(verdict);
        let out = pipeline(prober.clone())
            .validate(&context(), &request("a@good.test", ValidationLevel::Advanced))
            .await
            .unwrap();
        assert_eq!(out.valid, valid, "{verdict}");
        assert_eq!(out.risk_score, risk, "{verdict}");
        assert_eq!(prober.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*prober.hosts_seen.lock().unwrap(), vec!["mx.good.test"]);
    }
}

#[tokio::test]
async fn implicit_mx_is_probed() {
    let prober = CountingProber::new(MailboxVerdict::Deliverable);
    let out = pipeline(prober.clone())
        .validate(&context(), &request("a@bare.test", ValidationLevel::Advanced))
        .await
        .unwrap();
    assert!(out.valid);
    let results = out.validation_results.unwrap();
    assert_eq!(results[&Stage::Dns].detail_bool("fallback"), Some(true));
    assert_eq!(*prober.hosts_seen.lock().unwrap(), vec!["bare.test"]);
}

#[tokio::test]
async fn second_request_is_served_from_cache() {
    let ctx = context();
    let prober = CountingProber::new(MailboxVerdict::Deliverable);
    let pipeline = pipeline(prober.clone());
    let req = request("a@good.test", ValidationLevel::Advanced);

    let first = pipeline.validate(&ctx, &req).await.unwrap();
    assert!(!first.cached);
    let second = pipeline
        .validate(&ctx, &request("  a@GOOD.test ", ValidationLevel::Advanced))
        .await
        .unwrap();
    assert!(second.cached);
    assert_eq!(second.valid, first.valid);
    assert_eq!(second.risk_score, first.risk_score);
    assert_eq!(prober.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn levels_are_cached_separately() {
    assert_ne!(
        cache_key("a@good.test", ValidationLevel::Basic),
        cache_key("a@good.test", ValidationLevel::Advanced)
    );
    assert_eq!(
        cache_key(" a@Good.Test", ValidationLevel::Basic),
        "validation:a@good.test:basic"
    );
}

#[tokio::test]
async fn undetailed_response_omits_stage_results() {
    let prober = CountingProber::new(MailboxVerdict::Deliverable);
    let out = pipeline(prober)
        .validate(
            &context(),
            &request("a@good.test", ValidationLevel::Advanced).detailed(false),
        )
        .await
        .unwrap();
    assert!(out.validation_results.is_none());
    let json = serde_json::to_value(&out).unwrap();
    assert!(json.get("validation_results").is_none());
}

#[tokio::test]
async fn non_fatal_dns_continues_to_smtp_with_risk_floor() {
    let mut settings = Settings::default();
    settings.validation.non_fatal_stages = vec![Stage::Dns];
    let ctx = Context::in_memory(settings);
    let prober = CountingProber::new(MailboxVerdict::Deliverable);

    let out = pipeline(prober.clone())
        .validate(&ctx, &request("a@missing.test", ValidationLevel::Advanced))
        .await
        .unwrap();

    assert!(!out.valid);
    assert_eq!(out.risk_score, 0.9);
    assert_eq!(prober.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*prober.hosts_seen.lock().unwrap(), vec!["missing.test"]);
    assert!(out.validation_results.unwrap().contains_key(&Stage::Smtp));
}

#[tokio::test(start_paused = true)]
async fn overall_deadline_is_a_timeout_and_nothing_is_cached() {
    let mut settings = Settings::default();
    settings.validation.request_timeout_secs = 2;
    let ctx = Context::in_memory(settings);
    let prober = CountingProber::slow(MailboxVerdict::Deliverable, Duration::from_secs(30));
    let req = request("a@good.test", ValidationLevel::Advanced);

    let err = pipeline(prober).validate(&ctx, &req).await.unwrap_err();
    assert!(matches!(err, CoreError::Timeout { after } if after == Duration::from_secs(2)));

    let key = cache_key(&req.email, req.validation_level);
    assert_eq!(ctx.cache().get(&key).await.unwrap(), None);
}
