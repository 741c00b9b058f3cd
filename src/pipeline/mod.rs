//! Validation pipeline: Syntax → Dns → Smtp → Done.
//!
//! Stages run strictly in order; a failing stage stops the run unless it is
//! configured as non-fatal. Finished reports are cached per normalized
//! address and level.

mod types;

pub use types::{ValidationLevel, ValidationReport, ValidationRequest, ValidationResponse};

use std::sync::Arc;

use tokio::time::timeout;
use tracing::{debug, info, instrument};

use crate::cache::{get_json, set_json};
use crate::check::{CheckResult, Stage};
use crate::config::Settings;
use crate::context::Context;
use crate::error::CoreError;
use crate::mx::{Error as MxError, LookupMx, build_resolver, check_dns};
use crate::smtp_verify::{MailboxProber, SmtpProber};
use crate::syntax::{NormalizedAddress, parse_address, syntax_failure, syntax_result};

const SYNTAX_FAILURE_RISK: f64 = 1.0;
const DNS_FAILURE_RISK: f64 = 0.9;
const BASELINE_RISK: f64 = 0.1;

enum State {
    Syntax,
    Dns(NormalizedAddress),
    Smtp {
        address: NormalizedAddress,
        hosts: Vec<String>,
        risk_floor: f64,
    },
    Done {
        risk: f64,
    },
    FailedAt {
        stage: Stage,
        risk: f64,
    },
}

pub struct ValidationPipeline {
    resolver: Arc<dyn LookupMx>,
    prober: Arc<dyn MailboxProber>,
}

impl ValidationPipeline {
    pub fn new(resolver: Arc<dyn LookupMx>, prober: Arc<dyn MailboxProber>) -> Self {
        Self { resolver, prober }
    }

    /// Production wiring: system DNS via the tokio resolver, SMTP over TCP.
    pub fn from_settings(settings: &Settings) -> Result<Self, MxError> {
        let resolver = build_resolver(&settings.dns_options())?;
        let prober = SmtpProber::tcp(settings.smtp_options());
        Ok(Self::new(Arc::new(resolver), Arc::new(prober)))
    }

    #[instrument(skip(self, ctx, request), fields(level = %request.validation_level))]
    pub async fn validate(
        &self,
        ctx: &Context,
        request: &ValidationRequest,
    ) -> Result<ValidationResponse, CoreError> {
        let level = request.validation_level;
        let key = cache_key(&request.email, level);

        if let Some(report) = get_json::<ValidationReport>(ctx.cache(), &key).await? {
            debug!(%key, "validation cache hit");
            return Ok(ValidationResponse::from_report(report, request.detailed, true));
        }

        let deadline = ctx.settings().validation_timeout();
        let report = timeout(deadline, self.run(ctx.settings(), &request.email, level))
            .await
            .map_err(|_| CoreError::Timeout { after: deadline })?;

        set_json(ctx.cache(), &key, &report, ctx.settings().cache_ttl()).await?;
        info!(
            valid = report.valid,
            risk = report.risk_score,
            stages = report.results.len(),
            "validation finished"
        );
        Ok(ValidationResponse::from_report(report, request.detailed, false))
    }

    /// Runs the stages without touching the cache.
    pub async fn run(
        &self,
        settings: &Settings,
        raw: &str,
        level: ValidationLevel,
    ) -> ValidationReport {
        let mut results: Vec<CheckResult> = Vec::with_capacity(3);
        let mut email = raw.trim().to_string();
        let mut state = State::Syntax;

        let risk = loop {
            state = match state {
                State::Syntax => match parse_address(raw) {
                    Ok(address) => {
                        results.push(syntax_result(&address));
                        email = address.email();
                        State::Dns(address)
                    }
                    Err(reasons) => {
                        results.push(syntax_failure(&reasons));
                        State::FailedAt {
                            stage: Stage::Syntax,
                            risk: SYNTAX_FAILURE_RISK,
                        }
                    }
                },
                State::Dns(address) => {
                    let options = settings.dns_options();
                    let dns =
                        check_dns(self.resolver.as_ref(), &address.ascii_domain, &options).await;
                    let passed = dns.result.valid;
                    results.push(dns.result);

                    if !passed && !settings.is_non_fatal(Stage::Dns) {
                        State::FailedAt {
                            stage: Stage::Dns,
                            risk: DNS_FAILURE_RISK,
                        }
                    } else if level == ValidationLevel::Basic {
                        let risk = if passed { BASELINE_RISK } else { DNS_FAILURE_RISK };
                        State::Done { risk }
                    } else if passed {
                        State::Smtp {
                            address,
                            hosts: dns.hosts,
                            risk_floor: BASELINE_RISK,
                        }
                    } else {
                        debug!("dns failed but is non-fatal, probing the implicit MX");
                        let hosts = vec![address.ascii_domain.clone()];
                        State::Smtp {
                            address,
                            hosts,
                            risk_floor: DNS_FAILURE_RISK,
                        }
                    }
                }
                State::Smtp {
                    address,
                    hosts,
                    risk_floor,
                } => {
                    let report = self
                        .prober
                        .probe(&address.ascii_email(), &address.ascii_domain, &hosts)
                        .await;
                    let risk = (BASELINE_RISK + report.verdict.risk_penalty()).max(risk_floor);
                    results.push(report.to_check_result());
                    State::Done { risk }
                }
                State::Done { risk } => break risk,
                State::FailedAt { stage, risk } => {
                    debug!(%stage, "pipeline stopped");
                    break risk;
                }
            };
        };

        let valid = results.iter().all(|r| r.valid);
        ValidationReport {
            email,
            level,
            results,
            valid,
            risk_score: round_risk(risk),
        }
    }
}

/// `validation:<normalized email>:<level>`. Unparseable input is keyed by
/// its trimmed form.
pub fn cache_key(raw: &str, level: ValidationLevel) -> String {
    let email = match parse_address(raw) {
        Ok(address) => address.email(),
        Err(_) => raw.trim().to_string(),
    };
    format!("validation:{email}:{level}")
}

fn round_risk(risk: f64) -> f64 {
    (risk.clamp(0.0, 1.0) * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests;
