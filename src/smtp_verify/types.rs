use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::check::{CheckResult, Stage};

/// Classification of the observed SMTP behaviour for a mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailboxVerdict {
    /// The target was accepted and a random alias was not.
    Deliverable,
    /// The server accepts any address at the domain.
    CatchAll,
    /// 550/551/553 on RCPT.
    Rejected,
    /// Temporary failures persisted through every retry.
    Inconclusive,
    /// No MX host could be talked to.
    Unreachable,
    /// The server answered, but not in a way that settles the question.
    Unverified,
}

impl MailboxVerdict {
    pub fn is_conclusive(&self) -> bool {
        matches!(self, Self::Deliverable | Self::Rejected)
    }

    pub fn accepts_mail(&self) -> bool {
        matches!(self, Self::Deliverable | Self::CatchAll)
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Deliverable => "mailbox exists and accepts mail",
            Self::CatchAll => "mailbox accepted (server accepts any address)",
            Self::Rejected => "mailbox does not exist",
            Self::Inconclusive => "could not verify (temporary failure)",
            Self::Unreachable => "mailbox server unreachable",
            Self::Unverified => "mailbox could not be verified",
        }
    }

    /// Risk added on top of the pipeline baseline.
    pub fn risk_penalty(&self) -> f64 {
        match self {
            Self::Deliverable => 0.0,
            Self::CatchAll => 0.3,
            Self::Rejected => 0.8,
            Self::Inconclusive | Self::Unreachable | Self::Unverified => 0.4,
        }
    }
}

impl fmt::Display for MailboxVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Deliverable => "Deliverable",
            Self::CatchAll => "CatchAll",
            Self::Rejected => "Rejected",
            Self::Inconclusive => "Inconclusive",
            Self::Unreachable => "Unreachable",
            Self::Unverified => "Unverified",
        };
        f.write_str(name)
    }
}

/// Final report produced by a [`MailboxProber`](super::MailboxProber).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmtpProbeReport {
    pub verdict: MailboxVerdict,
    /// Host that produced the verdict.
    pub mx_host: Option<String>,
    pub mx_tried: Vec<String>,
    /// RCPT reply code for the target address, when one was received.
    pub smtp_code: Option<u16>,
    pub attempts: u32,
    pub retries: u32,
    pub transcript: Vec<String>,
    pub confidence: f32,
    /// `None` when the alias check was skipped or answered with a 4xx.
    pub is_catch_all: Option<bool>,
}

impl SmtpProbeReport {
    pub fn new(verdict: MailboxVerdict) -> Self {
        Self {
            verdict,
            mx_host: None,
            mx_tried: Vec::new(),
            smtp_code: None,
            attempts: 0,
            retries: 0,
            transcript: Vec::new(),
            confidence: super::util::confidence_for(&verdict),
            is_catch_all: (verdict == MailboxVerdict::CatchAll).then_some(true),
        }
    }

    pub fn to_check_result(&self) -> CheckResult {
        let mailbox_exists = match self.verdict {
            MailboxVerdict::Deliverable | MailboxVerdict::CatchAll => Value::Bool(true),
            MailboxVerdict::Rejected => Value::Bool(false),
            _ => Value::Null,
        };
        let result = if self.verdict.accepts_mail() {
            CheckResult::pass(Stage::Smtp, self.verdict.message())
        } else {
            CheckResult::fail(Stage::Smtp, self.verdict.message())
        };
        result
            .with_detail("verdict", json!(self.verdict))
            .with_detail("mx_host", json!(self.mx_host))
            .with_detail("mailbox_exists", mailbox_exists)
            .with_detail("can_deliver", self.verdict.accepts_mail())
            .with_detail("is_catch_all", json!(self.is_catch_all))
            .with_detail("smtp_code", json!(self.smtp_code))
            .with_detail("attempts", self.attempts)
            .with_detail("retries", self.retries)
            .with_detail("mx_tried", json!(self.mx_tried))
            .with_detail("confidence", json!(self.confidence))
    }
}
