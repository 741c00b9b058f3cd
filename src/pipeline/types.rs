use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::check::{CheckResult, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    /// Syntax and DNS.
    Basic,
    /// Syntax, DNS and SMTP.
    #[default]
    Advanced,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
        }
    }

    pub fn stages(&self) -> &'static [Stage] {
        match self {
            Self::Basic => &[Stage::Syntax, Stage::Dns],
            Self::Advanced => &[Stage::Syntax, Stage::Dns, Stage::Smtp],
        }
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "advanced" => Ok(Self::Advanced),
            other => Err(format!("unknown validation level '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub email: String,
    #[serde(default)]
    pub validation_level: ValidationLevel,
    #[serde(default = "default_detailed")]
    pub detailed: bool,
}

fn default_detailed() -> bool {
    true
}

impl ValidationRequest {
    pub fn new(email: impl Into<String>, validation_level: ValidationLevel) -> Self {
        Self {
            email: email.into(),
            validation_level,
            detailed: true,
        }
    }

    pub fn detailed(mut self, detailed: bool) -> Self {
        self.detailed = detailed;
        self
    }
}

/// Everything the pipeline computed for one address; this is what gets
/// cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub email: String,
    pub level: ValidationLevel,
    /// One entry per executed stage, in execution order.
    pub results: Vec<CheckResult>,
    pub valid: bool,
    pub risk_score: f64,
}

impl ValidationReport {
    pub fn result(&self, stage: Stage) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.stage == stage)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub email: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_results: Option<BTreeMap<Stage, CheckResult>>,
    pub risk_score: f64,
    pub cached: bool,
}

impl ValidationResponse {
    pub fn from_report(report: ValidationReport, detailed: bool, cached: bool) -> Self {
        let validation_results = detailed.then(|| {
            report
                .results
                .into_iter()
                .map(|result| (result.stage, result))
                .collect()
        });
        Self {
            email: report.email,
            valid: report.valid,
            validation_results,
            risk_score: report.risk_score,
            cached,
        }
    }
}
