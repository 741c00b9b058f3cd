//! Result type shared by every validation stage.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The validation stages, in their fixed execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Syntax,
    Dns,
    Smtp,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::Dns => "dns",
            Self::Smtp => "smtp",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "syntax" => Ok(Self::Syntax),
            "dns" => Ok(Self::Dns),
            "smtp" => Ok(Self::Smtp),
            other => Err(format!("unknown stage '{other}'")),
        }
    }
}

/// Outcome of a single stage. Failures are values, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub stage: Stage,
    pub valid: bool,
    pub message: String,
    #[serde(default)]
    pub details: BTreeMap<String, Value>,
}

impl CheckResult {
    pub fn pass(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            valid: true,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn fail(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            valid: false,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn detail_str(&self, key: &str) -> Option<&str> {
        self.details.get(key).and_then(Value::as_str)
    }

    pub fn detail_bool(&self, key: &str) -> Option<bool> {
        self.details.get(key).and_then(Value::as_bool)
    }
}
