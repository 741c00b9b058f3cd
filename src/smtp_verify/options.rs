use std::borrow::Cow;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backoff::Backoff;

/// Configuration knobs for [`SmtpProber`](super::SmtpProber).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpProbeOptions {
    pub helo_domain: String,
    /// Envelope sender. Empty means the null reverse-path `<>`.
    pub mail_from: String,
    pub port: u16,
    pub connect_timeout: Duration,
    /// Deadline for each command/reply exchange, QUIT included.
    pub command_timeout: Duration,
    /// Extra RCPT attempts after a temporary (4xx) failure.
    pub max_retries: u32,
    #[serde(skip, default)]
    pub backoff: Backoff,
    pub max_mx: usize,
    pub catch_all_check: bool,
}

impl Default for SmtpProbeOptions {
    fn default() -> Self {
        Self {
            helo_domain: "localhost".to_string(),
            mail_from: String::new(),
            port: 25,
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(10),
            max_retries: 3,
            backoff: Backoff::default(),
            max_mx: 3,
            catch_all_check: true,
        }
    }
}

impl SmtpProbeOptions {
    pub fn helo_name<'a>(&'a self, fallback: &'a str) -> Cow<'a, str> {
        if self.helo_domain.trim().is_empty() {
            Cow::Borrowed(fallback)
        } else {
            Cow::Borrowed(self.helo_domain.trim())
        }
    }

    pub fn mail_from_command(&self) -> String {
        let sender = self.mail_from.trim();
        if sender.is_empty() {
            "MAIL FROM:<>".to_string()
        } else {
            format!("MAIL FROM:<{sender}>")
        }
    }
}
