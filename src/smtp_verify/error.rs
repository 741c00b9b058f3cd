use std::time::Duration;

use thiserror::Error;

/// Session-level failures. The prober turns these into verdicts; they never
/// leave the SMTP stage as errors.
#[derive(Debug, Error)]
pub enum SmtpVerifyError {
    #[error("connection to {host} failed: {source}")]
    Connect {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SmtpVerifyError {
    pub(crate) fn io(source: std::io::Error) -> Self {
        Self::Io { source }
    }

    /// Connection-level failures send the prober to the next MX host.
    pub fn is_connection_level(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Io { .. } | Self::Timeout { .. })
    }
}
