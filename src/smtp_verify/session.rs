use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;
use tracing::trace;

use crate::smtp_verify::error::SmtpVerifyError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl SmtpReply {
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_transient_failure(&self) -> bool {
        (400..500).contains(&self.code)
    }

    pub fn is_permanent_failure(&self) -> bool {
        (500..600).contains(&self.code)
    }

    /// 250/251: recipient accepted (251 = will forward).
    pub fn is_recipient_accepted(&self) -> bool {
        matches!(self.code, 250 | 251)
    }

    /// 550/551/553: the mailbox does not exist or is not allowed.
    pub fn is_no_mailbox(&self) -> bool {
        matches!(self.code, 550 | 551 | 553)
    }
}

/// One SMTP conversation over any async byte stream, with a deadline on
/// every exchange and a transcript of what was said.
pub struct SmtpSession<S> {
    host: String,
    stream: BufReader<S>,
    command_timeout: Duration,
    pub transcript: Vec<String>,
}

impl<S> SmtpSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(host: &str, stream: S, command_timeout: Duration) -> Self {
        Self {
            host: host.to_string(),
            stream: BufReader::new(stream),
            command_timeout,
            transcript: Vec::new(),
        }
    }

    pub fn record(&mut self, direction: &str, message: &str) {
        self.transcript
            .push(format!("[{}] {direction}: {message}", self.host));
    }

    pub async fn read_banner(&mut self) -> Result<SmtpReply, SmtpVerifyError> {
        let reply = self.read_reply().await?;
        self.record_reply(&reply);
        Ok(reply)
    }

    pub async fn send_command(&mut self, command: &str) -> Result<SmtpReply, SmtpVerifyError> {
        self.record("C", command);
        trace!(host = %self.host, %command, "smtp command");
        let mut data = command.as_bytes().to_vec();
        data.extend_from_slice(b"\r\n");
        let deadline = self.command_timeout;
        let stream = &mut self.stream;
        let write = async move {
            stream.write_all(&data).await?;
            stream.flush().await?;
            Ok::<_, std::io::Error>(())
        };
        timeout(deadline, write)
            .await
            .map_err(|_| SmtpVerifyError::Timeout {
                operation: "write",
                after: deadline,
            })?
            .map_err(SmtpVerifyError::io)?;
        let reply = self.read_reply().await?;
        self.record_reply(&reply);
        Ok(reply)
    }

    /// Best-effort QUIT bounded by the command timeout, then shutdown.
    /// Consumes the session and hands back its transcript.
    pub async fn close(mut self) -> Vec<String> {
        let deadline = self.command_timeout;
        if timeout(deadline, self.send_command("QUIT")).await.is_err() {
            self.record("!", "QUIT timed out");
        }
        let _ = timeout(deadline, self.stream.shutdown()).await;
        self.transcript
    }

    async fn read_reply(&mut self) -> Result<SmtpReply, SmtpVerifyError> {
        let mut lines = Vec::new();
        let mut code: Option<u16> = None;
        loop {
            let line = self.read_line().await?;
            if line.len() < 3 || !line.is_char_boundary(3) {
                return Err(SmtpVerifyError::Protocol(format!("invalid reply: {line}")));
            }
            let parsed_code = line[..3]
                .parse::<u16>()
                .map_err(|_| SmtpVerifyError::Protocol(format!("invalid code in line: {line}")))?;
            match code {
                Some(existing) if existing != parsed_code => {
                    return Err(SmtpVerifyError::Protocol(format!(
                        "inconsistent reply codes: {existing} vs {parsed_code}"
                    )));
                }
                Some(_) => {}
                None => code = Some(parsed_code),
            }
            let is_last = line.as_bytes().get(3) != Some(&b'-');
            let text = line.get(4..).unwrap_or_default().to_string();
            lines.push(text);
            if is_last {
                return Ok(SmtpReply {
                    code: parsed_code,
                    lines,
                });
            }
        }
    }

    async fn read_line(&mut self) -> Result<String, SmtpVerifyError> {
        let mut buf = Vec::new();
        let read = timeout(self.command_timeout, self.stream.read_until(b'\n', &mut buf))
            .await
            .map_err(|_| SmtpVerifyError::Timeout {
                operation: "read",
                after: self.command_timeout,
            })?
            .map_err(SmtpVerifyError::io)?;
        if read == 0 {
            return Err(SmtpVerifyError::io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed",
            )));
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn record_reply(&mut self, reply: &SmtpReply) {
        if reply.lines.is_empty() {
            self.record("S", &reply.code.to_string());
        } else {
            for line in &reply.lines {
                self.record("S", &format!("{} {}", reply.code, line));
            }
        }
    }
}
