use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::smtp_verify::dialer::{Dialer, TcpDialer};
use crate::smtp_verify::error::SmtpVerifyError;
use crate::smtp_verify::options::SmtpProbeOptions;
use crate::smtp_verify::session::{SmtpReply, SmtpSession};
use crate::smtp_verify::types::{MailboxVerdict, SmtpProbeReport};
use crate::smtp_verify::util::{confidence_for, random_local_part};

/// Asks the mail exchangers of a domain whether they would accept a
/// recipient. Never fails: every outcome is a verdict.
#[async_trait]
pub trait MailboxProber: Send + Sync {
    /// `email` is the wire form of the address, `hosts` the mail exchangers
    /// in preference order.
    async fn probe(&self, email: &str, domain: &str, hosts: &[String]) -> SmtpProbeReport;
}

pub struct SmtpProber<D = TcpDialer> {
    dialer: D,
    options: SmtpProbeOptions,
}

impl SmtpProber<TcpDialer> {
    pub fn tcp(options: SmtpProbeOptions) -> Self {
        Self::new(TcpDialer, options)
    }
}

impl<D: Dialer> SmtpProber<D> {
    pub fn new(dialer: D, options: SmtpProbeOptions) -> Self {
        Self { dialer, options }
    }

    pub fn options(&self) -> &SmtpProbeOptions {
        &self.options
    }

    /// One fresh session against `host`. The session is closed (QUIT and
    /// shutdown) on every path once it has been opened.
    async fn attempt(
        &self,
        host: &str,
        email: &str,
        domain: &str,
        transcript: &mut Vec<String>,
    ) -> Result<Step, SmtpVerifyError> {
        let stream = self
            .dialer
            .dial(host, self.options.port, self.options.connect_timeout)
            .await?;
        let mut session = SmtpSession::new(host, stream, self.options.command_timeout);
        let step = self.converse(&mut session, email, domain).await;
        transcript.extend(session.close().await);
        step
    }

    async fn converse<S>(
        &self,
        session: &mut SmtpSession<S>,
        email: &str,
        domain: &str,
    ) -> Result<Step, SmtpVerifyError>
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send,
    {
        let banner = session.read_banner().await?;
        if !banner.is_positive_completion() {
            return Ok(Step::from_refusal(&banner));
        }

        let helo = self.options.helo_name(domain).into_owned();
        let ehlo = session.send_command(&format!("EHLO {helo}")).await?;
        if !ehlo.is_positive_completion() {
            let reply = session.send_command(&format!("HELO {helo}")).await?;
            if !reply.is_positive_completion() {
                return Ok(Step::from_refusal(&reply));
            }
        }

        let mail = session
            .send_command(&self.options.mail_from_command())
            .await?;
        if !mail.is_positive_completion() {
            return Ok(Step::from_refusal(&mail));
        }

        let target = session.send_command(&format!("RCPT TO:<{email}>")).await?;
        if target.is_no_mailbox() {
            return Ok(Step::Done(MailboxVerdict::Rejected, Some(target.code), None));
        }
        if !target.is_recipient_accepted() {
            return Ok(Step::from_refusal(&target));
        }

        if !self.options.catch_all_check {
            return Ok(Step::Done(MailboxVerdict::Deliverable, Some(target.code), None));
        }

        let local = email.split('@').next().unwrap_or_default();
        let mut alias = random_local_part(local.len());
        while alias.eq_ignore_ascii_case(local) {
            alias = random_local_part(local.len());
        }
        let probe = session
            .send_command(&format!("RCPT TO:<{alias}@{domain}>"))
            .await?;
        // a 4xx on the alias (greylisting) says nothing about catch-all
        let (verdict, catch_all) = if probe.is_recipient_accepted() {
            (MailboxVerdict::CatchAll, Some(true))
        } else if probe.is_transient_failure() {
            (MailboxVerdict::Deliverable, None)
        } else {
            (MailboxVerdict::Deliverable, Some(false))
        };
        Ok(Step::Done(verdict, Some(target.code), catch_all))
    }
}

#[async_trait]
impl<D: Dialer> MailboxProber for SmtpProber<D> {
    #[instrument(skip(self, hosts), fields(hosts = hosts.len()))]
    async fn probe(&self, email: &str, domain: &str, hosts: &[String]) -> SmtpProbeReport {
        let mut report = SmtpProbeReport::new(MailboxVerdict::Unreachable);
        let mut transcript = Vec::new();

        for host in hosts.iter().take(self.options.max_mx.max(1)) {
            report.mx_tried.push(host.clone());
            let mut retry = 0u32;
            loop {
                report.attempts += 1;
                match self.attempt(host, email, domain, &mut transcript).await {
                    Ok(Step::TempFail(code)) if retry < self.options.max_retries => {
                        retry += 1;
                        debug!(%host, code, retry, "temporary SMTP failure, retrying");
                        self.options.backoff.wait(retry).await;
                    }
                    Ok(Step::TempFail(code)) => {
                        let verdict = MailboxVerdict::Inconclusive;
                        return finish(report, transcript, host, verdict, Some(code), None, retry);
                    }
                    Ok(Step::Done(verdict, code, catch_all)) => {
                        return finish(report, transcript, host, verdict, code, catch_all, retry);
                    }
                    Err(err) if err.is_connection_level() => {
                        warn!(%host, error = %err, "SMTP host failed, trying next");
                        transcript.push(format!("[{host}] ! error: {err}"));
                        break;
                    }
                    Err(err) => {
                        debug!(%host, error = %err, "SMTP dialogue could not be interpreted");
                        transcript.push(format!("[{host}] ! error: {err}"));
                        let verdict = MailboxVerdict::Unverified;
                        return finish(report, transcript, host, verdict, None, None, retry);
                    }
                }
            }
        }

        report.transcript = transcript;
        report
    }
}

fn finish(
    mut report: SmtpProbeReport,
    transcript: Vec<String>,
    host: &str,
    verdict: MailboxVerdict,
    code: Option<u16>,
    catch_all: Option<bool>,
    retries: u32,
) -> SmtpProbeReport {
    report.verdict = verdict;
    report.mx_host = Some(host.to_string());
    report.smtp_code = code;
    report.is_catch_all = catch_all;
    report.retries = retries;
    report.transcript = transcript;
    report.confidence = confidence_for(&verdict);
    report
}

/// Outcome of one session. `Done` carries the verdict, the target's RCPT
/// code and what the alias probe showed, if it ran and was answered.
enum Step {
    Done(MailboxVerdict, Option<u16>, Option<bool>),
    TempFail(u16),
}

impl Step {
    fn from_refusal(reply: &SmtpReply) -> Self {
        if reply.is_transient_failure() {
            Self::TempFail(reply.code)
        } else {
            Self::Done(MailboxVerdict::Unverified, Some(reply.code), None)
        }
    }
}
