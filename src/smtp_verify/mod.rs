//! SMTP stage: RCPT TO probing of a mailbox.
//!
//! [`SmtpProber`] runs a minimal dialogue (greeting, EHLO/HELO, MAIL FROM,
//! RCPT TO, never DATA) against the mail exchangers handed over by the DNS
//! stage and classifies the answers into a [`MailboxVerdict`].

mod dialer;
mod error;
mod options;
mod probe;
mod session;
mod types;
mod util;

pub use dialer::{Dialer, TcpDialer};
pub use error::SmtpVerifyError;
pub use options::SmtpProbeOptions;
pub use probe::{MailboxProber, SmtpProber};
pub use session::{SmtpReply, SmtpSession};
pub use types::{MailboxVerdict, SmtpProbeReport};
