use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::smtp_verify::error::SmtpVerifyError;

/// Opens the byte stream an SMTP session runs over.
#[async_trait]
pub trait Dialer: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    async fn dial(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<Self::Stream, SmtpVerifyError>;
}

/// Plain TCP on the given port.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

#[async_trait]
impl Dialer for TcpDialer {
    type Stream = TcpStream;

    async fn dial(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<TcpStream, SmtpVerifyError> {
        let connect = TcpStream::connect((host, port));
        match tokio::time::timeout(timeout, connect).await {
            Ok(Ok(stream)) => {
                stream.set_nodelay(true).map_err(SmtpVerifyError::io)?;
                Ok(stream)
            }
            Ok(Err(source)) => Err(SmtpVerifyError::Connect {
                host: host.to_string(),
                source,
            }),
            Err(_) => Err(SmtpVerifyError::Connect {
                host: host.to_string(),
                source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
            }),
        }
    }
}
