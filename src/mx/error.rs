use thiserror::Error;

/// Failures that stop the DNS stage before any query is sent.
#[derive(Debug, Error)]
pub enum MxError {
    #[error("domain is empty")]
    EmptyDomain,
    #[error("domain is not a valid IDNA name")]
    IdnaConversion {
        #[source]
        source: idna::Errors,
    },
    #[error("could not read the system resolver configuration: {source}")]
    ResolverInit {
        #[source]
        source: std::io::Error,
    },
}

impl MxError {
    pub(crate) fn idna(source: idna::Errors) -> Self {
        Self::IdnaConversion { source }
    }

    pub(crate) fn resolver_init(source: std::io::Error) -> Self {
        Self::ResolverInit { source }
    }
}
