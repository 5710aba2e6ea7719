use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResolveError>;

/// Classification of a failed exchange with an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// 401 or 407: credentials are required.
    Unauthorized,
    /// 403: typically a client certificate is required.
    Forbidden,
    /// The server certificate was rejected.
    TrustFailure,
    Other,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::TrustFailure => "untrusted server certificate",
            Self::Other => "transport error",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} from {url}: {message}")]
pub struct TransportFault {
    pub kind: FaultKind,
    pub status: Option<u16>,
    pub url: String,
    pub message: String,
}

impl TransportFault {
    pub fn new(kind: FaultKind, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            url: url.into(),
            message: message.into(),
        }
    }

    /// Fault for a non-success HTTP status.
    pub fn from_status(status: u16, url: impl Into<String>) -> Self {
        let kind = match status {
            401 | 407 => FaultKind::Unauthorized,
            403 => FaultKind::Forbidden,
            _ => FaultKind::Other,
        };
        Self {
            kind,
            status: Some(status),
            url: url.into(),
            message: format!("HTTP status {status}"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Fault(#[from] TransportFault),

    #[error("retrieval from {0} was cancelled")]
    Cancelled(String),

    #[error("no WSDL or XSD metadata found at {uri} (tried: {})", .attempts.join("; "))]
    NoMetadata { uri: String, attempts: Vec<String> },

    #[error("metadata exchange fault from {url}: {reason}")]
    MexFault { url: String, reason: String },

    #[error("invalid endpoint address `{0}`")]
    InvalidAddress(String),

    #[error(transparent)]
    Document(#[from] wsmeta_model::ModelError),
}

impl ResolveError {
    /// Errors that stop the retrieval plan instead of moving to the next
    /// attempt.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Cancelled(_) => true,
            Self::Fault(fault) => fault.kind == FaultKind::TrustFailure,
            _ => false,
        }
    }

    #[must_use]
    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            Self::Fault(fault) => Some(fault.kind),
            _ => None,
        }
    }
}
