//! Unified error types for civic-mirror.
//!
//! Every cache operation classifies its failure into one of these variants.
//! Payloads are plain strings so a single failed fetch can be handed to every
//! caller that was waiting on it.

/// Unified error type shared by the caches and their collaborators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The resource does not exist upstream (or the match was not unique).
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// Network or I/O failure reaching a collaborator.
    #[error("TRANSPORT: {0}")]
    Transport(String),

    /// The request deadline elapsed before the collaborator answered.
    #[error("TIMEOUT: {0}")]
    Timeout(String),

    /// Stored bytes could not be decoded.
    #[error("DECODE: {0}")]
    Decode(String),

    /// Caller supplied an identifier that fails structural validation.
    #[error("INVALID_ID: {0}")]
    InvalidId(String),

    /// The request scope was canceled while the fetch was outstanding.
    #[error("CANCELLED")]
    Cancelled,
}

/// Coarse classification used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Transport,
    Decode,
    InvalidId,
    Cancelled,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Transport(_) | Error::Timeout(_) => ErrorKind::Transport,
            Error::Decode(_) => ErrorKind::Decode,
            Error::InvalidId(_) => ErrorKind::InvalidId,
            Error::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// True for failures that may succeed on a later attempt without any
    /// upstream change.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Timeout(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}
