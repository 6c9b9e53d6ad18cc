//! Legistar API client error types.

use std::sync::Arc;

use civic_core::Error;

/// Errors from the Legistar web API client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LegistarError {
    /// No API token configured.
    #[error("missing API token: CIVIC_LEGISTAR_TOKEN not set")]
    MissingToken,

    /// Token rejected.
    #[error("authentication failed: invalid API token")]
    AuthError,

    #[error("rate limited: too many requests")]
    RateLimited,

    /// Upstream answered 404 for the resource.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    #[error("request timeout")]
    Timeout,

    /// Network error. The request URL is stripped since it carries the token.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    #[error("parse error: {0}")]
    Parse(String),

    /// A paged query never reached a short page.
    #[error("paging stalled after {pages} pages: {reason}")]
    PagingStalled { pages: usize, reason: &'static str },

    /// The web lookup did not answer with a redirect.
    #[error("lookup for matter {matter_id} returned {status} without a Location header")]
    MissingLocation { matter_id: i64, status: u16 },
}

impl From<reqwest::Error> for LegistarError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { LegistarError::Timeout } else { LegistarError::Network(Arc::new(err.without_url())) }
    }
}

impl From<LegistarError> for Error {
    fn from(err: LegistarError) -> Self {
        match err {
            LegistarError::NotFound(what) => Error::NotFound(what),
            LegistarError::Timeout => Error::Timeout("legistar request timed out".into()),
            LegistarError::Parse(msg) => Error::Decode(msg),
            other => Error::Transport(other.to_string()),
        }
    }
}
