//! Request-scoped cancellation and deadlines.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::Error;

/// Cancellation token plus optional deadline for one caller request.
///
/// Every cache lookup runs its upstream fetch inside the scope; when the
/// token fires or the deadline passes the fetch is dropped and nothing is
/// installed.
#[derive(Debug, Clone, Default)]
pub struct RequestScope {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestScope {
    /// Scope with no deadline, canceled only through its token.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { token: CancellationToken::new(), deadline: Some(Instant::now() + timeout) }
    }

    /// Scope driven by an existing token, e.g. a child of a server-wide one.
    pub fn with_token(token: CancellationToken, timeout: Option<Duration>) -> Self {
        Self { token, deadline: timeout.map(|t| Instant::now() + t) }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Drive `fut` until it finishes, the token is canceled, or the deadline
    /// elapses, whichever comes first.
    pub async fn run<T, F>(&self, what: &str, fut: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        if self.token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Error::Cancelled),
            _ = deadline => Err(Error::Timeout(format!("{what} exceeded the request deadline"))),
            result = fut => result,
        }
    }
}
