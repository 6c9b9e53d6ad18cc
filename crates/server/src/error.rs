//! HTTP rendering of cache errors.
//!
//! Handlers only classify; the body is a short plain-text message and the
//! detail goes to the log.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use civic_core::{Error, ErrorKind};

/// Non-standard status used when the client went away mid-request.
const CLIENT_CLOSED_REQUEST: u16 = 499;

/// A cache error tagged with the handler that hit it.
#[derive(Debug, thiserror::Error)]
#[error("{source_name}: {error}")]
pub struct HttpError {
    source_name: &'static str,
    error: Error,
}

impl HttpError {
    pub fn new(source_name: &'static str, error: Error) -> Self {
        Self { source_name, error }
    }

    pub fn status(&self) -> StatusCode {
        match self.error.kind() {
            ErrorKind::NotFound | ErrorKind::InvalidId => StatusCode::NOT_FOUND,
            ErrorKind::Cancelled => StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::REQUEST_TIMEOUT),
            ErrorKind::Transport if matches!(self.error, Error::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::Transport | ErrorKind::Decode => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match status {
            StatusCode::NOT_FOUND => "Not Found",
            StatusCode::GATEWAY_TIMEOUT => "upstream timeout",
            _ if self.error == Error::Cancelled => "canceled",
            _ => "unknown error",
        };

        if status.is_server_error() {
            tracing::error!(source = self.source_name, status = status.as_u16(), error = %self.error, "request failed");
        } else {
            tracing::debug!(source = self.source_name, status = status.as_u16(), error = %self.error, "request rejected");
        }

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(error: Error) -> u16 {
        HttpError::new("test", error).status().as_u16()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status(Error::NotFound("x".into())), 404);
        assert_eq!(status(Error::InvalidId("x".into())), 404);
        assert_eq!(status(Error::Transport("x".into())), 500);
        assert_eq!(status(Error::Decode("x".into())), 500);
        assert_eq!(status(Error::Timeout("x".into())), 504);
        assert_eq!(status(Error::Cancelled), 499);
    }

    #[test]
    fn test_display() {
        let err = HttpError::new("routes::detail", Error::NotFound("Int 0001-2020".into()));
        assert_eq!(err.to_string(), "routes::detail: NOT_FOUND: Int 0001-2020");
    }

    #[tokio::test]
    async fn test_response_bodies() {
        use http_body_util::BodyExt;

        for (error, status, body) in [
            (Error::Cancelled, 499, "canceled"),
            (Error::Timeout("20s".into()), 504, "upstream timeout"),
            (Error::NotFound("x".into()), 404, "Not Found"),
            (Error::Transport("reset".into()), 500, "unknown error"),
        ] {
            let response = HttpError::new("test", error).into_response();
            assert_eq!(response.status().as_u16(), status);
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(bytes, body.as_bytes());
        }
    }
}
