use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use url::Url;

use civic_core::config::AppConfig;
use civic_core::{Error, ObjectSource};

/// Bucket endpoint settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base URL (default: https://storage.googleapis.com).
    pub base_url: String,
    pub bucket: String,
    /// Bearer token for private buckets.
    pub token: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
}

impl StorageConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            base_url: config.storage_base_url.clone(),
            bucket: config.bucket.clone(),
            token: config.storage_token.clone().filter(|t| !t.is_empty()),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Reads objects with `GET {base_url}/{bucket}/{key}`.
#[derive(Debug, Clone)]
pub struct HttpObjectSource {
    http: Client,
    base: Url,
    bucket: String,
    token: Option<String>,
}

impl HttpObjectSource {
    pub fn new(config: StorageConfig) -> Result<Self, Error> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| Error::Transport(format!("invalid storage base url {:?}: {e}", config.base_url)))?;
        if base.cannot_be_a_base() {
            return Err(Error::Transport(format!("storage base url {base} cannot hold a path")));
        }

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, base, bucket: config.bucket, token: config.token })
    }

    /// URL of `key`; each path segment is percent-encoded separately.
    pub fn object_url(&self, key: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(&self.bucket)
                .extend(key.split('/').filter(|s| !s.is_empty()));
        }
        url
    }
}

#[async_trait]
impl ObjectSource for HttpObjectSource {
    async fn open_object(&self, key: &str) -> Result<Bytes, Error> {
        let url = self.object_url(key);
        let mut request = self.http.get(url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| request_error(key, e))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(key.to_string()));
        }
        if !status.is_success() {
            return Err(Error::Transport(format!("{key}: status {}", status.as_u16())));
        }

        let bytes = response.bytes().await.map_err(|e| request_error(key, e))?;
        tracing::debug!(%url, bytes = bytes.len(), "opened object");
        Ok(bytes)
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.base.as_str().trim_end_matches('/'), self.bucket)
    }
}

fn request_error(key: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(format!("{key}: storage request timed out"))
    } else {
        Error::Transport(format!("{key}: {}", err.without_url()))
    }
}
