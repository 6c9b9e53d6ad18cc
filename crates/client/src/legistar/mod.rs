//! Legistar web API client.
//!
//! ### Endpoints
//!
//! All under `{base_url}/{client}/`, authenticated with a `token` query
//! parameter:
//!
//! - `matters?$filter=...` (paged with `$top`/`$skip`)
//! - `matters/{id}/sponsors`, `matters/{id}/histories`,
//!   `matters/{id}/attachments`, `matters/{id}/versions`
//! - `matters/{id}/texts/{text_id}`
//! - `eventitems/{history_id}/votes`
//!
//! The public detail-page URL comes from the council's web gateway, which
//! answers `{lookup_url}{matter_id}` with a redirect to the canonical page.

pub mod error;

pub use error::LegistarError;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::de::DeserializeOwned;
use url::Url;

use civic_core::config::AppConfig;
use civic_core::records::{Matter, MatterAttachment, MatterHistory, MatterSponsor, MatterText, MatterTextVersion, Vote};
use civic_core::{Error, MatterFilter, RecordApi};

/// Rows requested per page of a `matters` query; the API caps pages at 1000.
const PAGE_SIZE: usize = 1000;
/// Upper bound on pages followed by one matters query.
const MAX_PAGES: usize = 50;

/// Legistar client configuration.
#[derive(Debug, Clone)]
pub struct LegistarConfig {
    /// Base URL (default: https://webapi.legistar.com/v1).
    pub base_url: String,
    /// Legistar client name (default: nyc).
    pub client: String,
    pub token: String,
    /// Gateway URL prefix; the matter id is appended.
    pub lookup_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl LegistarConfig {
    pub fn from_app(config: &AppConfig) -> Result<Self, LegistarError> {
        let token = config.require_legistar_token().map_err(|_| LegistarError::MissingToken)?;
        Ok(Self {
            base_url: config.legistar_base_url.clone(),
            client: config.legistar_client.clone(),
            token: token.to_string(),
            lookup_url: config.lookup_url.clone(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
        })
    }
}

/// Legistar API client.
#[derive(Debug, Clone)]
pub struct LegistarClient {
    http: Client,
    /// Same settings as `http` but never follows redirects.
    lookup: Client,
    config: LegistarConfig,
}

impl LegistarClient {
    pub fn new(config: LegistarConfig) -> Result<Self, LegistarError> {
        if config.token.is_empty() {
            return Err(LegistarError::MissingToken);
        }

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?;
        let lookup = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { http, lookup, config })
    }

    pub fn from_app(config: &AppConfig) -> Result<Self, LegistarError> {
        Self::new(LegistarConfig::from_app(config)?)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.config.base_url.trim_end_matches('/'), self.config.client, path)
    }

    /// GET `path` and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, LegistarError> {
        tracing::debug!(path, "legistar request");

        let response = self
            .http
            .get(self.endpoint(path))
            .header(header::ACCEPT, "application/json")
            .query(&[("token", self.config.token.as_str())])
            .query(query)
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::NOT_FOUND => return Err(LegistarError::NotFound(path.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(LegistarError::AuthError),
            StatusCode::TOO_MANY_REQUESTS => return Err(LegistarError::RateLimited),
            s if !s.is_success() => return Err(LegistarError::HttpError { status: s.as_u16() }),
            _ => {}
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| LegistarError::Parse(format!("{path}: {e}")))
    }

    /// All matters selected by `filter`, following pages until a short one.
    ///
    /// Fails if a page repeats the previous one or the page cap is reached.
    pub async fn fetch_matters(&self, filter: &MatterFilter) -> Result<Vec<Matter>, LegistarError> {
        let filter = filter.to_string();
        let mut matters: Vec<Matter> = Vec::new();
        let mut pages = 0;
        loop {
            if pages == MAX_PAGES {
                return Err(LegistarError::PagingStalled { pages, reason: "page limit reached" });
            }
            let query = [
                ("$filter", filter.clone()),
                ("$top", PAGE_SIZE.to_string()),
                ("$skip", matters.len().to_string()),
            ];
            let page: Vec<Matter> = self.get_json("matters", &query).await?;
            pages += 1;

            let previous_first = matters.len().checked_sub(PAGE_SIZE).map(|i| matters[i].matter_id);
            if page.first().map(|m| m.matter_id).is_some_and(|id| Some(id) == previous_first) {
                tracing::warn!(%filter, pages, "matters query returned the same page twice");
                return Err(LegistarError::PagingStalled { pages, reason: "page repeated" });
            }

            let n = page.len();
            matters.extend(page);
            if n < PAGE_SIZE {
                break;
            }
        }
        tracing::debug!(%filter, count = matters.len(), pages, "matters query");
        Ok(matters)
    }

    /// Follow the web gateway one hop and return where it points.
    pub async fn lookup_web_url(&self, matter_id: i64) -> Result<String, LegistarError> {
        let lookup = format!("{}{matter_id}", self.config.lookup_url);
        let response = self.lookup.get(&lookup).send().await?;
        let status = response.status();

        let location = status
            .is_redirection()
            .then(|| response.headers().get(header::LOCATION))
            .flatten()
            .and_then(|v| v.to_str().ok());
        let Some(location) = location else {
            return Err(LegistarError::MissingLocation { matter_id, status: status.as_u16() });
        };

        let base = Url::parse(&lookup).map_err(|e| LegistarError::Parse(format!("lookup url: {e}")))?;
        let resolved = base
            .join(location)
            .map_err(|e| LegistarError::Parse(format!("location {location:?}: {e}")))?;
        Ok(resolved.to_string())
    }

    pub fn config(&self) -> &LegistarConfig {
        &self.config
    }
}

#[async_trait]
impl RecordApi for LegistarClient {
    async fn matters(&self, filter: &MatterFilter) -> Result<Vec<Matter>, Error> {
        Ok(self.fetch_matters(filter).await?)
    }

    async fn matter_sponsors(&self, matter_id: i64) -> Result<Vec<MatterSponsor>, Error> {
        Ok(self.get_json(&format!("matters/{matter_id}/sponsors"), &[]).await?)
    }

    async fn matter_histories(&self, matter_id: i64) -> Result<Vec<MatterHistory>, Error> {
        Ok(self.get_json(&format!("matters/{matter_id}/histories"), &[]).await?)
    }

    async fn event_votes(&self, history_id: i64) -> Result<Vec<Vote>, Error> {
        Ok(self.get_json(&format!("eventitems/{history_id}/votes"), &[]).await?)
    }

    async fn matter_attachments(&self, matter_id: i64) -> Result<Vec<MatterAttachment>, Error> {
        Ok(self.get_json(&format!("matters/{matter_id}/attachments"), &[]).await?)
    }

    async fn matter_text_versions(&self, matter_id: i64) -> Result<Vec<MatterTextVersion>, Error> {
        Ok(self.get_json(&format!("matters/{matter_id}/versions"), &[]).await?)
    }

    async fn matter_text(&self, matter_id: i64, text_id: i64) -> Result<MatterText, Error> {
        Ok(self.get_json(&format!("matters/{matter_id}/texts/{text_id}"), &[]).await?)
    }

    async fn resolve_canonical_url(&self, matter_id: i64) -> Result<String, Error> {
        Ok(self.lookup_web_url(matter_id).await?)
    }
}
