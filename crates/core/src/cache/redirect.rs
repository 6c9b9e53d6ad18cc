//! Permanent memo of bill id to canonical detail-page URL.
//!
//! Filed legislation keeps its public URL, so a resolved redirect is kept for
//! the life of the process. Memory grows with the number of distinct bills
//! ever requested.

use std::sync::Arc;

use super::lookup::unique_matter;
use super::store::{Freshness, ReadThrough};
use crate::Error;
use crate::bill_id::BillId;
use crate::scope::RequestScope;
use crate::source::RecordApi;

pub struct RedirectMemo {
    api: Arc<dyn RecordApi>,
    inner: ReadThrough<BillId, String>,
}

impl RedirectMemo {
    pub fn new(api: Arc<dyn RecordApi>, coalesce: bool) -> Self {
        Self { api, inner: ReadThrough::new("redirect", Freshness::Permanent, coalesce) }
    }

    /// Canonical URL for `id`.
    ///
    /// Absent or ambiguous matches are `NotFound` and are not remembered.
    pub async fn resolve(&self, id: &BillId, scope: &RequestScope) -> Result<String, Error> {
        let api = Arc::clone(&self.api);
        let id = *id;
        self.inner
            .get_or_fetch(id, scope, async move {
                let matter = unique_matter(api.as_ref(), &id).await?;
                let url = api.resolve_canonical_url(matter.matter_id).await?;
                tracing::debug!(bill = %id, matter_id = matter.matter_id, %url, "resolved canonical url");
                Ok(url)
            })
            .await
    }

    /// Validate a raw path segment, then resolve it.
    pub async fn resolve_path(&self, segment: &str, scope: &RequestScope) -> Result<String, Error> {
        let id = BillId::parse(segment)?;
        self.resolve(&id, scope).await
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
