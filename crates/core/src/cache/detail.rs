//! TTL-bounded memo of fully assembled bill details.
//!
//! Building a detail view costs five or more dependent upstream calls. The
//! assembled result is cached, not the individual calls, and is refreshed
//! after the TTL so new history and votes show up within the hour.

use std::sync::Arc;
use std::time::Duration;

use super::lookup::unique_matter;
use super::store::{Freshness, ReadThrough};
use crate::Error;
use crate::bill_id::BillId;
use crate::model::{Attachment, History, Legislation, PersonReference, Vote};
use crate::records::latest_text_id;
use crate::scope::RequestScope;
use crate::source::RecordApi;

/// Default freshness window for assembled details.
pub const DETAIL_TTL: Duration = Duration::from_secs(60 * 60);

pub struct BillDetailMemo {
    api: Arc<dyn RecordApi>,
    inner: ReadThrough<BillId, Arc<Legislation>>,
}

impl BillDetailMemo {
    pub fn new(api: Arc<dyn RecordApi>, ttl: Duration, coalesce: bool) -> Self {
        Self { api, inner: ReadThrough::new("bill_detail", Freshness::Ttl(ttl), coalesce) }
    }

    /// Detail view for `id`.
    ///
    /// Any failing sub-fetch fails the whole call and nothing is stored.
    pub async fn get_detail(&self, id: &BillId, scope: &RequestScope) -> Result<Arc<Legislation>, Error> {
        let api = Arc::clone(&self.api);
        let id = *id;
        self.inner
            .get_or_fetch(id, scope, async move { assemble(api.as_ref(), &id).await.map(Arc::new) })
            .await
    }

    /// Validate a raw path segment, then look it up.
    pub async fn get_detail_path(&self, segment: &str, scope: &RequestScope) -> Result<Arc<Legislation>, Error> {
        let id = BillId::parse(segment)?;
        self.get_detail(&id, scope).await
    }

    /// Age of the stored detail for `id`, if any.
    pub async fn age(&self, id: &BillId) -> Option<Duration> {
        self.inner.age(id).await
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Build the detail aggregate from scratch.
async fn assemble(api: &dyn RecordApi, id: &BillId) -> Result<Legislation, Error> {
    let matter = unique_matter(api, id).await?;
    let mut l = Legislation::from_matter(matter);
    tracing::debug!(bill = %id, matter_id = l.id, "assembling bill detail");

    l.sponsors = api
        .matter_sponsors(l.id)
        .await?
        .into_iter()
        .filter(|s| s.matter_sponsor_matter_version == l.version)
        .map(PersonReference::from)
        .collect();

    let mut histories = api.matter_histories(l.id).await?;
    histories.sort_by_key(|h| h.matter_history_action_date);
    let mut history = Vec::with_capacity(histories.len());
    for record in histories {
        let has_outcome = record.has_outcome();
        let mut entry = History::from(record);
        if has_outcome {
            entry.votes = api.event_votes(entry.id).await?.into_iter().map(Vote::from).collect();
        }
        history.push(entry);
    }
    l.history = history;

    l.attachments = api.matter_attachments(l.id).await?.into_iter().map(Attachment::from).collect();

    let versions = api.matter_text_versions(l.id).await?;
    l.text_id = latest_text_id(&versions);
    if let Some(text_id) = l.text_id {
        let text = api.matter_text(l.id, text_id).await?;
        l.text = text.simplified_text();
        l.rtf = text.simplified_rtf();
    }

    Ok(l)
}
