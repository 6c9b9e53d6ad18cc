//! TTL-bounded cache of snapshot files from object storage.
//!
//! Snapshots are regenerated out of band at irregular intervals. A short TTL
//! bounds staleness while sparing the round trip on every page view; a single
//! page often reads several snapshot files.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use super::store::{Freshness, ReadThrough};
use crate::Error;
use crate::model::LastSync;
use crate::scope::RequestScope;
use crate::source::ObjectSource;

/// Default freshness window for snapshot files.
pub const SNAPSHOT_TTL: Duration = Duration::from_secs(5 * 60);

/// Key of the marker file written at the end of every sync run.
pub const LAST_SYNC_KEY: &str = "build/last_sync.json";

/// Read-through cache mapping a storage key to the object's bytes.
pub struct SnapshotCache {
    source: Arc<dyn ObjectSource>,
    inner: ReadThrough<String, Bytes>,
}

impl SnapshotCache {
    pub fn new(source: Arc<dyn ObjectSource>, ttl: Duration, coalesce: bool) -> Self {
        Self { source, inner: ReadThrough::new("snapshot", Freshness::Ttl(ttl), coalesce) }
    }

    /// Bytes of the object stored under `key`.
    ///
    /// A missing object is `NotFound` and is not remembered, so an object
    /// created by a later sync is picked up on the next call.
    pub async fn get(&self, key: &str, scope: &RequestScope) -> Result<Bytes, Error> {
        let key = normalize_key(key)?;
        let source = Arc::clone(&self.source);
        let object = key.clone();
        self.inner
            .get_or_fetch(key, scope, async move {
                tracing::debug!(key = %object, source = %source.describe(), "fetching snapshot");
                source.open_object(&object).await
            })
            .await
    }

    /// Decode the object under `key` as JSON.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str, scope: &RequestScope) -> Result<T, Error> {
        let bytes = self.get(key, scope).await?;
        serde_json::from_slice(&bytes).map_err(|e| Error::Decode(format!("{key}: {e}")))
    }

    /// Time of the last completed snapshot sync.
    pub async fn last_sync(&self, scope: &RequestScope) -> Result<LastSync, Error> {
        self.get_json(LAST_SYNC_KEY, scope).await
    }

    /// Number of keys currently held, fresh or stale.
    pub async fn len(&self) -> usize {
        self.inner.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Keys are compared in their normalized form: no leading slash.
fn normalize_key(key: &str) -> Result<String, Error> {
    let key = key.trim().trim_start_matches('/');
    if key.is_empty() {
        return Err(Error::NotFound("empty snapshot key".into()));
    }
    Ok(key.to_string())
}
