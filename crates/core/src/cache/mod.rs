//! In-process read-through caches in front of object storage and the
//! legislative-records API.
//!
//! - [`SnapshotCache`]: storage key to bytes, short TTL
//! - [`RedirectMemo`]: bill id to canonical URL, never expires
//! - [`BillDetailMemo`]: bill id to assembled [`Legislation`](crate::model::Legislation), one-hour TTL
//!
//! All three are safe to share across request tasks. Failed fetches are never
//! stored, and a request cancelled mid-fetch stores nothing.

mod detail;
mod lock;
mod lookup;
mod redirect;
mod snapshot;
mod store;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

pub use detail::{BillDetailMemo, DETAIL_TTL};
pub use redirect::RedirectMemo;
pub use snapshot::{LAST_SYNC_KEY, SNAPSHOT_TTL, SnapshotCache};
pub use store::Freshness;

use crate::config::AppConfig;
use crate::source::{ObjectSource, RecordApi};

/// Tunables shared by the three caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub snapshot_ttl: Duration,
    pub detail_ttl: Duration,
    /// Share one upstream fetch between concurrent misses on the same key.
    pub coalesce: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { snapshot_ttl: SNAPSHOT_TTL, detail_ttl: DETAIL_TTL, coalesce: false }
    }
}

impl From<&AppConfig> for CacheSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            snapshot_ttl: config.snapshot_ttl(),
            detail_ttl: config.detail_ttl(),
            coalesce: config.coalesce_fetches,
        }
    }
}

/// The three process-wide caches, built once at startup and shared by
/// every request handler.
pub struct CacheService {
    pub snapshots: SnapshotCache,
    pub redirects: RedirectMemo,
    pub details: BillDetailMemo,
}

impl CacheService {
    pub fn new(objects: Arc<dyn ObjectSource>, records: Arc<dyn RecordApi>, settings: CacheSettings) -> Self {
        tracing::info!(
            objects = %objects.describe(),
            snapshot_ttl_secs = settings.snapshot_ttl.as_secs(),
            detail_ttl_secs = settings.detail_ttl.as_secs(),
            coalesce = settings.coalesce,
            "cache service ready"
        );
        Self {
            snapshots: SnapshotCache::new(objects, settings.snapshot_ttl, settings.coalesce),
            redirects: RedirectMemo::new(Arc::clone(&records), settings.coalesce),
            details: BillDetailMemo::new(records, settings.detail_ttl, settings.coalesce),
        }
    }

    pub fn from_config(config: &AppConfig, objects: Arc<dyn ObjectSource>, records: Arc<dyn RecordApi>) -> Self {
        Self::new(objects, records, CacheSettings::from(config))
    }
}
