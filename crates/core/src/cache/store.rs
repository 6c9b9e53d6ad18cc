//! Shared read-through machinery behind all three caches.
//!
//! Lookups take the read lock only to check freshness. The upstream fetch
//! runs with no lock held, and the write lock is taken only to install the
//! finished value. Entries are never mutated in place; a refresh replaces the
//! whole entry.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::lock::mutex_lock;
use crate::Error;
use crate::scope::RequestScope;

const SOURCE: &str = "cache::store";

/// How long an installed entry may be served without a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Served while younger than the TTL, then replaced on the next lookup.
    Ttl(Duration),
    /// Served for the life of the process; the first installed value wins.
    Permanent,
}

/// Cached value with the instant it was fetched.
#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    fetched_at: Instant,
}

impl<V> Entry<V> {
    fn is_fresh(&self, freshness: Freshness, now: Instant) -> bool {
        match freshness {
            Freshness::Ttl(ttl) => now.saturating_duration_since(self.fetched_at) < ttl,
            Freshness::Permanent => true,
        }
    }
}

/// Keyed entries behind a reader/writer lock.
pub(crate) struct EntryMap<K, V> {
    entries: Arc<RwLock<HashMap<K, Entry<V>>>>,
    freshness: Freshness,
}

impl<K, V> Clone for EntryMap<K, V> {
    fn clone(&self) -> Self {
        Self { entries: Arc::clone(&self.entries), freshness: self.freshness }
    }
}

impl<K, V> EntryMap<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub(crate) fn new(freshness: Freshness) -> Self {
        Self { entries: Arc::new(RwLock::new(HashMap::new())), freshness }
    }

    /// Value for `key` if present and still fresh.
    pub(crate) async fn get_fresh(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.is_fresh(self.freshness, Instant::now()))
            .map(|entry| entry.value.clone())
    }

    /// Store a freshly fetched value and return the value now held for the
    /// key. Under `Permanent` an existing entry is kept and returned instead.
    pub(crate) async fn install(&self, key: K, value: V) -> V {
        let mut entries = self.entries.write().await;
        let entry = Entry { value, fetched_at: Instant::now() };
        match self.freshness {
            Freshness::Ttl(_) => {
                let value = entry.value.clone();
                entries.insert(key, entry);
                value
            }
            Freshness::Permanent => entries.entry(key).or_insert(entry).value.clone(),
        }
    }

    pub(crate) async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Age of the entry for `key`, fresh or not.
    pub(crate) async fn age(&self, key: &K) -> Option<Duration> {
        let entries = self.entries.read().await;
        entries.get(key).map(|entry| Instant::now().saturating_duration_since(entry.fetched_at))
    }
}

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, Error>>>;

/// In-flight fetches, so concurrent misses for one key share a single
/// upstream round trip.
pub(crate) struct Flights<K, V> {
    pending: Mutex<HashMap<K, SharedFetch<V>>>,
}

impl<K, V> Flights<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn new() -> Self {
        Self { pending: Mutex::new(HashMap::new()) }
    }

    /// Join the pending fetch for `key`, or start one with `start`.
    fn join(&self, key: &K, start: impl FnOnce() -> BoxFuture<'static, Result<V, Error>>) -> (SharedFetch<V>, bool) {
        let mut pending = mutex_lock(&self.pending, SOURCE, "flights.join");
        if let Some(fetch) = pending.get(key) {
            return (fetch.clone(), false);
        }
        let fetch = start().shared();
        pending.insert(key.clone(), fetch.clone());
        (fetch, true)
    }

    /// Forget `fetch` once a waiter is done with it. A newer flight for the
    /// same key is left alone.
    fn complete(&self, key: &K, fetch: &SharedFetch<V>) {
        let mut pending = mutex_lock(&self.pending, SOURCE, "flights.complete");
        if pending.get(key).is_some_and(|current| current.ptr_eq(fetch)) {
            pending.remove(key);
        }
    }
}

/// Drops a waiter's claim on a flight when the waiter finishes or is
/// dropped mid-fetch, so an abandoned flight is never joined later.
struct FlightGuard<'a, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    flights: &'a Flights<K, V>,
    key: K,
    fetch: SharedFetch<V>,
}

impl<K, V> Drop for FlightGuard<'_, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn drop(&mut self) {
        self.flights.complete(&self.key, &self.fetch);
    }
}

/// Read-through cache: a fresh hit is served from memory, anything else is
/// fetched, installed and returned. Failures are never installed.
pub(crate) struct ReadThrough<K, V> {
    name: &'static str,
    map: EntryMap<K, V>,
    flights: Option<Flights<K, V>>,
}

impl<K, V> ReadThrough<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Display + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(name: &'static str, freshness: Freshness, coalesce: bool) -> Self {
        Self { name, map: EntryMap::new(freshness), flights: coalesce.then(Flights::new) }
    }

    pub(crate) async fn get_or_fetch<F>(&self, key: K, scope: &RequestScope, fetch: F) -> Result<V, Error>
    where
        F: Future<Output = Result<V, Error>> + Send + 'static,
    {
        if let Some(value) = self.map.get_fresh(&key).await {
            tracing::debug!(cache = self.name, %key, "cache hit");
            return Ok(value);
        }
        tracing::debug!(cache = self.name, %key, "cache miss");

        let Some(flights) = &self.flights else {
            let value = scope.run(self.name, fetch).await?;
            return Ok(self.map.install(key, value).await);
        };

        let (shared, leader) = flights.join(&key, || {
            let map = self.map.clone();
            let key = key.clone();
            async move {
                let value = fetch.await?;
                Ok(map.install(key, value).await)
            }
            .boxed()
        });
        if !leader {
            tracing::debug!(cache = self.name, %key, "joined in-flight fetch");
        }

        let _guard = FlightGuard { flights, key, fetch: shared.clone() };
        scope.run(self.name, shared).await
    }

    pub(crate) async fn len(&self) -> usize {
        self.map.len().await
    }

    pub(crate) async fn age(&self, key: &K) -> Option<Duration> {
        self.map.age(key).await
    }
}
