//! Snapshot caching using Moka.
//!
//! Read-through cache keyed by `(source, period)` with a per-source TTL.
//! Concurrent requests for the same key share a single provider call; failed
//! fetches are never stored.
//!
//! TTL expiry is the only invalidation. The cache is also bounded by
//! capacity, so under pressure Moka may evict an entry before its TTL; the
//! next request then refetches it. TTLs run on Moka's own monotonic clock,
//! not on the injected [`Clock`](crate::clock::Clock).

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;

use crate::period::Period;
use crate::sources::{ProviderError, SourceId, SourceSnapshot};

use super::settings::FetchSettings;

/// Default cache capacity (number of snapshots).
const DEFAULT_CACHE_CAPACITY: u64 = 256;

type CacheKey = (SourceId, Period);

/// Expires each entry after its source's configured TTL.
struct PerSourceTtl {
    settings: FetchSettings,
}

impl Expiry<CacheKey, Arc<SourceSnapshot>> for PerSourceTtl {
    fn expire_after_create(
        &self,
        key: &CacheKey,
        _value: &Arc<SourceSnapshot>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(self.settings.get(key.0).cache_ttl)
    }
}

/// A snapshot returned by the cache.
#[derive(Debug, Clone)]
pub struct CachedSnapshot {
    /// The shared snapshot.
    pub snapshot: Arc<SourceSnapshot>,
    /// True if this call (or the call it joined) hit the provider.
    pub fresh: bool,
}

/// Cache for source snapshots.
///
/// Thread-safe and cheap to clone; clones share the same entries.
#[derive(Clone)]
pub struct SnapshotCache {
    cache: Cache<CacheKey, Arc<SourceSnapshot>>,
}

impl SnapshotCache {
    /// Creates a cache using the TTLs in `settings`.
    #[must_use]
    pub fn new(settings: &FetchSettings) -> Self {
        Self::with_capacity(settings, DEFAULT_CACHE_CAPACITY)
    }

    /// Creates a cache holding at most `max_capacity` snapshots.
    #[must_use]
    pub fn with_capacity(settings: &FetchSettings, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerSourceTtl {
                settings: settings.clone(),
            })
            .build();

        Self { cache }
    }

    /// Returns the cached snapshot for `(source, period)` or runs `fetch`.
    ///
    /// If another task is already fetching the same key, this call waits for
    /// that fetch instead of starting its own.
    ///
    /// # Errors
    ///
    /// Returns the fetch error, shared with every waiter of that fetch.
    pub async fn get_or_fetch<F>(
        &self,
        source: SourceId,
        period: &Period,
        fetch: F,
    ) -> Result<CachedSnapshot, Arc<ProviderError>>
    where
        F: Future<Output = Result<SourceSnapshot, ProviderError>>,
    {
        let entry = self
            .cache
            .entry((source, *period))
            .or_try_insert_with(async move { fetch.await.map(Arc::new) })
            .await?;

        Ok(CachedSnapshot {
            fresh: entry.is_fresh(),
            snapshot: entry.into_value(),
        })
    }

    /// Returns the number of entries currently in the cache.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs pending maintenance (expiry, eviction) immediately.
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl std::fmt::Debug for SnapshotCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCache")
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}
