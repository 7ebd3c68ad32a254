//! Fetch orchestration: canonical first, enrichment concurrently.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::clock::Clock;
use crate::error::ReconciliationError;
use crate::period::Period;
use crate::sources::{ProviderError, ProviderSet, SnapshotStatus, SourceId, SourceSnapshot};
use crate::statement::StatementKind;

use super::bundle::SourceBundle;
use super::cache::SnapshotCache;
use super::plan::SourcePlan;
use super::settings::FetchSettings;

/// Builds [`SourceBundle`]s from a provider set.
///
/// Owns the snapshot cache; the cache population is the only side effect of
/// a fetch.
#[derive(Clone)]
pub struct FetchOrchestrator {
    providers: ProviderSet,
    settings: FetchSettings,
    cache: SnapshotCache,
    clock: Arc<dyn Clock>,
}

impl FetchOrchestrator {
    /// Creates an orchestrator with a fresh cache.
    #[must_use]
    pub fn new(providers: ProviderSet, settings: FetchSettings, clock: Arc<dyn Clock>) -> Self {
        let cache = SnapshotCache::new(&settings);
        Self::with_cache(providers, settings, cache, clock)
    }

    /// Creates an orchestrator sharing an existing cache.
    #[must_use]
    pub fn with_cache(
        providers: ProviderSet,
        settings: FetchSettings,
        cache: SnapshotCache,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            providers,
            settings,
            cache,
            clock,
        }
    }

    /// The snapshot cache.
    #[must_use]
    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// Fetches the bundle `kind` needs for `period`.
    ///
    /// Enrichment failures never abort: the failed source is present in the
    /// bundle with `status = unavailable` and the reason in `note`.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalSourceUnavailable` if the ledger cannot be fetched,
    /// times out, has no provider, reports itself unavailable or answers for
    /// another period.
    pub async fn fetch(
        &self,
        period: &Period,
        kind: StatementKind,
    ) -> Result<SourceBundle, ReconciliationError> {
        let plan = SourcePlan::for_statement(kind);
        let span = info_span!("fetch_bundle", statement = %kind, period = %period);

        async move {
            let canonical = self.fetch_one(plan.canonical, period).await.map_err(|err| {
                warn!(source = %plan.canonical, error = %err, "Canonical fetch failed");
                ReconciliationError::CanonicalSourceUnavailable {
                    source_id: plan.canonical,
                    reason: err.to_string(),
                }
            })?;

            let fetches = plan.enrichment.iter().map(|&source| async move {
                let snapshot = match self.fetch_one(source, period).await {
                    Ok(snapshot) => snapshot,
                    Err(err) => {
                        warn!(%source, error = %err, "Enrichment source unavailable");
                        Arc::new(SourceSnapshot::unavailable(
                            source,
                            *period,
                            self.clock.now(),
                            err.to_string(),
                        ))
                    }
                };
                (source, snapshot)
            });
            let enrichment = join_all(fetches).await.into_iter().collect();

            let bundle = SourceBundle {
                period: *period,
                canonical,
                enrichment,
            };
            info!(
                unavailable = bundle
                    .enrichment
                    .values()
                    .filter(|s| !s.is_usable())
                    .count(),
                "Bundle fetched"
            );
            Ok(bundle)
        }
        .instrument(span)
        .await
    }

    async fn fetch_one(
        &self,
        source: SourceId,
        period: &Period,
    ) -> Result<Arc<SourceSnapshot>, ProviderError> {
        let provider = self
            .providers
            .get(source)
            .ok_or(ProviderError::NotConfigured(source))?;
        let settings = self.settings.get(source);
        let timeout = settings.timeout;

        let cached = self
            .cache
            .get_or_fetch(source, period, async move {
                let snapshot = tokio::time::timeout(timeout, provider.get_snapshot(period))
                    .await
                    .map_err(|_| ProviderError::Timeout {
                        source_id: source,
                        elapsed: timeout,
                    })??;
                if snapshot.period != *period {
                    return Err(ProviderError::PeriodMismatch {
                        source_id: source,
                        expected: *period,
                        actual: snapshot.period,
                    });
                }
                if snapshot.source != source {
                    return Err(ProviderError::Decode(format!(
                        "provider for {source} returned a {} snapshot",
                        snapshot.source
                    )));
                }
                // An unavailable answer is a failure; keep it out of the cache.
                if snapshot.status == SnapshotStatus::Unavailable {
                    return Err(ProviderError::Unavailable(
                        snapshot
                            .note
                            .unwrap_or_else(|| "no reason given".to_string()),
                    ));
                }
                Ok::<_, ProviderError>(snapshot)
            })
            .await
            .map_err(|err| (*err).clone())?;

        debug!(%source, cache_hit = !cached.fresh, "Snapshot resolved");

        let snapshot = cached.snapshot;
        if snapshot.status == SnapshotStatus::Ok
            && settings
                .freshness
                .is_stale(snapshot.fetched_at, self.clock.now())
        {
            warn!(%source, fetched_at = %snapshot.fetched_at, "Snapshot is stale");
            return Ok(Arc::new(SourceSnapshot {
                status: SnapshotStatus::Stale,
                ..(*snapshot).clone()
            }));
        }
        Ok(snapshot)
    }
}

impl std::fmt::Debug for FetchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("providers", &self.providers)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
