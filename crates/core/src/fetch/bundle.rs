//! The per-request set of snapshots a statement is built from.

use std::collections::BTreeMap;
use std::sync::Arc;

use ledgerlens_shared::Currency;

use crate::error::ReconciliationError;
use crate::period::Period;
use crate::sources::{SnapshotStatus, SourceId, SourceSnapshot};

/// One canonical snapshot plus whatever enrichment could be fetched.
///
/// Invariants (checked by [`SourceBundle::validate`]): the canonical snapshot
/// is the ledger and not `unavailable`, every snapshot covers `period`, and
/// every enrichment entry is keyed by its own source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBundle {
    /// Period every snapshot covers.
    pub period: Period,
    /// The ledger snapshot.
    pub canonical: Arc<SourceSnapshot>,
    /// Enrichment snapshots by source. Failed sources are present with
    /// `status = unavailable`; sources outside the plan are absent.
    pub enrichment: BTreeMap<SourceId, Arc<SourceSnapshot>>,
}

impl SourceBundle {
    /// Creates a bundle with no enrichment.
    #[must_use]
    pub fn new(period: Period, canonical: SourceSnapshot) -> Self {
        Self {
            period,
            canonical: Arc::new(canonical),
            enrichment: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) an enrichment snapshot.
    #[must_use]
    pub fn with_enrichment(mut self, snapshot: SourceSnapshot) -> Self {
        self.enrichment.insert(snapshot.source, Arc::new(snapshot));
        self
    }

    /// Enrichment snapshot for `source` if present and usable (`ok` or `stale`).
    #[must_use]
    pub fn usable(&self, source: SourceId) -> Option<&SourceSnapshot> {
        self.enrichment
            .get(&source)
            .map(AsRef::as_ref)
            .filter(|snapshot| snapshot.is_usable())
    }

    /// Canonical snapshot followed by enrichment snapshots in source order.
    pub fn snapshots(&self) -> impl Iterator<Item = &SourceSnapshot> {
        std::iter::once(self.canonical.as_ref()).chain(self.enrichment.values().map(AsRef::as_ref))
    }

    /// Checks the bundle invariants and that ledger figures are in `currency`.
    ///
    /// # Errors
    ///
    /// - `CanonicalSourceUnavailable` if the ledger snapshot is unavailable
    /// - `InvalidBundle` if the canonical snapshot is not the ledger or an
    ///   enrichment entry is keyed by the wrong source
    /// - `PeriodMismatch` if any snapshot covers another period
    /// - `CurrencyMismatch` if a ledger figure is in a foreign currency
    pub fn validate(&self, currency: Currency) -> Result<(), ReconciliationError> {
        let canonical = self.canonical.as_ref();
        if canonical.source != SourceId::Ledger {
            return Err(ReconciliationError::InvalidBundle(format!(
                "canonical snapshot must come from the ledger, got {}",
                canonical.source
            )));
        }
        if canonical.status == SnapshotStatus::Unavailable {
            return Err(ReconciliationError::CanonicalSourceUnavailable {
                source_id: canonical.source,
                reason: canonical
                    .note
                    .clone()
                    .unwrap_or_else(|| "snapshot unavailable".to_string()),
            });
        }
        for (source, snapshot) in &self.enrichment {
            if snapshot.source != *source {
                return Err(ReconciliationError::InvalidBundle(format!(
                    "enrichment entry {source} holds a {} snapshot",
                    snapshot.source
                )));
            }
            if *source == SourceId::Ledger {
                return Err(ReconciliationError::InvalidBundle(
                    "the ledger cannot be an enrichment source".to_string(),
                ));
            }
        }
        if let Some(snapshot) = self.snapshots().find(|s| s.period != self.period) {
            return Err(ReconciliationError::PeriodMismatch {
                source_id: snapshot.source,
                expected: self.period,
                actual: snapshot.period,
            });
        }
        if let Some((key, money)) = canonical
            .figures
            .iter()
            .find(|(_, money)| money.currency != currency)
        {
            return Err(ReconciliationError::CurrencyMismatch {
                figure: key.to_string(),
                found: money.currency,
                expected: currency,
            });
        }
        Ok(())
    }
}
