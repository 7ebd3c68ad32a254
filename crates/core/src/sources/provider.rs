//! The connector boundary: one capability shared by every data source.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use ledgerlens_shared::Currency;

use crate::clock::Clock;
use crate::period::Period;

use super::demo::DemoProvider;
use super::error::ProviderError;
use super::types::{SourceId, SourceSnapshot};

/// Produces snapshots for one source.
///
/// Implementations may be OAuth-backed REST clients, spreadsheet readers or
/// the demo generator; the orchestrator only sees this trait.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Source this provider serves.
    fn source(&self) -> SourceId;

    /// Fetches the snapshot for `period`.
    async fn get_snapshot(&self, period: &Period) -> Result<SourceSnapshot, ProviderError>;
}

/// The providers available to an orchestrator, keyed by source.
#[derive(Clone, Default)]
pub struct ProviderSet {
    providers: BTreeMap<SourceId, Arc<dyn SnapshotProvider>>,
}

impl ProviderSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The deterministic demo provider for every source, reporting in `currency`.
    #[must_use]
    pub fn demo(currency: Currency, clock: Arc<dyn Clock>) -> Self {
        SourceId::ALL.into_iter().fold(Self::new(), |set, source| {
            set.with(Arc::new(DemoProvider::new(source, currency, Arc::clone(&clock))))
        })
    }

    /// Selects the demo set when `use_demo_data` is on, otherwise `live`.
    #[must_use]
    pub fn select(
        use_demo_data: bool,
        live: Self,
        currency: Currency,
        clock: Arc<dyn Clock>,
    ) -> Self {
        if use_demo_data {
            Self::demo(currency, clock)
        } else {
            live
        }
    }

    /// Registers a provider, replacing any previous one for the same source.
    #[must_use]
    pub fn with(mut self, provider: Arc<dyn SnapshotProvider>) -> Self {
        self.providers.insert(provider.source(), provider);
        self
    }

    /// Provider for `source`, if registered.
    #[must_use]
    pub fn get(&self, source: SourceId) -> Option<Arc<dyn SnapshotProvider>> {
        self.providers.get(&source).cloned()
    }

    /// Registered sources.
    pub fn sources(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.providers.keys().copied()
    }

    /// Returns true if no provider is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.providers.keys()).finish()
    }
}
