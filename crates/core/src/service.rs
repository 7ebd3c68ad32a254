//! Statement service: fetch a bundle, reconcile it, return the statement.

use std::sync::Arc;

use ledgerlens_shared::AppConfig;
use tracing::{Instrument, info, info_span};

use crate::clock::Clock;
use crate::error::ReconciliationError;
use crate::fetch::{FetchOrchestrator, FetchSettings};
use crate::period::Period;
use crate::reconcile::{ReconciliationEngine, ReconciliationSettings};
use crate::sources::ProviderSet;
use crate::statement::{Statement, StatementKind, WarningKind};

/// Builds reconciled statements.
///
/// Stateless apart from the orchestrator's snapshot cache, so one service can
/// serve concurrent requests.
#[derive(Debug)]
pub struct StatementService {
    orchestrator: FetchOrchestrator,
    engine: ReconciliationEngine,
}

impl StatementService {
    /// Creates a service from its parts.
    #[must_use]
    pub const fn new(orchestrator: FetchOrchestrator, engine: ReconciliationEngine) -> Self {
        Self {
            orchestrator,
            engine,
        }
    }

    /// Creates a service from application configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSetting` if the fetch or reconciliation sections are
    /// invalid.
    pub fn from_config(
        config: &AppConfig,
        providers: ProviderSet,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ReconciliationError> {
        let fetch = FetchSettings::from_config(config)?;
        let settings = ReconciliationSettings::from_config(config)?;
        Ok(Self::new(
            FetchOrchestrator::new(providers, fetch, clock),
            ReconciliationEngine::new(settings),
        ))
    }

    /// The fetch orchestrator.
    #[must_use]
    pub const fn orchestrator(&self) -> &FetchOrchestrator {
        &self.orchestrator
    }

    /// Builds the income statement for `period`.
    ///
    /// # Errors
    ///
    /// See [`StatementService::build`].
    pub async fn build_income_statement(
        &self,
        period: &Period,
    ) -> Result<Statement, ReconciliationError> {
        self.build(period, StatementKind::Income).await
    }

    /// Builds the balance sheet as of the end of `period`.
    ///
    /// # Errors
    ///
    /// See [`StatementService::build`].
    pub async fn build_balance_sheet(
        &self,
        period: &Period,
    ) -> Result<Statement, ReconciliationError> {
        self.build(period, StatementKind::Balance).await
    }

    /// Builds the cash flow statement for `period`.
    ///
    /// # Errors
    ///
    /// See [`StatementService::build`].
    pub async fn build_cash_flow(&self, period: &Period) -> Result<Statement, ReconciliationError> {
        self.build(period, StatementKind::CashFlow).await
    }

    /// Builds the `kind` statement for `period`.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalSourceUnavailable` if the ledger cannot be fetched,
    /// and a validation error if the ledger snapshot is unusable. Enrichment
    /// problems only surface as warnings on the statement.
    pub async fn build(
        &self,
        period: &Period,
        kind: StatementKind,
    ) -> Result<Statement, ReconciliationError> {
        let span = info_span!("build_statement", statement = %kind, period = %period);
        async move {
            let bundle = self.orchestrator.fetch(period, kind).await?;
            let statement = self.engine.reconcile(&bundle, kind)?;
            info!(
                lines = statement.lines.len(),
                warnings = statement.warnings.len(),
                divergences = statement.warnings_of(WarningKind::Divergence).count(),
                "Statement built"
            );
            Ok(statement)
        }
        .instrument(span)
        .await
    }
}
