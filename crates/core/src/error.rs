//! Reconciliation error types.

use ledgerlens_shared::{AppError, Currency};
use thiserror::Error;

use crate::period::{Period, PeriodError};
use crate::sources::SourceId;

/// Errors that abort a statement build.
///
/// Everything else (enrichment failures, divergences, unmatched mappings,
/// stale data) is reported as a [`crate::statement::Warning`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconciliationError {
    /// The ledger could not be fetched.
    #[error("Canonical source {source_id} unavailable: {reason}")]
    CanonicalSourceUnavailable {
        /// Canonical source.
        source_id: SourceId,
        /// Failure reason.
        reason: String,
    },

    /// The requested period is invalid.
    #[error(transparent)]
    InvalidPeriod(#[from] PeriodError),

    /// A snapshot covers a different period than the bundle.
    #[error("Snapshot from {source_id} covers {actual}, bundle covers {expected}")]
    PeriodMismatch {
        /// Offending source.
        source_id: SourceId,
        /// Bundle period.
        expected: Period,
        /// Snapshot period.
        actual: Period,
    },

    /// The bundle violates a structural invariant.
    #[error("Invalid source bundle: {0}")]
    InvalidBundle(String),

    /// A ledger figure is not in the company currency.
    #[error("Ledger figure {figure} is in {found}, expected {expected}")]
    CurrencyMismatch {
        /// Figure key.
        figure: String,
        /// Currency found.
        found: Currency,
        /// Company currency.
        expected: Currency,
    },

    /// A configuration value cannot be turned into a setting.
    #[error("Invalid setting {key}: {message}")]
    InvalidSetting {
        /// Configuration key.
        key: String,
        /// What is wrong with it.
        message: String,
    },
}

impl From<ReconciliationError> for AppError {
    fn from(err: ReconciliationError) -> Self {
        match err {
            ReconciliationError::CanonicalSourceUnavailable { .. } => {
                Self::CanonicalSource(err.to_string())
            }
            ReconciliationError::InvalidPeriod(_) => Self::Validation(err.to_string()),
            ReconciliationError::PeriodMismatch { .. }
            | ReconciliationError::InvalidBundle(_)
            | ReconciliationError::CurrencyMismatch { .. } => {
                Self::InvalidSourceData(err.to_string())
            }
            ReconciliationError::InvalidSetting { .. } => Self::Configuration(err.to_string()),
        }
    }
}
