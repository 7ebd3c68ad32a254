//! Connector boundary error types.

use std::time::Duration;

use thiserror::Error;

use crate::period::Period;

use super::types::SourceId;

/// Errors a snapshot provider may return.
///
/// `Clone` so one failed fetch can be shared by every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Network or transport failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Credentials rejected or expired.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Response could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// No provider is registered for the source.
    #[error("Source {0} is not configured")]
    NotConfigured(SourceId),

    /// The fetch did not finish in time.
    #[error("Fetch from {source_id} timed out after {elapsed:?}")]
    Timeout {
        /// Source that timed out.
        source_id: SourceId,
        /// Configured timeout.
        elapsed: Duration,
    },

    /// The provider answered for a different period.
    #[error("Source {source_id} returned period {actual}, expected {expected}")]
    PeriodMismatch {
        /// Source.
        source_id: SourceId,
        /// Requested period.
        expected: Period,
        /// Period in the snapshot.
        actual: Period,
    },

    /// The provider answered, but with an unavailable snapshot.
    #[error("Source reported unavailable: {0}")]
    Unavailable(String),
}
