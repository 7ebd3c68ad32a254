//! Period error types.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur when constructing a period.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    /// Start is not strictly before end.
    #[error("Invalid period: start {start} must be before end {end}")]
    InvalidRange {
        /// Start date (inclusive).
        start: NaiveDate,
        /// End date (exclusive).
        end: NaiveDate,
    },

    /// Month outside 1-12.
    #[error("Invalid month: {0}")]
    InvalidMonth(u32),

    /// Quarter outside 1-4.
    #[error("Invalid quarter: {0}")]
    InvalidQuarter(u32),

    /// Date is outside the supported calendar range.
    #[error("Date out of range for year {0}")]
    OutOfRange(i32),
}
