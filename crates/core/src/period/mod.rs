//! Reporting periods.
//!
//! A [`Period`] is a half-open date range `[start, end)` with a reporting
//! granularity. Every snapshot in a bundle must cover the same period.

pub mod error;
pub mod types;

pub use error::PeriodError;
pub use types::{Granularity, Period};
