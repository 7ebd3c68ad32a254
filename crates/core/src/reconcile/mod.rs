//! Statement reconciliation.
//!
//! Merges a [`crate::fetch::SourceBundle`] into a [`crate::statement::Statement`].
//! The ledger is the truth: enrichment sources only annotate lines or
//! cross-check them, and every disagreement becomes a warning.

mod balance;
mod cash_flow;
pub mod engine;
mod income;
pub mod matching;
pub mod settings;

#[cfg(test)]
mod tests;

pub use engine::ReconciliationEngine;
pub use matching::normalize_label;
pub use settings::{PayrollBucketTable, ReconciliationSettings, Tolerance};
