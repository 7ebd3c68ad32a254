//! Core reconciliation logic for Ledgerlens.
//!
//! Turns a reporting period into a reconciled financial statement. The
//! general ledger is the canonical source; payments, bank, card, payroll, CRM
//! and spreadsheet data only annotate and cross-check ledger lines. This crate
//! has no transport dependencies: connectors plug in behind
//! [`sources::SnapshotProvider`].
//!
//! # Modules
//!
//! - `period` - Reporting periods
//! - `sources` - Source snapshots, the provider trait and the demo provider
//! - `fetch` - Fetch orchestration with a read-through snapshot cache
//! - `reconcile` - Per-statement merge rules
//! - `statement` - The reconciled statement model
//! - `service` - The end-to-end build pipeline

pub mod clock;
pub mod error;
pub mod fetch;
pub mod period;
pub mod reconcile;
pub mod service;
pub mod sources;
pub mod statement;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::ReconciliationError;
pub use period::{Granularity, Period};
pub use service::StatementService;
pub use statement::{Statement, StatementKind};
