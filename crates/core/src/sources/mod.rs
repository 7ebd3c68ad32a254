//! Data sources.
//!
//! Every source is reached through a [`SnapshotProvider`] and produces a
//! normalized [`SourceSnapshot`]. The ledger is canonical; everything else
//! enriches or cross-checks it.

pub mod demo;
pub mod error;
pub mod provider;
pub mod types;

pub use demo::DemoProvider;
pub use error::ProviderError;
pub use provider::{ProviderSet, SnapshotProvider};
pub use types::{
    BillingInterval, CashTransaction, Direction, FigureKey, Metric, SnapshotStatus, SourceId,
    SourceSnapshot, Subscription,
};
