//! Fetch orchestration.
//!
//! Turns a period and a statement kind into a [`SourceBundle`]:
//! - static source plan per statement
//! - read-through snapshot cache with per-source TTL and singleflight
//! - per-source timeout and freshness policy
//! - enrichment failure isolation

pub mod bundle;
pub mod cache;
pub mod orchestrator;
pub mod plan;
pub mod settings;


pub use bundle::SourceBundle;
pub use cache::{CachedSnapshot, SnapshotCache};
pub use orchestrator::FetchOrchestrator;
pub use plan::SourcePlan;
pub use settings::{FetchSettings, FreshnessPolicy, SourceSettings};
