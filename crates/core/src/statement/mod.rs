//! Statement model.
//!
//! The canonical line-item tree produced by reconciliation and consumed by
//! rendering layers. Field names are stable; every type serializes with serde.

pub mod types;

pub use types::*;
