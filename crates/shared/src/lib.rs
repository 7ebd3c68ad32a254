//! Shared types, errors, and configuration for Ledgerlens.
//!
//! This crate provides common types used across all other crates:
//! - Money types with decimal precision
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use types::{Currency, Money};
