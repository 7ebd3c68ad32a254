//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Caller supplied an invalid request (e.g., an empty period).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The authoritative data source could not be reached.
    #[error("Canonical source unavailable: {0}")]
    CanonicalSource(String),

    /// A source returned data that cannot be used.
    #[error("Invalid source data: {0}")]
    InvalidSourceData(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the stable error code for machine-readable output.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::CanonicalSource(_) => "CANONICAL_SOURCE_UNAVAILABLE",
            Self::InvalidSourceData(_) => "INVALID_SOURCE_DATA",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the process exit code used by the command-line front end.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Configuration(_) => 3,
            Self::CanonicalSource(_) => 4,
            Self::InvalidSourceData(_) => 5,
            Self::Internal(_) => 70,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}
