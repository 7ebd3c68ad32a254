//! Per-source fetch settings: cache TTL, timeout and freshness policy.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ledgerlens_shared::AppConfig;
use ledgerlens_shared::config::FreshnessConfig;

use crate::error::ReconciliationError;
use crate::sources::SourceId;

/// Default per-fetch timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// How old a snapshot may be before it is tagged stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessPolicy {
    /// Fetched on the same UTC calendar day as "now".
    SameDay,
    /// At most this old.
    MaxAge(Duration),
}

impl FreshnessPolicy {
    /// Returns true if a snapshot fetched at `fetched_at` is stale at `now`.
    #[must_use]
    pub fn is_stale(&self, fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            Self::SameDay => fetched_at.date_naive() != now.date_naive(),
            Self::MaxAge(max_age) => (now - fetched_at)
                .to_std()
                .is_ok_and(|age| age > *max_age),
        }
    }
}

impl From<FreshnessConfig> for FreshnessPolicy {
    fn from(config: FreshnessConfig) -> Self {
        match config {
            FreshnessConfig::SameDay => Self::SameDay,
            FreshnessConfig::MaxAgeSecs(secs) => Self::MaxAge(Duration::from_secs(secs)),
        }
    }
}

/// Settings for one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSettings {
    /// Cache time-to-live.
    pub cache_ttl: Duration,
    /// Fetch timeout.
    pub timeout: Duration,
    /// Staleness threshold.
    pub freshness: FreshnessPolicy,
}

impl SourceSettings {
    /// Built-in defaults for `source`.
    #[must_use]
    pub const fn defaults_for(source: SourceId) -> Self {
        let (ttl, freshness) = match source {
            SourceId::Ledger | SourceId::Payments => {
                (15 * MINUTE, FreshnessPolicy::MaxAge(Duration::from_secs(DAY)))
            }
            SourceId::Bank | SourceId::Card => (5 * MINUTE, FreshnessPolicy::SameDay),
            SourceId::Payroll => (6 * HOUR, FreshnessPolicy::MaxAge(Duration::from_secs(31 * DAY))),
            SourceId::Crm => (6 * HOUR, FreshnessPolicy::MaxAge(Duration::from_secs(7 * DAY))),
            SourceId::Spreadsheet => (HOUR, FreshnessPolicy::MaxAge(Duration::from_secs(7 * DAY))),
        };
        Self {
            cache_ttl: Duration::from_secs(ttl),
            timeout: DEFAULT_TIMEOUT,
            freshness,
        }
    }
}

/// Immutable fetch settings for every source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    sources: BTreeMap<SourceId, SourceSettings>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            sources: SourceId::ALL
                .into_iter()
                .map(|source| (source, SourceSettings::defaults_for(source)))
                .collect(),
        }
    }
}

impl FetchSettings {
    /// Builds settings from `config.sources`, layered over the defaults.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSetting` for unknown source ids or a zero timeout.
    pub fn from_config(config: &AppConfig) -> Result<Self, ReconciliationError> {
        let mut settings = Self::default();
        for (key, source_config) in &config.sources {
            let source: SourceId =
                key.parse()
                    .map_err(|message| ReconciliationError::InvalidSetting {
                        key: format!("sources.{key}"),
                        message,
                    })?;
            let entry = settings.entry_mut(source);
            if let Some(ttl) = source_config.cache_ttl_secs {
                entry.cache_ttl = Duration::from_secs(ttl);
            }
            if let Some(timeout) = source_config.timeout_secs {
                if timeout == 0 {
                    return Err(ReconciliationError::InvalidSetting {
                        key: format!("sources.{key}.timeout_secs"),
                        message: "timeout must be positive".to_string(),
                    });
                }
                entry.timeout = Duration::from_secs(timeout);
            }
            if let Some(freshness) = source_config.freshness {
                entry.freshness = freshness.into();
            }
        }
        Ok(settings)
    }

    /// Settings for `source`.
    #[must_use]
    pub fn get(&self, source: SourceId) -> SourceSettings {
        self.sources
            .get(&source)
            .copied()
            .unwrap_or_else(|| SourceSettings::defaults_for(source))
    }

    /// Replaces the settings for one source.
    #[must_use]
    pub fn with(mut self, source: SourceId, settings: SourceSettings) -> Self {
        self.sources.insert(source, settings);
        self
    }

    fn entry_mut(&mut self, source: SourceId) -> &mut SourceSettings {
        self.sources
            .entry(source)
            .or_insert_with(|| SourceSettings::defaults_for(source))
    }
}
