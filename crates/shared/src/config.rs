//! Application configuration management.
//!
//! Every value here is an immutable input to a statement build. Values are
//! layered from `config/default.toml`, `config/{RUN_MODE}.toml` and
//! `LEDGERLENS__*` environment variables.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::Currency;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Company-wide settings.
    pub company: CompanyConfig,
    /// Use the deterministic demo providers instead of live connectors.
    pub use_demo_data: bool,
    /// Per-source fetch settings keyed by source id (`ledger`, `bank`, ...).
    pub sources: BTreeMap<String, SourceConfig>,
    /// Merge-rule parameters.
    pub reconciliation: ReconciliationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            company: CompanyConfig::default(),
            use_demo_data: true,
            sources: BTreeMap::new(),
            reconciliation: ReconciliationConfig::default(),
        }
    }
}

/// Company configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompanyConfig {
    /// Display name.
    pub name: String,
    /// Reporting currency; figures in other currencies are never converted.
    pub currency: Currency,
    /// First month of the fiscal year (1-12).
    pub fiscal_year_start_month: u32,
}

impl Default for CompanyConfig {
    fn default() -> Self {
        Self {
            name: "My SaaS Co".to_string(),
            currency: Currency::Usd,
            fiscal_year_start_month: 1,
        }
    }
}

/// Fetch settings for one source. Unset fields fall back to built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Read-through cache time-to-live in seconds.
    pub cache_ttl_secs: Option<u64>,
    /// Per-fetch timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// How old a snapshot may be before it is tagged stale.
    pub freshness: Option<FreshnessConfig>,
}

/// Freshness threshold as written in configuration.
///
/// TOML: `freshness = "same_day"` or `freshness = { max_age_secs = 3600 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessConfig {
    /// Snapshot must be fetched on the current UTC calendar day.
    SameDay,
    /// Snapshot may be at most this many seconds old.
    MaxAgeSecs(u64),
}

/// Divergence tolerance: `max(|reference| * ratio, floor)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ToleranceConfig {
    /// Relative tolerance (0.05 = 5%).
    pub ratio: Decimal,
    /// Absolute tolerance floor in company currency.
    #[serde(default)]
    pub floor: Decimal,
}

impl ToleranceConfig {
    /// Creates a purely relative tolerance.
    #[must_use]
    pub const fn ratio(ratio: Decimal) -> Self {
        Self {
            ratio,
            floor: Decimal::ZERO,
        }
    }

    /// Creates a purely absolute tolerance.
    #[must_use]
    pub const fn floor(floor: Decimal) -> Self {
        Self {
            ratio: Decimal::ZERO,
            floor,
        }
    }
}

/// Reconciliation (merge rule) configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Ledger vs payment-processor revenue.
    pub revenue_tolerance: ToleranceConfig,
    /// Ledger balances vs bank/card/deferred-revenue cross-checks.
    pub balance_tolerance: ToleranceConfig,
    /// Ledger payroll cash-out vs payroll provider.
    pub payroll_tolerance: ToleranceConfig,
    /// Ledger net change in cash vs bank inflows minus outflows.
    pub cash_tolerance: ToleranceConfig,
    /// Payroll department -> P&L category (e.g. `engineering = "research_and_development"`).
    /// Empty means the built-in table.
    pub payroll_departments: BTreeMap<String, String>,
    /// Transaction categories or tags treated as fundraising and excluded from burn.
    pub fundraising_exclusions: Vec<String>,
    /// Trailing window used to average monthly net burn.
    pub runway_window_months: u32,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            revenue_tolerance: ToleranceConfig::ratio(Decimal::new(5, 2)),
            balance_tolerance: ToleranceConfig::ratio(Decimal::new(1, 2)),
            payroll_tolerance: ToleranceConfig::ratio(Decimal::new(5, 2)),
            cash_tolerance: ToleranceConfig::floor(Decimal::new(1000, 0)),
            payroll_departments: BTreeMap::new(),
            fundraising_exclusions: vec![
                "fundraising".to_string(),
                "equity_financing".to_string(),
                "investor_funding".to_string(),
            ],
            runway_window_months: 3,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("LEDGERLENS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Parses configuration from a TOML document, without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid configuration.
    pub fn from_toml_str(toml: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
