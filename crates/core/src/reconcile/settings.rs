//! Merge-rule settings: tolerances, payroll mapping, fundraising exclusions.

use std::collections::BTreeMap;

use ledgerlens_shared::config::ToleranceConfig;
use ledgerlens_shared::{AppConfig, Currency, Money};
use rust_decimal::Decimal;

use crate::error::ReconciliationError;
use crate::statement::{Category, Divergence};

use super::matching::normalize_label;

/// Allowed difference between a ledger figure and an enrichment figure:
/// `max(|ledger| * ratio, floor)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tolerance {
    /// Relative part.
    pub ratio: Decimal,
    /// Absolute floor.
    pub floor: Decimal,
}

impl Tolerance {
    /// A purely relative tolerance.
    #[must_use]
    pub const fn ratio(ratio: Decimal) -> Self {
        Self {
            ratio,
            floor: Decimal::ZERO,
        }
    }

    /// The allowed absolute difference around `reference`, rounded to cents.
    ///
    /// Saturates at `Decimal::MAX` instead of overflowing.
    #[must_use]
    pub fn allowed(&self, reference: Decimal) -> Decimal {
        reference
            .abs()
            .checked_mul(self.ratio)
            .unwrap_or(Decimal::MAX)
            .max(self.floor)
            .round_dp(2)
    }

    /// Compares an enrichment figure with the ledger figure.
    ///
    /// Returns the divergence when the difference exceeds the tolerance.
    /// Figures in different currencies are never compared.
    #[must_use]
    pub fn check(&self, canonical: Money, enrichment: Money) -> Option<Divergence> {
        let difference = canonical.checked_sub(&enrichment)?.abs();
        let allowed = self.allowed(canonical.amount);
        (difference.amount > allowed).then(|| Divergence {
            canonical,
            enrichment,
            difference,
            tolerance: Money::new(allowed, canonical.currency),
        })
    }
}

impl From<ToleranceConfig> for Tolerance {
    fn from(config: ToleranceConfig) -> Self {
        Self {
            ratio: config.ratio,
            floor: config.floor,
        }
    }
}

/// Payroll department -> P&L category.
///
/// Department names are matched case-insensitively after label normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayrollBucketTable {
    buckets: BTreeMap<String, Category>,
}

impl PayrollBucketTable {
    /// The built-in table.
    #[must_use]
    pub fn builtin() -> Self {
        [
            ("engineering", Category::ResearchAndDevelopment),
            ("customer success", Category::Cogs),
            ("sales", Category::SalesAndMarketing),
            ("marketing", Category::SalesAndMarketing),
            ("sales and marketing", Category::SalesAndMarketing),
            ("finance", Category::GeneralAndAdministrative),
            ("hr", Category::GeneralAndAdministrative),
            ("legal", Category::GeneralAndAdministrative),
            ("operations", Category::GeneralAndAdministrative),
        ]
        .into_iter()
        .fold(Self::empty(), |table, (department, category)| {
            table.with(department, category)
        })
    }

    /// A table with no mappings.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            buckets: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) a mapping.
    #[must_use]
    pub fn with(mut self, department: &str, category: Category) -> Self {
        self.buckets.insert(normalize_label(department), category);
        self
    }

    /// Category for `department`, if mapped.
    #[must_use]
    pub fn category_for(&self, department: &str) -> Option<Category> {
        self.buckets.get(&normalize_label(department)).copied()
    }
}

impl Default for PayrollBucketTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Immutable settings for one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationSettings {
    /// Company currency. Enrichment figures in other currencies are skipped.
    pub currency: Currency,
    /// Ledger vs processor revenue.
    pub revenue_tolerance: Tolerance,
    /// Balance cross-checks (bank, card, deferred revenue).
    pub balance_tolerance: Tolerance,
    /// Ledger vs provider payroll cash-out.
    pub payroll_tolerance: Tolerance,
    /// Ledger net change in cash vs bank net flow.
    pub cash_tolerance: Tolerance,
    /// Payroll department mapping.
    pub payroll_buckets: PayrollBucketTable,
    /// Lowercased transaction categories/tags excluded from burn.
    pub fundraising_exclusions: Vec<String>,
    /// Months averaged for runway.
    pub runway_window_months: u32,
}

impl Default for ReconciliationSettings {
    fn default() -> Self {
        Self {
            currency: Currency::Usd,
            revenue_tolerance: Tolerance::ratio(Decimal::new(5, 2)),
            balance_tolerance: Tolerance::ratio(Decimal::new(1, 2)),
            payroll_tolerance: Tolerance::ratio(Decimal::new(5, 2)),
            cash_tolerance: Tolerance {
                ratio: Decimal::ZERO,
                floor: Decimal::new(1000, 0),
            },
            payroll_buckets: PayrollBucketTable::builtin(),
            fundraising_exclusions: vec![
                "fundraising".to_string(),
                "equity_financing".to_string(),
                "investor_funding".to_string(),
            ],
            runway_window_months: 3,
        }
    }
}

impl ReconciliationSettings {
    /// Builds settings from configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSetting` for negative tolerances, ratios above 1, a
    /// zero runway window, or payroll mappings to unknown or non-expense
    /// categories.
    pub fn from_config(config: &AppConfig) -> Result<Self, ReconciliationError> {
        let rc = &config.reconciliation;

        let tolerance = |key: &str, t: ToleranceConfig| {
            if t.ratio.is_sign_negative() || t.floor.is_sign_negative() {
                return Err(invalid(
                    format!("reconciliation.{key}"),
                    "tolerance must not be negative",
                ));
            }
            if t.ratio > Decimal::ONE {
                return Err(invalid(
                    format!("reconciliation.{key}.ratio"),
                    "ratio must be between 0 and 1",
                ));
            }
            Ok(Tolerance::from(t))
        };

        if rc.runway_window_months == 0 {
            return Err(invalid(
                "reconciliation.runway_window_months",
                "window must be at least one month",
            ));
        }

        let payroll_buckets = if rc.payroll_departments.is_empty() {
            PayrollBucketTable::builtin()
        } else {
            let mut table = PayrollBucketTable::empty();
            for (department, category) in &rc.payroll_departments {
                let key = format!("reconciliation.payroll_departments.{department}");
                let category: Category = category.parse().map_err(|msg: String| invalid(&key, msg))?;
                if !category.is_expense() {
                    return Err(invalid(&key, format!("{category} is not an expense category")));
                }
                table = table.with(department, category);
            }
            table
        };

        Ok(Self {
            currency: config.company.currency,
            revenue_tolerance: tolerance("revenue_tolerance", rc.revenue_tolerance)?,
            balance_tolerance: tolerance("balance_tolerance", rc.balance_tolerance)?,
            payroll_tolerance: tolerance("payroll_tolerance", rc.payroll_tolerance)?,
            cash_tolerance: tolerance("cash_tolerance", rc.cash_tolerance)?,
            payroll_buckets,
            fundraising_exclusions: rc
                .fundraising_exclusions
                .iter()
                .map(|e| e.trim().to_lowercase())
                .collect(),
            runway_window_months: rc.runway_window_months,
        })
    }

    /// Returns true if a category or tag marks fundraising.
    #[must_use]
    pub fn is_fundraising(&self, label: &str) -> bool {
        let label = label.trim().to_lowercase();
        self.fundraising_exclusions.iter().any(|e| *e == label)
    }
}

fn invalid(key: impl Into<String>, message: impl Into<String>) -> ReconciliationError {
    ReconciliationError::InvalidSetting {
        key: key.into(),
        message: message.into(),
    }
}
