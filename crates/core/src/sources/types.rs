//! Source snapshot types.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use ledgerlens_shared::Money;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::period::Period;
use crate::statement::Category;

/// Data sources known to the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    /// General ledger (canonical).
    Ledger,
    /// Payment processor: revenue, MRR, payouts, subscriptions.
    Payments,
    /// Bank: balances and transactions.
    Bank,
    /// Corporate cards: balance and spend by category.
    Card,
    /// Payroll: cost by department, payroll cash-out.
    Payroll,
    /// CRM: pipeline and closed-won.
    Crm,
    /// Spreadsheet: manual entries.
    Spreadsheet,
}

impl SourceId {
    /// Every source.
    pub const ALL: [Self; 7] = [
        Self::Ledger,
        Self::Payments,
        Self::Bank,
        Self::Card,
        Self::Payroll,
        Self::Crm,
        Self::Spreadsheet,
    ];

    /// Stable snake_case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ledger => "ledger",
            Self::Payments => "payments",
            Self::Bank => "bank",
            Self::Card => "card",
            Self::Payroll => "payroll",
            Self::Crm => "crm",
            Self::Spreadsheet => "spreadsheet",
        }
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| format!("Unknown source: {s}"))
    }
}

/// Snapshot status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    /// Fetched and fresh.
    Ok,
    /// Fetch failed, timed out, or the source is not configured.
    Unavailable,
    /// Fetched, but older than the source's freshness threshold.
    Stale,
}

/// Named scalar figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    /// Monthly recurring revenue.
    Mrr,
    /// Annual recurring revenue.
    Arr,
    /// Revenue collected by the payment processor in the period.
    CashRevenue,
    /// Processor payouts to the bank in the period.
    Payouts,
    /// Processor balance available for payout.
    AvailableBalance,
    /// Live bank balance across accounts.
    CashBalance,
    /// Outstanding card balance.
    CardBalance,
    /// Payroll cash paid in the period.
    PayrollCashOut,
    /// Full employer payroll cost in the period.
    PayrollTotal,
    /// Open pipeline value.
    PipelineValue,
    /// Deals closed-won in the period.
    ClosedWon,
    /// Cash at the start of the period.
    BeginningCash,
}

impl Metric {
    /// Every metric.
    pub const ALL: [Self; 12] = [
        Self::Mrr,
        Self::Arr,
        Self::CashRevenue,
        Self::Payouts,
        Self::AvailableBalance,
        Self::CashBalance,
        Self::CardBalance,
        Self::PayrollCashOut,
        Self::PayrollTotal,
        Self::PipelineValue,
        Self::ClosedWon,
        Self::BeginningCash,
    ];

    /// Stable snake_case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mrr => "mrr",
            Self::Arr => "arr",
            Self::CashRevenue => "cash_revenue",
            Self::Payouts => "payouts",
            Self::AvailableBalance => "available_balance",
            Self::CashBalance => "cash_balance",
            Self::CardBalance => "card_balance",
            Self::PayrollCashOut => "payroll_cash_out",
            Self::PayrollTotal => "payroll_total",
            Self::PipelineValue => "pipeline_value",
            Self::ClosedWon => "closed_won",
            Self::BeginningCash => "beginning_cash",
        }
    }
}

/// Key of a figure inside a snapshot.
///
/// Serialized as its display form, e.g. `line:revenue:Subscription Revenue`,
/// `metric:mrr`, `department:Engineering`.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr,
)]
pub enum FigureKey {
    /// A ledger report line.
    Line {
        /// Line category.
        category: Category,
        /// Line label.
        label: String,
    },
    /// A named scalar.
    Metric(Metric),
    /// Payroll cost for a department.
    Department(String),
    /// Card spend for a category.
    Spend(String),
    /// A spreadsheet manual entry.
    Manual(String),
}

impl FigureKey {
    /// Shorthand for [`FigureKey::Line`].
    #[must_use]
    pub fn line(category: Category, label: impl Into<String>) -> Self {
        Self::Line {
            category,
            label: label.into(),
        }
    }
}

impl std::fmt::Display for FigureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Line { category, label } => write!(f, "line:{category}:{label}"),
            Self::Metric(metric) => write!(f, "metric:{}", metric.as_str()),
            Self::Department(name) => write!(f, "department:{name}"),
            Self::Spend(name) => write!(f, "spend:{name}"),
            Self::Manual(label) => write!(f, "manual:{label}"),
        }
    }
}

impl std::str::FromStr for FigureKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid figure key: {s}"))?;
        match kind {
            "line" => {
                let (category, label) = rest
                    .split_once(':')
                    .ok_or_else(|| format!("Invalid line key: {s}"))?;
                Ok(Self::line(category.parse()?, label))
            }
            "metric" => Metric::ALL
                .into_iter()
                .find(|m| m.as_str() == rest)
                .map(Self::Metric)
                .ok_or_else(|| format!("Unknown metric: {rest}")),
            "department" => Ok(Self::Department(rest.to_string())),
            "spend" => Ok(Self::Spend(rest.to_string())),
            "manual" => Ok(Self::Manual(rest.to_string())),
            _ => Err(format!("Invalid figure key: {s}")),
        }
    }
}

/// Direction of a bank transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Money in.
    Inflow,
    /// Money out.
    Outflow,
}

/// A posted bank transaction. `amount` is always non-negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashTransaction {
    /// Posting date.
    pub posted_on: NaiveDate,
    /// In or out.
    pub direction: Direction,
    /// Magnitude.
    pub amount: Money,
    /// Bank or bookkeeping category.
    pub category: Option<String>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Counterparty or memo.
    pub description: String,
}

/// Subscription billing interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    /// Weekly.
    Week,
    /// Monthly.
    Month,
    /// Annual.
    Year,
}

/// An active subscription as reported by the payment processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Processor identifier.
    pub id: String,
    /// Billing interval.
    pub interval: BillingInterval,
    /// Amount billed per interval.
    pub amount: Money,
    /// Start of the current (prepaid) billing period.
    pub current_period_start: NaiveDate,
    /// End of the current billing period (exclusive).
    pub current_period_end: NaiveDate,
}

/// A normalized, timestamped snapshot of one source for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSnapshot {
    /// Source.
    pub source: SourceId,
    /// Period covered.
    pub period: Period,
    /// When the data was fetched (or last synced upstream).
    pub fetched_at: DateTime<Utc>,
    /// Status.
    pub status: SnapshotStatus,
    /// Figures by key.
    pub figures: BTreeMap<FigureKey, Money>,
    /// Bank transactions in the period.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transactions: Vec<CashTransaction>,
    /// Active subscriptions at period end.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subscriptions: Vec<Subscription>,
    /// Reason the snapshot is unavailable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl SourceSnapshot {
    /// Creates an empty `ok` snapshot.
    #[must_use]
    pub fn new(source: SourceId, period: Period, fetched_at: DateTime<Utc>) -> Self {
        Self {
            source,
            period,
            fetched_at,
            status: SnapshotStatus::Ok,
            figures: BTreeMap::new(),
            transactions: Vec::new(),
            subscriptions: Vec::new(),
            note: None,
        }
    }

    /// Creates an `unavailable` placeholder carrying the failure reason.
    #[must_use]
    pub fn unavailable(
        source: SourceId,
        period: Period,
        at: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            status: SnapshotStatus::Unavailable,
            note: Some(reason.into()),
            ..Self::new(source, period, at)
        }
    }

    /// Adds a figure.
    #[must_use]
    pub fn with_figure(mut self, key: FigureKey, amount: Money) -> Self {
        self.figures.insert(key, amount);
        self
    }

    /// Adds a ledger line figure.
    #[must_use]
    pub fn with_line(self, category: Category, label: impl Into<String>, amount: Money) -> Self {
        self.with_figure(FigureKey::line(category, label), amount)
    }

    /// Adds a metric figure.
    #[must_use]
    pub fn with_metric(self, metric: Metric, amount: Money) -> Self {
        self.with_figure(FigureKey::Metric(metric), amount)
    }

    /// Appends bank transactions.
    #[must_use]
    pub fn with_transactions(mut self, transactions: impl IntoIterator<Item = CashTransaction>) -> Self {
        self.transactions.extend(transactions);
        self
    }

    /// Appends subscriptions.
    #[must_use]
    pub fn with_subscriptions(mut self, subscriptions: impl IntoIterator<Item = Subscription>) -> Self {
        self.subscriptions.extend(subscriptions);
        self
    }

    /// Returns true unless the snapshot is unavailable.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.status != SnapshotStatus::Unavailable
    }

    /// Looks up a metric.
    #[must_use]
    pub fn metric(&self, metric: Metric) -> Option<Money> {
        self.figures.get(&FigureKey::Metric(metric)).copied()
    }

    /// Ledger lines as `(category, label, amount)`, ordered by category then label.
    pub fn lines(&self) -> impl Iterator<Item = (Category, &str, Money)> {
        self.figures.iter().filter_map(|(key, amount)| match key {
            FigureKey::Line { category, label } => Some((*category, label.as_str(), *amount)),
            _ => None,
        })
    }

    /// Payroll cost by department.
    pub fn departments(&self) -> impl Iterator<Item = (&str, Money)> {
        self.figures.iter().filter_map(|(key, amount)| match key {
            FigureKey::Department(name) => Some((name.as_str(), *amount)),
            _ => None,
        })
    }

    /// Card spend by category.
    pub fn spend(&self) -> impl Iterator<Item = (&str, Money)> {
        self.figures.iter().filter_map(|(key, amount)| match key {
            FigureKey::Spend(name) => Some((name.as_str(), *amount)),
            _ => None,
        })
    }

    /// Spreadsheet manual entries.
    pub fn manual_entries(&self) -> impl Iterator<Item = (&str, Money)> {
        self.figures.iter().filter_map(|(key, amount)| match key {
            FigureKey::Manual(label) => Some((label.as_str(), *amount)),
            _ => None,
        })
    }
}
