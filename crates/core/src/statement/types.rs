//! Statement model types.

use chrono::{DateTime, Utc};
use ledgerlens_shared::{Currency, Money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::period::Period;
use crate::sources::{SnapshotStatus, SourceId};

/// The three financial statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatementKind {
    /// Income statement (P&L).
    #[serde(rename = "income")]
    Income,
    /// Balance sheet.
    #[serde(rename = "balance")]
    Balance,
    /// Cash flow statement.
    #[serde(rename = "cashflow")]
    CashFlow,
}

impl StatementKind {
    /// All statement kinds in presentation order.
    pub const ALL: [Self; 3] = [Self::Income, Self::Balance, Self::CashFlow];
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Income => write!(f, "income"),
            Self::Balance => write!(f, "balance"),
            Self::CashFlow => write!(f, "cashflow"),
        }
    }
}

impl std::str::FromStr for StatementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" | "income_statement" | "pnl" => Ok(Self::Income),
            "balance" | "balance_sheet" => Ok(Self::Balance),
            "cashflow" | "cash_flow" => Ok(Self::CashFlow),
            _ => Err(format!("Unknown statement: {s}")),
        }
    }
}

/// Line-item category. Declaration order is presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Revenue.
    Revenue,
    /// Cost of goods sold.
    Cogs,
    /// Operating expense: sales & marketing.
    SalesAndMarketing,
    /// Operating expense: research & development.
    ResearchAndDevelopment,
    /// Operating expense: general & administrative.
    GeneralAndAdministrative,
    /// Below-EBITDA expense (depreciation, interest).
    OtherExpense,
    /// Current asset.
    CurrentAsset,
    /// Non-current asset.
    NonCurrentAsset,
    /// Current liability.
    CurrentLiability,
    /// Non-current liability.
    NonCurrentLiability,
    /// Equity.
    Equity,
    /// Operating cash activity.
    OperatingCash,
    /// Investing cash activity.
    InvestingCash,
    /// Financing cash activity.
    FinancingCash,
}

/// Statement section a category rolls up into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// Revenue.
    Revenue,
    /// Cost of goods sold.
    Cogs,
    /// Operating expenses.
    OperatingExpenses,
    /// Other expenses.
    OtherExpenses,
    /// Assets.
    Assets,
    /// Liabilities.
    Liabilities,
    /// Equity.
    Equity,
    /// Operating activities.
    Operating,
    /// Investing activities.
    Investing,
    /// Financing activities.
    Financing,
}

impl Category {
    /// Every category in presentation order.
    pub const ALL: [Self; 14] = [
        Self::Revenue,
        Self::Cogs,
        Self::SalesAndMarketing,
        Self::ResearchAndDevelopment,
        Self::GeneralAndAdministrative,
        Self::OtherExpense,
        Self::CurrentAsset,
        Self::NonCurrentAsset,
        Self::CurrentLiability,
        Self::NonCurrentLiability,
        Self::Equity,
        Self::OperatingCash,
        Self::InvestingCash,
        Self::FinancingCash,
    ];

    /// Section this category belongs to.
    #[must_use]
    pub const fn section(self) -> Section {
        match self {
            Self::Revenue => Section::Revenue,
            Self::Cogs => Section::Cogs,
            Self::SalesAndMarketing
            | Self::ResearchAndDevelopment
            | Self::GeneralAndAdministrative => Section::OperatingExpenses,
            Self::OtherExpense => Section::OtherExpenses,
            Self::CurrentAsset | Self::NonCurrentAsset => Section::Assets,
            Self::CurrentLiability | Self::NonCurrentLiability => Section::Liabilities,
            Self::Equity => Section::Equity,
            Self::OperatingCash => Section::Operating,
            Self::InvestingCash => Section::Investing,
            Self::FinancingCash => Section::Financing,
        }
    }

    /// Statement this category is reported on.
    #[must_use]
    pub const fn statement(self) -> StatementKind {
        match self.section() {
            Section::Revenue | Section::Cogs | Section::OperatingExpenses | Section::OtherExpenses => {
                StatementKind::Income
            }
            Section::Assets | Section::Liabilities | Section::Equity => StatementKind::Balance,
            Section::Operating | Section::Investing | Section::Financing => StatementKind::CashFlow,
        }
    }

    /// Returns true for P&L expense categories.
    #[must_use]
    pub const fn is_expense(self) -> bool {
        matches!(
            self.section(),
            Section::Cogs | Section::OperatingExpenses | Section::OtherExpenses
        )
    }

    /// Stable snake_case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::Cogs => "cogs",
            Self::SalesAndMarketing => "sales_and_marketing",
            Self::ResearchAndDevelopment => "research_and_development",
            Self::GeneralAndAdministrative => "general_and_administrative",
            Self::OtherExpense => "other_expense",
            Self::CurrentAsset => "current_asset",
            Self::NonCurrentAsset => "non_current_asset",
            Self::CurrentLiability => "current_liability",
            Self::NonCurrentLiability => "non_current_liability",
            Self::Equity => "equity",
            Self::OperatingCash => "operating_cash",
            Self::InvestingCash => "investing_cash",
            Self::FinancingCash => "financing_cash",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("Unknown category: {s}"))
    }
}

/// How a source contributed to a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionRole {
    /// The authoritative figure.
    Canonical,
    /// Detail attached for context; never changes the amount.
    Annotation,
    /// An independent figure compared against the canonical one.
    CrossCheck,
}

/// One provenance record on a line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Contributing source.
    pub source: SourceId,
    /// Kind of contribution.
    pub role: ContributionRole,
    /// Status of the snapshot the figure came from.
    pub status: SnapshotStatus,
    /// Figure contributed, when there is one.
    pub contribution: Option<Money>,
    /// Human-readable explanation.
    pub note: String,
}

/// A statement line.
///
/// The amount is always the ledger figure. Provenance is append-only and
/// its first entry is the canonical contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Display label, as reported by the ledger.
    pub label: String,
    /// Category.
    pub category: Category,
    /// Ledger amount.
    pub amount: Money,
    provenance: Vec<Provenance>,
}

impl LineItem {
    /// Creates a line from a ledger figure, recording the canonical provenance.
    #[must_use]
    pub fn canonical(
        label: impl Into<String>,
        category: Category,
        amount: Money,
        status: SnapshotStatus,
    ) -> Self {
        Self {
            label: label.into(),
            category,
            amount,
            provenance: vec![Provenance {
                source: SourceId::Ledger,
                role: ContributionRole::Canonical,
                status,
                contribution: Some(amount),
                note: "general ledger".to_string(),
            }],
        }
    }

    /// Appends a provenance record. The amount is never touched.
    pub fn annotate(&mut self, provenance: Provenance) {
        self.provenance.push(provenance);
    }

    /// Provenance records in merge order.
    #[must_use]
    pub fn provenance(&self) -> &[Provenance] {
        &self.provenance
    }

    /// Provenance records contributed by `source`.
    pub fn provenance_from(&self, source: SourceId) -> impl Iterator<Item = &Provenance> {
        self.provenance.iter().filter(move |p| p.source == source)
    }
}

/// Warning category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// An enrichment source could not be fetched; merge used ledger data only.
    EnrichmentSourceUnavailable,
    /// An enrichment figure disagrees with the ledger beyond tolerance.
    Divergence,
    /// Enrichment detail could not be attributed to any line.
    MappingUnmatched,
    /// A snapshot is past its freshness threshold.
    StaleSnapshot,
    /// Assets do not equal liabilities plus equity.
    BalanceSheetImbalance,
    /// An enrichment figure is in a currency other than the company currency.
    CurrencyMismatch,
}

/// Both figures of a divergence and the tolerance that was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Divergence {
    /// Ledger figure (kept).
    pub canonical: Money,
    /// Enrichment figure.
    pub enrichment: Money,
    /// Absolute difference.
    pub difference: Money,
    /// Allowed difference.
    pub tolerance: Money,
}

/// A non-fatal finding attached to a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// Category of the warning.
    pub kind: WarningKind,
    /// Source the warning concerns.
    pub source: Option<SourceId>,
    /// Line label the warning concerns.
    pub line: Option<String>,
    /// Human-readable message.
    pub message: String,
    /// Divergence figures for [`WarningKind::Divergence`].
    pub divergence: Option<Divergence>,
}

impl Warning {
    /// An enrichment source was skipped.
    #[must_use]
    pub fn source_unavailable(source: SourceId, purpose: &str, reason: Option<&str>) -> Self {
        let message = match reason {
            Some(reason) => format!("{source} {purpose} unavailable: {reason}"),
            None => format!("{source} {purpose} unavailable"),
        };
        Self {
            kind: WarningKind::EnrichmentSourceUnavailable,
            source: Some(source),
            line: None,
            message,
            divergence: None,
        }
    }

    /// A snapshot was used past its freshness threshold.
    #[must_use]
    pub fn stale(source: SourceId, fetched_at: DateTime<Utc>) -> Self {
        Self {
            kind: WarningKind::StaleSnapshot,
            source: Some(source),
            line: None,
            message: format!("{source} snapshot is stale (fetched at {fetched_at})"),
            divergence: None,
        }
    }

    /// An enrichment figure diverges from the ledger.
    #[must_use]
    pub fn divergence(
        source: SourceId,
        line: impl Into<String>,
        message: impl Into<String>,
        divergence: Divergence,
    ) -> Self {
        Self {
            kind: WarningKind::Divergence,
            source: Some(source),
            line: Some(line.into()),
            message: message.into(),
            divergence: Some(divergence),
        }
    }

    /// Enrichment detail could not be attributed.
    #[must_use]
    pub fn unmatched(source: SourceId, message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::MappingUnmatched,
            source: Some(source),
            line: None,
            message: message.into(),
            divergence: None,
        }
    }

    /// The balance sheet equation does not hold.
    #[must_use]
    pub fn imbalance(assets: Money, liabilities_and_equity: Money) -> Self {
        Self {
            kind: WarningKind::BalanceSheetImbalance,
            source: Some(SourceId::Ledger),
            line: None,
            message: format!(
                "assets {assets} do not equal liabilities plus equity {liabilities_and_equity}"
            ),
            divergence: None,
        }
    }

    /// A figure was skipped because of its currency.
    #[must_use]
    pub fn currency_mismatch(source: SourceId, figure: &str, found: Currency, expected: Currency) -> Self {
        Self {
            kind: WarningKind::CurrencyMismatch,
            source: Some(source),
            line: None,
            message: format!("{source} figure {figure} is in {found}, expected {expected}; skipped"),
            divergence: None,
        }
    }
}

/// Unit of a subtotal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtotalUnit {
    /// Money in the statement currency.
    Amount,
    /// Percentage (e.g. gross margin).
    Percent,
    /// Plain ratio (e.g. current ratio).
    Ratio,
}

/// A named ledger-derived total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtotal {
    /// Stable identifier (e.g. `gross_profit`).
    pub key: String,
    /// Display label.
    pub label: String,
    /// Value.
    pub value: Decimal,
    /// Unit of `value`.
    pub unit: SubtotalUnit,
}

/// Enrichment detail that matched no statement line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnclassifiedDetail {
    /// Source of the detail.
    pub source: SourceId,
    /// Label as reported by the source.
    pub label: String,
    /// Amount.
    pub amount: Money,
    /// Why it could not be attributed.
    pub reason: String,
}

/// Burn-rate and runway metrics derived from bank transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashMetrics {
    /// Operating inflows over the period (fundraising excluded).
    pub operating_cash_in: Money,
    /// Operating outflows over the period (fundraising excluded).
    pub operating_cash_out: Money,
    /// `operating_cash_out - operating_cash_in`.
    pub net_burn: Money,
    /// Fundraising inflows left out of the burn figures.
    pub excluded_fundraising: Money,
    /// Months in the trailing averaging window.
    pub window_months: u32,
    /// Average monthly net burn over the window.
    pub average_monthly_net_burn: Money,
    /// Ledger ending cash.
    pub ending_cash: Money,
    /// `ending_cash / average_monthly_net_burn`; `None` when burn is zero or negative.
    pub runway_months: Option<Decimal>,
    /// Payment-processor payouts in the period, when available.
    pub processor_payouts: Option<Money>,
    /// Bank inflows minus outflows over the period, fundraising included.
    pub bank_net_change: Money,
    /// Ledger net change in cash minus `bank_net_change`.
    pub reconciliation_difference: Option<Money>,
}

/// Whether a source was the canonical one or enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRole {
    /// The general ledger.
    Canonical,
    /// Any other source.
    Enrichment,
}

/// What backed a statement, per source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    /// Source.
    pub source: SourceId,
    /// Canonical or enrichment.
    pub role: SourceRole,
    /// Snapshot status.
    pub status: SnapshotStatus,
    /// When the snapshot was taken.
    pub fetched_at: DateTime<Utc>,
    /// Reason for unavailability, if any.
    pub note: Option<String>,
}

/// A reconciled financial statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// Statement kind.
    #[serde(rename = "type")]
    pub kind: StatementKind,
    /// Reporting period.
    pub period: Period,
    /// Statement currency.
    pub currency: Currency,
    /// Lines in category order, then label order.
    pub lines: Vec<LineItem>,
    /// Named totals.
    pub subtotals: Vec<Subtotal>,
    /// Warnings in the order they were raised.
    pub warnings: Vec<Warning>,
    /// Enrichment detail that matched no line.
    pub unclassified: Vec<UnclassifiedDetail>,
    /// Burn and runway (cash flow statement only).
    pub cash_metrics: Option<CashMetrics>,
    /// Sources consulted.
    pub sources: Vec<SourceSummary>,
}

impl Statement {
    /// Finds a line by exact label.
    #[must_use]
    pub fn line(&self, label: &str) -> Option<&LineItem> {
        self.lines.iter().find(|l| l.label == label)
    }

    /// Lines in a section.
    pub fn lines_in(&self, section: Section) -> impl Iterator<Item = &LineItem> {
        self.lines
            .iter()
            .filter(move |l| l.category.section() == section)
    }

    /// Sum of line amounts in a section.
    #[must_use]
    pub fn section_total(&self, section: Section) -> Decimal {
        self.lines_in(section).map(|l| l.amount.amount).sum()
    }

    /// Finds a subtotal by key.
    #[must_use]
    pub fn subtotal(&self, key: &str) -> Option<&Subtotal> {
        self.subtotals.iter().find(|s| s.key == key)
    }

    /// Warnings of a given kind.
    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }

    /// Returns true if any warning of `kind` was raised.
    #[must_use]
    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings_of(kind).next().is_some()
    }
}
