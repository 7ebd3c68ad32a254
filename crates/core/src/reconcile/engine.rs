//! Reconciliation engine: a pure function from a bundle to a statement.

use ledgerlens_shared::Money;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::ReconciliationError;
use crate::fetch::SourceBundle;
use crate::sources::{SnapshotStatus, SourceId, SourceSnapshot};
use crate::statement::{
    CashMetrics, Category, ContributionRole, LineItem, Provenance, SourceRole, SourceSummary,
    Statement, StatementKind, Subtotal, SubtotalUnit, UnclassifiedDetail, Warning,
};

use super::matching::{find_by_label, normalize_label};
use super::settings::{ReconciliationSettings, Tolerance};
use super::{balance, cash_flow, income};

/// Merges source bundles into statements.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationEngine {
    settings: ReconciliationSettings,
}

impl ReconciliationEngine {
    /// Creates an engine.
    #[must_use]
    pub const fn new(settings: ReconciliationSettings) -> Self {
        Self { settings }
    }

    /// Settings in use.
    #[must_use]
    pub const fn settings(&self) -> &ReconciliationSettings {
        &self.settings
    }

    /// Builds the `kind` statement from `bundle`.
    ///
    /// Line amounts are always the ledger's. Enrichment only appends
    /// provenance, cash metrics and warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundle fails validation (see
    /// [`SourceBundle::validate`]). Nothing else is fatal.
    pub fn reconcile(
        &self,
        bundle: &SourceBundle,
        kind: StatementKind,
    ) -> Result<Statement, ReconciliationError> {
        bundle.validate(self.settings.currency)?;

        let mut draft = Draft::new(bundle, &self.settings, kind);
        draft.report_source_health();
        match kind {
            StatementKind::Income => income::merge(&mut draft),
            StatementKind::Balance => balance::merge(&mut draft),
            StatementKind::CashFlow => cash_flow::merge(&mut draft),
        }
        Ok(draft.finish())
    }
}

/// Purpose of an enrichment source on a statement, used in warnings.
const fn purpose(kind: StatementKind, source: SourceId) -> &'static str {
    match (kind, source) {
        (StatementKind::Income, SourceId::Payments) => "revenue cross-check",
        (StatementKind::Income, SourceId::Payroll) => "payroll mapping",
        (StatementKind::Income, SourceId::Card) => "spend mapping",
        (StatementKind::Income, SourceId::Crm) => "pipeline annotation",
        (StatementKind::Balance, SourceId::Payments) => "deferred revenue cross-check",
        (StatementKind::CashFlow, SourceId::Bank) => "burn and runway",
        (StatementKind::CashFlow, SourceId::Payments) => "payouts",
        (StatementKind::CashFlow, SourceId::Payroll) => "payroll cross-check",
        (_, SourceId::Spreadsheet) => "manual entries",
        _ => "cross-check",
    }
}

/// A statement under construction.
pub(super) struct Draft<'a> {
    pub bundle: &'a SourceBundle,
    pub settings: &'a ReconciliationSettings,
    pub kind: StatementKind,
    pub lines: Vec<LineItem>,
    pub subtotals: Vec<Subtotal>,
    pub warnings: Vec<Warning>,
    pub unclassified: Vec<UnclassifiedDetail>,
    pub cash_metrics: Option<CashMetrics>,
}

impl<'a> Draft<'a> {
    fn new(
        bundle: &'a SourceBundle,
        settings: &'a ReconciliationSettings,
        kind: StatementKind,
    ) -> Self {
        let canonical = bundle.canonical.as_ref();
        let lines = canonical
            .lines()
            .filter(|(category, _, _)| category.statement() == kind)
            .map(|(category, label, amount)| {
                LineItem::canonical(label, category, amount, canonical.status)
            })
            .collect();

        Self {
            bundle,
            settings,
            kind,
            lines,
            subtotals: Vec::new(),
            warnings: Vec::new(),
            unclassified: Vec::new(),
            cash_metrics: None,
        }
    }

    /// Unavailable and stale warnings for every snapshot in the bundle.
    fn report_source_health(&mut self) {
        for snapshot in self.bundle.snapshots() {
            match snapshot.status {
                SnapshotStatus::Ok => {}
                SnapshotStatus::Stale => {
                    self.warnings
                        .push(Warning::stale(snapshot.source, snapshot.fetched_at));
                }
                SnapshotStatus::Unavailable => {
                    self.warnings.push(Warning::source_unavailable(
                        snapshot.source,
                        purpose(self.kind, snapshot.source),
                        snapshot.note.as_deref(),
                    ));
                }
            }
        }
    }

    /// Usable enrichment snapshot for `source`.
    pub fn enrichment(&self, source: SourceId) -> Option<&'a SourceSnapshot> {
        self.bundle.usable(source)
    }

    /// The ledger snapshot.
    pub fn ledger(&self) -> &'a SourceSnapshot {
        self.bundle.canonical.as_ref()
    }

    /// Zero in the company currency.
    pub fn zero(&self) -> Money {
        Money::zero(self.settings.currency)
    }

    /// Wraps an amount in the company currency.
    pub fn money(&self, amount: Decimal) -> Money {
        Money::new(amount, self.settings.currency)
    }

    /// Passes `figure` through if it is in the company currency; otherwise
    /// records a currency warning and returns `None`.
    pub fn accept(&mut self, source: SourceId, name: &str, figure: Money) -> Option<Money> {
        if figure.currency == self.settings.currency {
            Some(figure)
        } else {
            debug!(%source, figure = name, currency = %figure.currency, "Skipping foreign-currency figure");
            self.warnings.push(Warning::currency_mismatch(
                source,
                name,
                figure.currency,
                self.settings.currency,
            ));
            None
        }
    }

    /// Appends a provenance record to line `index`.
    pub fn annotate(
        &mut self,
        index: usize,
        snapshot: &SourceSnapshot,
        role: ContributionRole,
        contribution: Option<Money>,
        note: impl Into<String>,
    ) {
        self.lines[index].annotate(Provenance {
            source: snapshot.source,
            role,
            status: snapshot.status,
            contribution,
            note: note.into(),
        });
    }

    /// Compares an enrichment figure with a ledger figure and raises a
    /// divergence warning when it is out of tolerance.
    pub fn compare(
        &mut self,
        source: SourceId,
        line: &str,
        canonical: Money,
        enrichment: Money,
        tolerance: Tolerance,
        what: &str,
    ) {
        if let Some(divergence) = tolerance.check(canonical, enrichment) {
            debug!(%source, line, difference = %divergence.difference, "Divergence over tolerance");
            self.warnings.push(Warning::divergence(
                source,
                line,
                format!(
                    "{what}: ledger {} vs {source} {} (difference {}, tolerance {})",
                    divergence.canonical,
                    divergence.enrichment,
                    divergence.difference,
                    divergence.tolerance
                ),
                divergence,
            ));
        }
    }

    /// Cross-checks line `index` against an enrichment figure: records the
    /// figure as provenance and compares it with the line amount.
    pub fn cross_check(
        &mut self,
        index: usize,
        snapshot: &SourceSnapshot,
        figure: Money,
        tolerance: Tolerance,
        what: &str,
    ) {
        self.annotate(
            index,
            snapshot,
            ContributionRole::CrossCheck,
            Some(figure),
            what,
        );
        let line = &self.lines[index];
        let (label, amount) = (line.label.clone(), line.amount);
        self.compare(snapshot.source, &label, amount, figure, tolerance, what);
    }

    /// Records enrichment detail that matched no line.
    pub fn unclassified(
        &mut self,
        source: SourceId,
        label: &str,
        amount: Money,
        reason: impl Into<String>,
    ) {
        self.unclassified.push(UnclassifiedDetail {
            source,
            label: label.to_string(),
            amount,
            reason: reason.into(),
        });
    }

    /// Sum of line amounts in `categories`.
    pub fn total(&self, categories: &[Category]) -> Decimal {
        self.lines
            .iter()
            .filter(|l| categories.contains(&l.category))
            .map(|l| l.amount.amount)
            .sum()
    }

    /// Appends a subtotal.
    pub fn subtotal(&mut self, key: &str, label: &str, value: Decimal, unit: SubtotalUnit) {
        self.subtotals.push(Subtotal {
            key: key.to_string(),
            label: label.to_string(),
            value,
            unit,
        });
    }

    /// Attributes spreadsheet manual entries to lines with the same label.
    ///
    /// Entries matching a ledger line of another statement belong to that
    /// statement and are skipped; entries matching nothing are unclassified.
    pub fn merge_manual_entries(&mut self) {
        let Some(sheet) = self.enrichment(SourceId::Spreadsheet) else {
            return;
        };
        let ledger = self.ledger();
        for (label, amount) in sheet.manual_entries() {
            let Some(amount) = self.accept(sheet.source, label, amount) else {
                continue;
            };
            if let Some(index) = find_by_label(&self.lines, label, |_| true) {
                self.annotate(
                    index,
                    sheet,
                    ContributionRole::Annotation,
                    Some(amount),
                    "manual entry",
                );
                continue;
            }
            let elsewhere = ledger.lines().any(|(category, ledger_label, _)| {
                category.statement() != self.kind
                    && normalize_label(ledger_label) == normalize_label(label)
            });
            if !elsewhere {
                debug!(label, "Manual entry matches no ledger line");
                self.unclassified(
                    sheet.source,
                    label,
                    amount,
                    "manual entry matches no ledger line",
                );
            }
        }
    }

    fn finish(self) -> Statement {
        let bundle = self.bundle;
        let summary = |snapshot: &SourceSnapshot, role| SourceSummary {
            source: snapshot.source,
            role,
            status: snapshot.status,
            fetched_at: snapshot.fetched_at,
            note: snapshot.note.clone(),
        };
        let sources = std::iter::once(summary(bundle.canonical.as_ref(), SourceRole::Canonical))
            .chain(
                bundle
                    .enrichment
                    .values()
                    .map(|s| summary(s.as_ref(), SourceRole::Enrichment)),
            )
            .collect();

        Statement {
            kind: self.kind,
            period: bundle.period,
            currency: self.settings.currency,
            lines: self.lines,
            subtotals: self.subtotals,
            warnings: self.warnings,
            unclassified: self.unclassified,
            cash_metrics: self.cash_metrics,
            sources,
        }
    }
}

/// `numerator / denominator * 100`, or `None` when the denominator is zero.
pub(super) fn percent(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    numerator
        .checked_div(denominator)
        .map(|ratio| (ratio * Decimal::ONE_HUNDRED).round_dp(2))
}

/// `numerator / denominator`, or `None` when the denominator is zero.
pub(super) fn ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    numerator.checked_div(denominator).map(|r| r.round_dp(2))
}
