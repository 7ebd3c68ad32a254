//! Merge-rule scenarios and property-based tests for reconciliation.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use ledgerlens_shared::{Currency, Money};
use proptest::prelude::*;
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::ReconciliationEngine;
use super::settings::ReconciliationSettings;
use crate::fetch::SourceBundle;
use crate::period::Period;
use crate::sources::{
    BillingInterval, CashTransaction, Direction, FigureKey, Metric, SnapshotStatus, SourceId,
    SourceSnapshot, Subscription,
};
use crate::statement::{
    Category, ContributionRole, Section, Statement, StatementKind, WarningKind,
};

fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap()
}

fn period() -> Period {
    Period::month(2026, 3).unwrap()
}

fn usd(amount: Decimal) -> Money {
    Money::new(amount, Currency::Usd)
}

fn snapshot(source: SourceId) -> SourceSnapshot {
    SourceSnapshot::new(source, period(), at())
}

fn ledger() -> SourceSnapshot {
    snapshot(SourceId::Ledger)
        .with_line(Category::Revenue, "Subscription Revenue", usd(dec!(150000)))
        .with_line(Category::Cogs, "Hosting & Infrastructure", usd(dec!(8000)))
        .with_line(Category::Cogs, "Customer Success Payroll", usd(dec!(17500)))
        .with_line(Category::SalesAndMarketing, "Sales Payroll", usd(dec!(40000)))
        .with_line(Category::SalesAndMarketing, "Advertising & Demand Gen", usd(dec!(20000)))
        .with_line(Category::ResearchAndDevelopment, "Engineering Payroll", usd(dec!(46000)))
        .with_line(Category::GeneralAndAdministrative, "G&A Payroll", usd(dec!(20000)))
        .with_line(Category::GeneralAndAdministrative, "Insurance", usd(dec!(1500)))
        .with_line(Category::OtherExpense, "Interest Expense", usd(dec!(400)))
        .with_line(Category::CurrentAsset, "Cash & Cash Equivalents", usd(dec!(1240000)))
        .with_line(Category::CurrentAsset, "Prepaid Expenses", usd(dec!(36000)))
        .with_line(Category::NonCurrentAsset, "Property & Equipment (Net)", usd(dec!(42000)))
        .with_line(Category::CurrentLiability, "Corporate Card Balance", usd(dec!(24000)))
        .with_line(Category::CurrentLiability, "Deferred Revenue", usd(dec!(100000)))
        .with_line(Category::Equity, "Paid-In Capital", usd(dec!(1194000)))
        .with_line(Category::OperatingCash, "Net Income", usd(dec!(-3400)))
        .with_line(Category::InvestingCash, "Capital Expenditures", usd(dec!(-1500)))
        .with_metric(Metric::BeginningCash, usd(dec!(1244900)))
        .with_metric(Metric::PayrollCashOut, usd(dec!(123500)))
}

fn engine() -> ReconciliationEngine {
    ReconciliationEngine::default()
}

fn build(bundle: &SourceBundle, kind: StatementKind) -> Statement {
    engine().reconcile(bundle, kind).unwrap()
}

fn bank_tx(day: u32, direction: Direction, amount: Decimal, category: &str) -> CashTransaction {
    CashTransaction {
        posted_on: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
        direction,
        amount: usd(amount),
        category: Some(category.to_string()),
        tags: Vec::new(),
        description: String::new(),
    }
}

// ============================================================================
// Income statement
// ============================================================================

#[test]
fn test_revenue_divergence_keeps_ledger_amount() {
    let bundle = SourceBundle::new(period(), ledger()).with_enrichment(
        snapshot(SourceId::Payments)
            .with_metric(Metric::CashRevenue, usd(dec!(160000)))
            .with_metric(Metric::Mrr, usd(dec!(150000))),
    );
    let statement = build(&bundle, StatementKind::Income);

    let revenue = statement.line("Subscription Revenue").unwrap();
    assert_eq!(revenue.amount, usd(dec!(150000)));
    let sources: Vec<_> = revenue.provenance().iter().map(|p| p.source).collect();
    assert_eq!(sources, vec![SourceId::Ledger, SourceId::Payments, SourceId::Payments]);
    assert_eq!(revenue.provenance()[0].role, ContributionRole::Canonical);
    assert_eq!(revenue.provenance()[1].role, ContributionRole::CrossCheck);
    assert_eq!(revenue.provenance()[1].contribution, Some(usd(dec!(160000))));

    let divergences: Vec<_> = statement.warnings_of(WarningKind::Divergence).collect();
    assert_eq!(divergences.len(), 1);
    let divergence = divergences[0].divergence.unwrap();
    assert_eq!(divergence.difference, usd(dec!(10000)));
    assert_eq!(divergence.tolerance, usd(dec!(7500)));
    assert_eq!(divergences[0].source, Some(SourceId::Payments));
}

#[test]
fn test_revenue_within_tolerance_raises_nothing() {
    let bundle = SourceBundle::new(period(), ledger()).with_enrichment(
        snapshot(SourceId::Payments).with_metric(Metric::CashRevenue, usd(dec!(155000))),
    );
    let statement = build(&bundle, StatementKind::Income);
    assert!(statement.warnings.is_empty(), "{:?}", statement.warnings);
}

#[test]
fn test_income_lines_and_subtotals_are_ledger_only() {
    let statement = build(&SourceBundle::new(period(), ledger()), StatementKind::Income);

    assert!(statement.lines.iter().all(|l| l.category.statement() == StatementKind::Income));
    assert_eq!(statement.lines.len(), 9);
    assert_eq!(statement.subtotal("total_revenue").unwrap().value, dec!(150000));
    assert_eq!(statement.subtotal("gross_profit").unwrap().value, dec!(124500));
    assert_eq!(statement.subtotal("ebitda").unwrap().value, dec!(-3000));
    // No depreciation lines; interest sits below EBIT.
    assert_eq!(statement.subtotal("ebit").unwrap().value, dec!(-3000));
    assert_eq!(statement.subtotal("net_income").unwrap().value, dec!(-3400));
    assert_eq!(statement.subtotal("gross_margin").unwrap().value, dec!(83));
    assert_eq!(statement.sources.len(), 1);
}

#[test]
fn test_ebit_deducts_depreciation_and_amortization() {
    let ledger = ledger()
        .with_line(Category::OtherExpense, "Depreciation", usd(dec!(1200)))
        .with_line(Category::OtherExpense, "Amortization of Intangibles", usd(dec!(300)));
    let statement = build(&SourceBundle::new(period(), ledger), StatementKind::Income);

    assert_eq!(statement.subtotal("ebitda").unwrap().value, dec!(-3000));
    assert_eq!(statement.subtotal("ebit").unwrap().value, dec!(-4500));
    assert_eq!(statement.subtotal("total_other_expense").unwrap().value, dec!(1900));
    assert_eq!(statement.subtotal("net_income").unwrap().value, dec!(-4900));
}

#[test]
fn test_margins_omitted_without_revenue() {
    let ledger = snapshot(SourceId::Ledger).with_line(Category::Cogs, "Hosting", usd(dec!(10)));
    let statement = build(&SourceBundle::new(period(), ledger), StatementKind::Income);
    assert!(statement.subtotal("gross_margin").is_none());
    assert_eq!(statement.subtotal("gross_profit").unwrap().value, dec!(-10));
}

#[test]
fn test_payroll_departments_attach_to_lines() {
    let bundle = SourceBundle::new(period(), ledger()).with_enrichment(
        snapshot(SourceId::Payroll)
            .with_figure(FigureKey::Department("Engineering".into()), usd(dec!(46000)))
            .with_figure(FigureKey::Department("Sales".into()), usd(dec!(40000)))
            .with_figure(FigureKey::Department("Finance".into()), usd(dec!(20000)))
            .with_figure(FigureKey::Department("Customer Success".into()), usd(dec!(17500)))
            .with_figure(FigureKey::Department("Facilities".into()), usd(dec!(3000))),
    );
    let statement = build(&bundle, StatementKind::Income);

    for (label, department) in [
        ("Engineering Payroll", "Engineering"),
        ("Sales Payroll", "Sales"),
        ("G&A Payroll", "Finance"),
        ("Customer Success Payroll", "Customer Success"),
    ] {
        let line = statement.line(label).unwrap();
        let payroll: Vec<_> = line.provenance_from(SourceId::Payroll).collect();
        assert_eq!(payroll.len(), 1, "{label}");
        assert_eq!(payroll[0].note, format!("payroll: {department}"));
    }
    // Amounts untouched.
    assert_eq!(statement.line("Sales Payroll").unwrap().amount, usd(dec!(40000)));

    let unmatched: Vec<_> = statement.warnings_of(WarningKind::MappingUnmatched).collect();
    assert_eq!(unmatched.len(), 1);
    assert!(unmatched[0].message.contains("Facilities"));
    assert_eq!(statement.unclassified.len(), 1);
    assert_eq!(statement.unclassified[0].label, "Facilities");
}

#[test]
fn test_payroll_department_without_line_is_unclassified() {
    let ledger = snapshot(SourceId::Ledger)
        .with_line(Category::Revenue, "Subscription Revenue", usd(dec!(1000)));
    let bundle = SourceBundle::new(period(), ledger).with_enrichment(
        snapshot(SourceId::Payroll)
            .with_figure(FigureKey::Department("Engineering".into()), usd(dec!(500))),
    );
    let statement = build(&bundle, StatementKind::Income);
    assert!(statement.has_warning(WarningKind::MappingUnmatched));
    assert_eq!(statement.unclassified[0].source, SourceId::Payroll);
    assert_eq!(statement.lines.len(), 1);
}

#[test]
fn test_card_spend_matches_normalized_labels() {
    let bundle = SourceBundle::new(period(), ledger()).with_enrichment(
        snapshot(SourceId::Card)
            .with_figure(FigureKey::Spend("advertising and demand gen".into()), usd(dec!(12000)))
            .with_figure(FigureKey::Spend("Hosting / Infrastructure".into()), usd(dec!(8000)))
            .with_figure(FigureKey::Spend("Travel".into()), usd(dec!(900)))
            .with_figure(FigureKey::Spend("Meals".into()), usd(dec!(100))),
    );
    let statement = build(&bundle, StatementKind::Income);

    let ads = statement.line("Advertising & Demand Gen").unwrap();
    assert_eq!(ads.provenance_from(SourceId::Card).count(), 1);
    assert_eq!(ads.amount, usd(dec!(20000)));
    assert_eq!(
        statement.line("Hosting & Infrastructure").unwrap().provenance_from(SourceId::Card).count(),
        0,
        "slash is not an ampersand"
    );

    let unmatched: Vec<_> = statement.warnings_of(WarningKind::MappingUnmatched).collect();
    assert_eq!(unmatched.len(), 1);
    assert!(unmatched[0].message.contains("Meals"));
    assert!(unmatched[0].message.contains("Travel"));
    assert_eq!(statement.unclassified.len(), 3);
}

#[test]
fn test_crm_annotates_primary_revenue_line() {
    let ledger = ledger().with_line(Category::Revenue, "Professional Services", usd(dec!(20000)));
    let bundle = SourceBundle::new(period(), ledger).with_enrichment(
        snapshot(SourceId::Crm)
            .with_metric(Metric::ClosedWon, usd(dec!(64000)))
            .with_metric(Metric::PipelineValue, usd(dec!(2400000))),
    );
    let statement = build(&bundle, StatementKind::Income);

    let primary = statement.line("Subscription Revenue").unwrap();
    assert_eq!(primary.provenance_from(SourceId::Crm).count(), 2);
    assert!(primary
        .provenance_from(SourceId::Crm)
        .all(|p| p.role == ContributionRole::Annotation));
    let services = statement.line("Professional Services").unwrap();
    assert_eq!(services.provenance().len(), 1);
    assert!(statement.warnings.is_empty());
}

#[test]
fn test_manual_entries_match_skip_or_unclassify() {
    let bundle = SourceBundle::new(period(), ledger()).with_enrichment(
        snapshot(SourceId::Spreadsheet)
            .with_figure(FigureKey::Manual("insurance".into()), usd(dec!(1500)))
            .with_figure(FigureKey::Manual("Prepaid Expenses".into()), usd(dec!(36000)))
            .with_figure(FigureKey::Manual("Accrued Bonus".into()), usd(dec!(15000))),
    );

    let income = build(&bundle, StatementKind::Income);
    assert_eq!(income.line("Insurance").unwrap().provenance_from(SourceId::Spreadsheet).count(), 1);
    // Prepaid Expenses is a balance sheet line; Accrued Bonus matches nothing.
    let labels: Vec<_> = income.unclassified.iter().map(|u| u.label.as_str()).collect();
    assert_eq!(labels, vec!["Accrued Bonus"]);

    let balance = build(&bundle, StatementKind::Balance);
    assert_eq!(
        balance.line("Prepaid Expenses").unwrap().provenance_from(SourceId::Spreadsheet).count(),
        1
    );
    let labels: Vec<_> = balance.unclassified.iter().map(|u| u.label.as_str()).collect();
    assert_eq!(labels, vec!["Accrued Bonus"]);
}

#[test]
fn test_foreign_currency_enrichment_is_skipped() {
    let bundle = SourceBundle::new(period(), ledger()).with_enrichment(
        snapshot(SourceId::Payments)
            .with_metric(Metric::CashRevenue, Money::new(dec!(999999), Currency::Eur)),
    );
    let statement = build(&bundle, StatementKind::Income);

    assert!(statement.has_warning(WarningKind::CurrencyMismatch));
    assert!(!statement.has_warning(WarningKind::Divergence));
    assert_eq!(
        statement.line("Subscription Revenue").unwrap().provenance().len(),
        1
    );
}

// ============================================================================
// Shared rules
// ============================================================================

#[test]
fn test_unavailable_enrichment_warns_once_per_source() {
    let bundle = SourceBundle::new(period(), ledger())
        .with_enrichment(SourceSnapshot::unavailable(
            SourceId::Payments,
            period(),
            at(),
            "Authentication failed: token expired",
        ))
        .with_enrichment(SourceSnapshot::unavailable(SourceId::Payroll, period(), at(), "503"));
    let statement = build(&bundle, StatementKind::Income);

    let unavailable: Vec<_> = statement
        .warnings_of(WarningKind::EnrichmentSourceUnavailable)
        .collect();
    assert_eq!(unavailable.len(), 2);
    assert_eq!(
        unavailable[0].message,
        "payments revenue cross-check unavailable: Authentication failed: token expired"
    );
    assert_eq!(statement.line("Subscription Revenue").unwrap().provenance().len(), 1);
    assert_eq!(statement.sources.len(), 3);
    assert_eq!(statement.sources[1].status, SnapshotStatus::Unavailable);
}

#[test]
fn test_stale_snapshots_warn_and_mark_provenance() {
    let mut ledger = ledger();
    ledger.status = SnapshotStatus::Stale;
    let mut payments = snapshot(SourceId::Payments).with_metric(Metric::Mrr, usd(dec!(12000)));
    payments.status = SnapshotStatus::Stale;
    let bundle = SourceBundle::new(period(), ledger).with_enrichment(payments);
    let statement = build(&bundle, StatementKind::Income);

    let stale: Vec<_> = statement.warnings_of(WarningKind::StaleSnapshot).collect();
    assert_eq!(stale.len(), 2);
    let revenue = statement.line("Subscription Revenue").unwrap();
    assert!(revenue.provenance().iter().all(|p| p.status == SnapshotStatus::Stale));
}

#[test]
fn test_invalid_bundle_is_rejected() {
    let bundle = SourceBundle::new(
        period(),
        SourceSnapshot::unavailable(SourceId::Ledger, period(), at(), "down"),
    );
    assert!(engine().reconcile(&bundle, StatementKind::Income).is_err());
}

// ============================================================================
// Balance sheet
// ============================================================================

#[test]
fn test_bank_unavailable_leaves_ledger_cash() {
    let bundle = SourceBundle::new(period(), ledger())
        .with_enrichment(SourceSnapshot::unavailable(
            SourceId::Bank,
            period(),
            at(),
            "Fetch from bank timed out after 10s",
        ))
        .with_enrichment(snapshot(SourceId::Card).with_metric(Metric::CardBalance, usd(dec!(24000))));
    let statement = build(&bundle, StatementKind::Balance);

    let cash = statement.line("Cash & Cash Equivalents").unwrap();
    assert_eq!(cash.amount, usd(dec!(1240000)));
    assert_eq!(cash.provenance().len(), 1);
    let warning = statement
        .warnings_of(WarningKind::EnrichmentSourceUnavailable)
        .next()
        .unwrap();
    assert!(warning.message.starts_with("bank cross-check unavailable"));
    // Card cross-check still ran.
    let card = statement.line("Corporate Card Balance").unwrap();
    assert_eq!(card.provenance_from(SourceId::Card).count(), 1);
}

#[test]
fn test_bank_divergence_flags_uncleared_transactions() {
    let bundle = SourceBundle::new(period(), ledger()).with_enrichment(
        snapshot(SourceId::Bank).with_metric(Metric::CashBalance, usd(dec!(1200000))),
    );
    let statement = build(&bundle, StatementKind::Balance);

    let warning = statement.warnings_of(WarningKind::Divergence).next().unwrap();
    assert_eq!(warning.line.as_deref(), Some("Cash & Cash Equivalents"));
    assert!(warning.message.contains("uncleared transactions"));
    assert_eq!(
        statement.line("Cash & Cash Equivalents").unwrap().amount,
        usd(dec!(1240000))
    );
}

#[test]
fn test_deferred_revenue_cross_check() {
    let as_of = period().end();
    let subscription = |amount: Decimal, elapsed: i64| Subscription {
        id: format!("sub_{elapsed}"),
        interval: BillingInterval::Year,
        amount: usd(amount),
        current_period_start: as_of - chrono::Duration::days(elapsed),
        current_period_end: as_of - chrono::Duration::days(elapsed) + chrono::Duration::days(365),
    };
    let bundle = SourceBundle::new(period(), ledger()).with_enrichment(
        snapshot(SourceId::Payments).with_subscriptions([
            subscription(dec!(73000), 165),
            subscription(dec!(36500), 0),
        ]),
    );
    let statement = build(&bundle, StatementKind::Balance);

    let deferred = statement.line("Deferred Revenue").unwrap();
    let check = deferred.provenance_from(SourceId::Payments).next().unwrap();
    assert_eq!(check.role, ContributionRole::CrossCheck);
    // 73,000 * 200/365 + 36,500
    assert_eq!(check.contribution, Some(usd(dec!(76500))));
    assert!(statement.has_warning(WarningKind::Divergence));
}

#[test]
fn test_balanced_ledger_has_no_imbalance_warning() {
    let statement = build(&SourceBundle::new(period(), ledger()), StatementKind::Balance);
    assert!(!statement.has_warning(WarningKind::BalanceSheetImbalance));
    assert_eq!(statement.subtotal("total_assets").unwrap().value, dec!(1318000));
    assert_eq!(
        statement.subtotal("total_liabilities_and_equity").unwrap().value,
        dec!(1318000)
    );
    assert_eq!(statement.subtotal("current_ratio").unwrap().value, dec!(10.29));
    assert_eq!(statement.subtotal("total_non_current_assets").unwrap().value, dec!(42000));
    // The ledger has no non-current liabilities.
    assert!(statement.subtotal("total_non_current_liabilities").is_none());
}

#[test]
fn test_imbalance_is_a_warning_not_an_error() {
    let ledger = ledger().with_line(Category::NonCurrentAsset, "Goodwill", usd(dec!(5000)));
    let statement = build(&SourceBundle::new(period(), ledger), StatementKind::Balance);

    assert!(statement.has_warning(WarningKind::BalanceSheetImbalance));
    assert_eq!(statement.line("Goodwill").unwrap().amount, usd(dec!(5000)));
    assert_eq!(statement.section_total(Section::Assets), dec!(1323000));
}

// ============================================================================
// Cash flow
// ============================================================================

#[test]
fn test_cash_flow_subtotals_and_metrics() {
    let bundle = SourceBundle::new(period(), ledger())
        .with_enrichment(snapshot(SourceId::Bank).with_transactions([
            bank_tx(3, Direction::Inflow, dec!(19000), "fundraising"),
            bank_tx(5, Direction::Inflow, dec!(100000), "revenue"),
            bank_tx(20, Direction::Outflow, dec!(124000), "payroll"),
        ]))
        .with_enrichment(snapshot(SourceId::Payments).with_metric(Metric::Payouts, usd(dec!(98000))))
        .with_enrichment(snapshot(SourceId::Payroll).with_metric(Metric::PayrollCashOut, usd(dec!(123500))));
    let statement = build(&bundle, StatementKind::CashFlow);

    assert_eq!(statement.subtotal("net_change_in_cash").unwrap().value, dec!(-4900));
    assert_eq!(statement.subtotal("ending_cash").unwrap().value, dec!(1240000));

    let metrics = statement.cash_metrics.as_ref().unwrap();
    assert_eq!(metrics.excluded_fundraising, usd(dec!(19000)));
    assert_eq!(metrics.net_burn, usd(dec!(24000)));
    assert_eq!(metrics.window_months, 1);
    assert_eq!(metrics.runway_months, Some(dec!(51.7)));
    assert_eq!(metrics.processor_payouts, Some(usd(dec!(98000))));
    assert_eq!(metrics.bank_net_change, usd(dec!(-5000)));
    assert_eq!(metrics.reconciliation_difference, Some(usd(dec!(100))));
    assert!(statement.warnings.is_empty(), "{:?}", statement.warnings);
}

// Ledger net change is -4,900; the bank pays out 124,000 against `receipts`.
#[rstest]
#[case(dec!(119100), false)]
#[case(dec!(120100), false)]
#[case(dec!(120100.01), true)]
#[case(dec!(117000), true)]
#[case(dec!(200000), true)]
fn test_bank_net_change_against_ledger(#[case] receipts: Decimal, #[case] diverges: bool) {
    let bundle = SourceBundle::new(period(), ledger()).with_enrichment(
        snapshot(SourceId::Bank).with_transactions([
            bank_tx(5, Direction::Inflow, receipts, "revenue"),
            bank_tx(20, Direction::Outflow, dec!(124000), "payroll"),
        ]),
    );
    let statement = build(&bundle, StatementKind::CashFlow);

    let metrics = statement.cash_metrics.as_ref().unwrap();
    assert_eq!(metrics.bank_net_change, usd(receipts - dec!(124000)));
    assert_eq!(
        metrics.reconciliation_difference,
        Some(usd(dec!(119100) - receipts))
    );

    let divergences: Vec<_> = statement.warnings_of(WarningKind::Divergence).collect();
    assert_eq!(divergences.len(), usize::from(diverges), "{divergences:?}");
    if let Some(warning) = divergences.first() {
        assert_eq!(warning.source, Some(SourceId::Bank));
        assert_eq!(warning.line.as_deref(), Some("Net Change in Cash"));
        assert_eq!(warning.divergence.unwrap().tolerance, usd(dec!(1000)));
    }
}

#[test]
fn test_cash_flow_without_bank_has_no_metrics() {
    let bundle = SourceBundle::new(period(), ledger()).with_enrichment(
        SourceSnapshot::unavailable(SourceId::Bank, period(), at(), "connection refused"),
    );
    let statement = build(&bundle, StatementKind::CashFlow);
    assert!(statement.cash_metrics.is_none());
    assert!(statement.has_warning(WarningKind::EnrichmentSourceUnavailable));
    assert_eq!(statement.subtotal("ending_cash").unwrap().value, dec!(1240000));
}

#[test]
fn test_payroll_cash_out_divergence() {
    let bundle = SourceBundle::new(period(), ledger()).with_enrichment(
        snapshot(SourceId::Payroll).with_metric(Metric::PayrollCashOut, usd(dec!(150000))),
    );
    let statement = build(&bundle, StatementKind::CashFlow);
    let warning = statement.warnings_of(WarningKind::Divergence).next().unwrap();
    assert_eq!(warning.source, Some(SourceId::Payroll));
    assert_eq!(warning.divergence.unwrap().difference, usd(dec!(26500)));
}

#[test]
fn test_payroll_cash_out_missing_in_ledger() {
    let ledger = snapshot(SourceId::Ledger)
        .with_line(Category::OperatingCash, "Net Income", usd(dec!(1000)))
        .with_metric(Metric::BeginningCash, usd(dec!(5000)));
    let bundle = SourceBundle::new(period(), ledger).with_enrichment(
        snapshot(SourceId::Payroll).with_metric(Metric::PayrollCashOut, usd(dec!(150000))),
    );
    let statement = build(&bundle, StatementKind::CashFlow);
    assert!(statement.has_warning(WarningKind::MappingUnmatched));
    assert!(!statement.has_warning(WarningKind::Divergence));
}

// ============================================================================
// Properties
// ============================================================================

const DEPARTMENTS: [&str; 7] = [
    "Engineering",
    "Customer Success",
    "Sales",
    "Marketing",
    "Finance",
    "Legal",
    "Facilities",
];

fn arb_amount() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

proptest! {
    /// Payroll attribution depends only on the set of department figures,
    /// never on the order the provider reported them in.
    #[test]
    fn prop_payroll_mapping_is_order_independent(
        amounts in prop::collection::vec(arb_amount(), DEPARTMENTS.len()),
        order in Just((0..DEPARTMENTS.len()).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let forward = DEPARTMENTS
            .iter()
            .zip(&amounts)
            .fold(snapshot(SourceId::Payroll), |s, (d, a)| {
                s.with_figure(FigureKey::Department((*d).to_string()), usd(*a))
            });
        let shuffled = order.iter().fold(snapshot(SourceId::Payroll), |s, &i| {
            s.with_figure(FigureKey::Department(DEPARTMENTS[i].to_string()), usd(amounts[i]))
        });

        let a = build(&SourceBundle::new(period(), ledger()).with_enrichment(forward), StatementKind::Income);
        let b = build(&SourceBundle::new(period(), ledger()).with_enrichment(shuffled), StatementKind::Income);
        prop_assert_eq!(&a, &b);

        // Ledger amounts are never changed by the mapping.
        let plain = build(&SourceBundle::new(period(), ledger()), StatementKind::Income);
        for (merged, original) in a.lines.iter().zip(&plain.lines) {
            prop_assert_eq!(merged.amount, original.amount);
        }
    }

    /// A ledger satisfying A = L + E never yields an imbalance warning, and
    /// breaking the equation always does, with amounts left as reported.
    #[test]
    fn prop_balance_sheet_equation(
        assets in prop::collection::vec(arb_amount(), 1..6),
        liabilities in prop::collection::vec(arb_amount(), 0..4),
        skew in arb_amount(),
    ) {
        let total_assets: Decimal = assets.iter().sum();
        let total_liabilities: Decimal = liabilities.iter().sum();
        let mut ledger = snapshot(SourceId::Ledger);
        for (i, a) in assets.iter().enumerate() {
            ledger = ledger.with_line(Category::CurrentAsset, format!("Asset {i}"), usd(*a));
        }
        for (i, l) in liabilities.iter().enumerate() {
            ledger = ledger.with_line(Category::CurrentLiability, format!("Liability {i}"), usd(*l));
        }
        let balanced = ledger
            .clone()
            .with_line(Category::Equity, "Retained Earnings", usd(total_assets - total_liabilities));

        let statement = build(&SourceBundle::new(period(), balanced), StatementKind::Balance);
        prop_assert!(!statement.has_warning(WarningKind::BalanceSheetImbalance));
        prop_assert_eq!(statement.section_total(Section::Assets), total_assets);

        let unbalanced = ledger.with_line(
            Category::Equity,
            "Retained Earnings",
            usd(total_assets - total_liabilities + skew + dec!(0.01)),
        );
        let statement = build(&SourceBundle::new(period(), unbalanced), StatementKind::Balance);
        prop_assert!(statement.has_warning(WarningKind::BalanceSheetImbalance));
        prop_assert_eq!(statement.section_total(Section::Assets), total_assets);
    }

    /// Runway is defined exactly when average monthly net burn is positive.
    #[test]
    fn prop_runway_defined_only_for_positive_burn(
        flows in prop::collection::vec((1u32..=28, any::<bool>(), arb_amount()), 0..20),
    ) {
        let transactions: Vec<_> = flows
            .iter()
            .map(|(day, inflow, amount)| {
                let direction = if *inflow { Direction::Inflow } else { Direction::Outflow };
                bank_tx(*day, direction, *amount, "operations")
            })
            .collect();
        let bundle = SourceBundle::new(period(), ledger())
            .with_enrichment(snapshot(SourceId::Bank).with_transactions(transactions));
        let statement = build(&bundle, StatementKind::CashFlow);
        let metrics = statement.cash_metrics.unwrap();

        let average = metrics.average_monthly_net_burn.amount;
        prop_assert_eq!(metrics.runway_months.is_some(), average > Decimal::ZERO);
        if let Some(runway) = metrics.runway_months {
            prop_assert!(runway >= Decimal::ZERO);
        }
    }
}

#[test]
fn test_settings_flow_into_engine() {
    let settings = ReconciliationSettings {
        revenue_tolerance: super::Tolerance::ratio(dec!(0.10)),
        ..ReconciliationSettings::default()
    };
    let bundle = SourceBundle::new(period(), ledger()).with_enrichment(
        snapshot(SourceId::Payments).with_metric(Metric::CashRevenue, usd(dec!(160000))),
    );
    let statement = ReconciliationEngine::new(settings)
        .reconcile(&bundle, StatementKind::Income)
        .unwrap();
    assert!(!statement.has_warning(WarningKind::Divergence));
}
