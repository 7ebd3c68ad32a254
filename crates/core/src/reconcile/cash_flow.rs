//! Cash flow merge rules, burn and runway.

use ledgerlens_shared::Money;
use rust_decimal::Decimal;
use tracing::debug;

use crate::period::Period;
use crate::sources::{CashTransaction, Direction, Metric, SourceId};
use crate::statement::{CashMetrics, Category, ContributionRole, SubtotalUnit, Warning};

use super::engine::Draft;
use super::matching::{find_in_category, label_contains};
use super::settings::ReconciliationSettings;

pub(super) fn merge(draft: &mut Draft<'_>) {
    let ledger_cash = subtotals(draft);
    merge_bank(draft, ledger_cash);
    merge_payouts(draft);
    merge_payroll(draft);
}

/// Ledger cash figures the bank is checked against.
#[derive(Debug, Clone, Copy)]
struct LedgerCash {
    net_change: Money,
    ending: Money,
}

/// Adds the activity subtotals and returns ledger net change and ending cash.
///
/// Beginning cash comes from the ledger's `beginning_cash` metric; without
/// it, ending cash falls back to the ledger's balance-sheet cash line.
fn subtotals(draft: &mut Draft<'_>) -> LedgerCash {
    let operations = draft.total(&[Category::OperatingCash]);
    let investing = draft.total(&[Category::InvestingCash]);
    let financing = draft.total(&[Category::FinancingCash]);
    let net_change = operations + investing + financing;

    let amount = SubtotalUnit::Amount;
    draft.subtotal("cash_from_operations", "Net Cash from Operating Activities", operations, amount);
    draft.subtotal("cash_from_investing", "Net Cash from Investing Activities", investing, amount);
    draft.subtotal("cash_from_financing", "Net Cash from Financing Activities", financing, amount);
    draft.subtotal("net_change_in_cash", "Net Change in Cash", net_change, amount);

    let ledger = draft.ledger();
    let beginning = ledger
        .metric(Metric::BeginningCash)
        .map(|m| m.amount)
        .or_else(|| {
            ledger
                .lines()
                .find(|(category, label, _)| {
                    *category == Category::CurrentAsset && label_contains(label, "cash")
                })
                .map(|(_, _, cash)| cash.amount - net_change)
        });

    let ending = match beginning {
        Some(beginning) => {
            let ending = beginning + net_change;
            draft.subtotal("beginning_cash", "Beginning Cash", beginning, amount);
            draft.subtotal("ending_cash", "Ending Cash", ending, amount);
            draft.money(ending)
        }
        None => {
            draft.warnings.push(Warning::unmatched(
                SourceId::Ledger,
                "ledger reports neither beginning cash nor a cash balance",
            ));
            draft.zero()
        }
    };
    LedgerCash {
        net_change: draft.money(net_change),
        ending,
    }
}

/// Burn metrics from bank transactions, and the bank's net flow checked
/// against the ledger's net change in cash.
fn merge_bank(draft: &mut Draft<'_>, ledger_cash: LedgerCash) {
    let Some(bank) = draft.enrichment(SourceId::Bank) else {
        return;
    };
    let currency = draft.settings.currency;
    let (usable, foreign): (Vec<&CashTransaction>, Vec<&CashTransaction>) = bank
        .transactions
        .iter()
        .partition(|t| t.amount.currency == currency);
    if let Some(first) = foreign.first() {
        draft.warnings.push(Warning::currency_mismatch(
            bank.source,
            &format!("{} transactions", foreign.len()),
            first.amount.currency,
            currency,
        ));
    }

    let mut metrics = burn_metrics(
        usable.into_iter(),
        &draft.bundle.period,
        draft.settings,
        ledger_cash.ending,
    );
    debug!(
        net_burn = %metrics.net_burn,
        average = %metrics.average_monthly_net_burn,
        bank_net_change = %metrics.bank_net_change,
        "Burn computed from bank transactions"
    );

    metrics.reconciliation_difference =
        ledger_cash.net_change.checked_sub(&metrics.bank_net_change);
    let tolerance = draft.settings.cash_tolerance;
    draft.compare(
        bank.source,
        "Net Change in Cash",
        ledger_cash.net_change,
        metrics.bank_net_change,
        tolerance,
        "net change in cash",
    );
    draft.cash_metrics = Some(metrics);
}

/// Burn and runway from bank transactions.
///
/// `net_burn` covers the whole period; the monthly average covers the
/// trailing window. Fundraising transactions (by category or tag) are left
/// out of both. Runway is `None` unless the average burn is positive.
/// `bank_net_change` is every in-period inflow minus every outflow,
/// fundraising included.
pub(crate) fn burn_metrics<'t>(
    transactions: impl Iterator<Item = &'t CashTransaction>,
    period: &Period,
    settings: &ReconciliationSettings,
    ending_cash: Money,
) -> CashMetrics {
    let window = period.trailing_months(settings.runway_window_months);
    let mut cash_in = Decimal::ZERO;
    let mut cash_out = Decimal::ZERO;
    let mut excluded = Decimal::ZERO;
    let mut window_net = Decimal::ZERO;
    let mut bank_net = Decimal::ZERO;

    for transaction in transactions.filter(|t| period.contains(t.posted_on)) {
        let amount = transaction.amount.amount;
        match transaction.direction {
            Direction::Inflow => bank_net += amount,
            Direction::Outflow => bank_net -= amount,
        }
        if is_fundraising(transaction, settings) {
            if transaction.direction == Direction::Inflow {
                excluded += amount;
            }
            continue;
        }
        let signed = match transaction.direction {
            Direction::Inflow => {
                cash_in += amount;
                -amount
            }
            Direction::Outflow => {
                cash_out += amount;
                amount
            }
        };
        if window.contains(transaction.posted_on) {
            window_net += signed;
        }
    }

    let window_months = window.months();
    let average = (window_net / Decimal::from(window_months)).round_dp(2);
    let runway_months = (average > Decimal::ZERO).then(|| (ending_cash.amount / average).round_dp(1));
    let money = |amount| Money::new(amount, ending_cash.currency);

    CashMetrics {
        operating_cash_in: money(cash_in),
        operating_cash_out: money(cash_out),
        net_burn: money(cash_out - cash_in),
        excluded_fundraising: money(excluded),
        window_months,
        average_monthly_net_burn: money(average),
        ending_cash,
        runway_months,
        processor_payouts: None,
        bank_net_change: money(bank_net),
        reconciliation_difference: None,
    }
}

fn is_fundraising(transaction: &CashTransaction, settings: &ReconciliationSettings) -> bool {
    transaction
        .category
        .as_deref()
        .is_some_and(|c| settings.is_fundraising(c))
        || transaction.tags.iter().any(|t| settings.is_fundraising(t))
}

fn merge_payouts(draft: &mut Draft<'_>) {
    let Some(payments) = draft.enrichment(SourceId::Payments) else {
        return;
    };
    let Some(payouts) = payments.metric(Metric::Payouts) else {
        return;
    };
    let Some(payouts) = draft.accept(payments.source, Metric::Payouts.as_str(), payouts) else {
        return;
    };
    if let Some(metrics) = draft.cash_metrics.as_mut() {
        metrics.processor_payouts = Some(payouts);
    }
}

/// Ledger payroll cash-out: the explicit metric, else the operating lines
/// labelled payroll.
fn ledger_payroll(draft: &Draft<'_>) -> Option<Money> {
    if let Some(metric) = draft.ledger().metric(Metric::PayrollCashOut) {
        return Some(metric);
    }
    let mut payroll_lines = draft
        .lines
        .iter()
        .filter(|l| l.category == Category::OperatingCash && label_contains(&l.label, "payroll"))
        .peekable();
    payroll_lines.peek()?;
    Some(draft.money(payroll_lines.map(|l| l.amount.amount.abs()).sum()))
}

fn merge_payroll(draft: &mut Draft<'_>) {
    let Some(payroll) = draft.enrichment(SourceId::Payroll) else {
        return;
    };
    let Some(provider_figure) = payroll.metric(Metric::PayrollCashOut) else {
        draft.warnings.push(Warning::unmatched(
            payroll.source,
            "payroll provider reported no payroll cash-out",
        ));
        return;
    };
    let Some(provider_figure) =
        draft.accept(payroll.source, Metric::PayrollCashOut.as_str(), provider_figure)
    else {
        return;
    };
    let Some(ledger_figure) = ledger_payroll(draft) else {
        draft.warnings.push(Warning::unmatched(
            payroll.source,
            "ledger reports no payroll cash-out to cross-check against",
        ));
        draft.unclassified(
            payroll.source,
            "Payroll Cash Out",
            provider_figure,
            "no ledger payroll figure",
        );
        return;
    };

    if let Some(index) = find_in_category(&draft.lines, Category::OperatingCash, "payroll") {
        draft.annotate(
            index,
            payroll,
            ContributionRole::CrossCheck,
            Some(provider_figure),
            "payroll provider cash-out",
        );
    }
    let tolerance = draft.settings.payroll_tolerance;
    draft.compare(
        payroll.source,
        "payroll cash-out",
        ledger_figure,
        provider_figure,
        tolerance,
        "payroll cash-out",
    );
}
