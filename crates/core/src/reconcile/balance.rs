//! Balance sheet merge rules.

use chrono::NaiveDate;
use ledgerlens_shared::{Currency, Money};
use rust_decimal::Decimal;

use crate::sources::{BillingInterval, Metric, SourceId, Subscription};
use crate::statement::{Category, ContributionRole, SubtotalUnit, Warning};

use super::engine::{Draft, ratio};
use super::matching::find_in_category;

pub(super) fn merge(draft: &mut Draft<'_>) {
    merge_bank(draft);
    merge_card(draft);
    merge_payments(draft);
    draft.merge_manual_entries();
    check_equation(draft);
    subtotals(draft);
}

/// First current asset labelled "cash".
pub(super) fn cash_line(draft: &Draft<'_>) -> Option<usize> {
    find_in_category(&draft.lines, Category::CurrentAsset, "cash")
}

fn merge_bank(draft: &mut Draft<'_>) {
    let Some(bank) = draft.enrichment(SourceId::Bank) else {
        return;
    };
    let Some(balance) = bank.metric(Metric::CashBalance) else {
        return;
    };
    let Some(balance) = draft.accept(bank.source, Metric::CashBalance.as_str(), balance) else {
        return;
    };
    match cash_line(draft) {
        Some(index) => {
            let tolerance = draft.settings.balance_tolerance;
            draft.cross_check(
                index,
                bank,
                balance,
                tolerance,
                "bank balance (difference suggests uncleared transactions)",
            );
        }
        None => {
            draft.warnings.push(Warning::unmatched(
                bank.source,
                "ledger has no cash line to cross-check the bank balance against",
            ));
            draft.unclassified(bank.source, "Bank Balance", balance, "no ledger cash line");
        }
    }
}

fn merge_card(draft: &mut Draft<'_>) {
    let Some(card) = draft.enrichment(SourceId::Card) else {
        return;
    };
    let Some(balance) = card.metric(Metric::CardBalance) else {
        return;
    };
    let Some(balance) = draft.accept(card.source, Metric::CardBalance.as_str(), balance) else {
        return;
    };
    match find_in_category(&draft.lines, Category::CurrentLiability, "card") {
        Some(index) => {
            let tolerance = draft.settings.balance_tolerance;
            draft.cross_check(index, card, balance, tolerance, "card balance");
        }
        None => {
            draft.warnings.push(Warning::unmatched(
                card.source,
                "ledger has no card liability line to cross-check the card balance against",
            ));
            draft.unclassified(card.source, "Card Balance", balance, "no ledger card line");
        }
    }
}

fn merge_payments(draft: &mut Draft<'_>) {
    let Some(payments) = draft.enrichment(SourceId::Payments) else {
        return;
    };

    if !payments.subscriptions.is_empty() {
        let as_of = draft.bundle.period.end();
        let mut estimate = draft.zero();
        let mut skipped = false;
        for subscription in &payments.subscriptions {
            match estimate.checked_add(&unearned(subscription, as_of)) {
                Some(sum) => estimate = sum,
                None => skipped = true,
            }
        }
        if skipped {
            draft.warnings.push(Warning::currency_mismatch(
                payments.source,
                "subscriptions",
                other_currency(payments.subscriptions.iter().map(|s| s.amount), draft.zero()),
                draft.settings.currency,
            ));
        }
        let estimate = estimate.round_cents();
        match find_in_category(&draft.lines, Category::CurrentLiability, "deferred revenue") {
            Some(index) => {
                let tolerance = draft.settings.balance_tolerance;
                draft.cross_check(
                    index,
                    payments,
                    estimate,
                    tolerance,
                    "deferred revenue estimated from annual subscriptions",
                );
            }
            None => {
                draft.warnings.push(Warning::unmatched(
                    payments.source,
                    "ledger has no deferred revenue line for the subscription estimate",
                ));
                draft.unclassified(
                    payments.source,
                    "Estimated Deferred Revenue",
                    estimate,
                    "no ledger deferred revenue line",
                );
            }
        }
    }

    if let Some(available) = payments.metric(Metric::AvailableBalance) {
        let Some(available) = draft.accept(payments.source, Metric::AvailableBalance.as_str(), available)
        else {
            return;
        };
        let processor = find_in_category(&draft.lines, Category::CurrentAsset, "processor")
            .or_else(|| find_in_category(&draft.lines, Category::CurrentAsset, "stripe"));
        if let Some(index) = processor {
            draft.annotate(
                index,
                payments,
                ContributionRole::Annotation,
                Some(available),
                "processor balance available for payout",
            );
        }
    }
}

/// Unearned part of an annual plan at `as_of`:
/// `amount * remaining_days / total_days`. Other intervals carry no
/// meaningful deferral and contribute zero.
fn unearned(subscription: &Subscription, as_of: NaiveDate) -> Money {
    let zero = Money::zero(subscription.amount.currency);
    if subscription.interval != BillingInterval::Year {
        return zero;
    }
    let total_days = (subscription.current_period_end - subscription.current_period_start).num_days();
    if total_days <= 0 {
        return zero;
    }
    let remaining = (subscription.current_period_end - as_of)
        .num_days()
        .clamp(0, total_days);
    Money::new(
        subscription.amount.amount * Decimal::from(remaining) / Decimal::from(total_days),
        subscription.amount.currency,
    )
}

fn other_currency(amounts: impl Iterator<Item = Money>, company: Money) -> Currency {
    amounts
        .map(|m| m.currency)
        .find(|c| *c != company.currency)
        .unwrap_or(company.currency)
}

fn check_equation(draft: &mut Draft<'_>) {
    let assets = draft.total(&[Category::CurrentAsset, Category::NonCurrentAsset]);
    let claims = draft.total(&[
        Category::CurrentLiability,
        Category::NonCurrentLiability,
        Category::Equity,
    ]);
    if assets != claims {
        let warning = Warning::imbalance(draft.money(assets), draft.money(claims));
        draft.warnings.push(warning);
    }
}

fn subtotals(draft: &mut Draft<'_>) {
    let current_assets = draft.total(&[Category::CurrentAsset]);
    let non_current_assets = draft.total(&[Category::NonCurrentAsset]);
    let assets = current_assets + non_current_assets;
    let current_liabilities = draft.total(&[Category::CurrentLiability]);
    let non_current_liabilities = draft.total(&[Category::NonCurrentLiability]);
    let liabilities = current_liabilities + non_current_liabilities;
    let equity = draft.total(&[Category::Equity]);
    let cash = cash_line(draft).map_or(Decimal::ZERO, |i| draft.lines[i].amount.amount);

    let amount = SubtotalUnit::Amount;
    draft.subtotal("total_current_assets", "Total Current Assets", current_assets, amount);
    if has_lines(draft, Category::NonCurrentAsset) {
        draft.subtotal("total_non_current_assets", "Total Non-Current Assets", non_current_assets, amount);
    }
    draft.subtotal("total_assets", "Total Assets", assets, amount);
    draft.subtotal("total_current_liabilities", "Total Current Liabilities", current_liabilities, amount);
    if has_lines(draft, Category::NonCurrentLiability) {
        draft.subtotal(
            "total_non_current_liabilities",
            "Total Non-Current Liabilities",
            non_current_liabilities,
            amount,
        );
    }
    draft.subtotal("total_liabilities", "Total Liabilities", liabilities, amount);
    draft.subtotal("total_equity", "Total Equity", equity, amount);
    draft.subtotal(
        "total_liabilities_and_equity",
        "Total Liabilities & Equity",
        liabilities + equity,
        amount,
    );
    if let Some(current) = ratio(current_assets, current_liabilities) {
        draft.subtotal("current_ratio", "Current Ratio", current, SubtotalUnit::Ratio);
    }
    if let Some(cash_ratio) = ratio(cash, current_liabilities) {
        draft.subtotal("cash_ratio", "Cash Ratio", cash_ratio, SubtotalUnit::Ratio);
    }
}

fn has_lines(draft: &Draft<'_>, category: Category) -> bool {
    draft.lines.iter().any(|l| l.category == category)
}
