//! Income statement merge rules.

use rust_decimal::Decimal;
use tracing::debug;

use crate::sources::{Metric, SourceId};
use crate::statement::{Category, ContributionRole, SubtotalUnit, Warning};

use super::engine::{Draft, percent};
use super::matching::{find_by_label, label_contains, payroll_line};

pub(super) fn merge(draft: &mut Draft<'_>) {
    let primary = primary_revenue_line(draft);
    merge_payments(draft, primary);
    merge_crm(draft, primary);
    merge_payroll(draft);
    merge_card_spend(draft);
    draft.merge_manual_entries();
    subtotals(draft);
}

/// The largest revenue line; ties go to the earlier line.
fn primary_revenue_line(draft: &Draft<'_>) -> Option<usize> {
    draft
        .lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.category == Category::Revenue)
        .fold(None, |best: Option<(usize, Decimal)>, (index, line)| match best {
            Some((_, amount)) if amount >= line.amount.amount => best,
            _ => Some((index, line.amount.amount)),
        })
        .map(|(index, _)| index)
}

fn merge_payments(draft: &mut Draft<'_>, primary: Option<usize>) {
    let Some(payments) = draft.enrichment(SourceId::Payments) else {
        return;
    };
    let total_revenue = draft.money(draft.total(&[Category::Revenue]));
    let line_label = primary.map_or_else(
        || "revenue".to_string(),
        |index| draft.lines[index].label.clone(),
    );

    if let Some(cash) = payments.metric(Metric::CashRevenue) {
        if let Some(cash) = draft.accept(payments.source, Metric::CashRevenue.as_str(), cash) {
            if let Some(index) = primary {
                draft.annotate(
                    index,
                    payments,
                    ContributionRole::CrossCheck,
                    Some(cash),
                    "processor cash revenue vs total ledger revenue",
                );
            }
            let tolerance = draft.settings.revenue_tolerance;
            draft.compare(
                payments.source,
                &line_label,
                total_revenue,
                cash,
                tolerance,
                "revenue cross-check",
            );
        }
    }

    for (metric, note) in [
        (Metric::Mrr, "monthly recurring revenue"),
        (Metric::Arr, "annual recurring revenue"),
    ] {
        annotate_metric(draft, primary, SourceId::Payments, metric, note);
    }
}

fn merge_crm(draft: &mut Draft<'_>, primary: Option<usize>) {
    for (metric, note) in [
        (Metric::ClosedWon, "closed-won bookings"),
        (Metric::PipelineValue, "open pipeline"),
    ] {
        annotate_metric(draft, primary, SourceId::Crm, metric, note);
    }
}

fn annotate_metric(
    draft: &mut Draft<'_>,
    primary: Option<usize>,
    source: SourceId,
    metric: Metric,
    note: &str,
) {
    let Some(snapshot) = draft.enrichment(source) else {
        return;
    };
    let Some(value) = snapshot.metric(metric) else {
        return;
    };
    let Some(value) = draft.accept(source, metric.as_str(), value) else {
        return;
    };
    match primary {
        Some(index) => {
            draft.annotate(index, snapshot, ContributionRole::Annotation, Some(value), note);
        }
        None => draft.unclassified(source, metric.as_str(), value, "no revenue line to annotate"),
    }
}

/// Attributes payroll cost by department to the matching expense line.
///
/// Departments are visited in name order, so the result does not depend on
/// the order the provider reported them in.
fn merge_payroll(draft: &mut Draft<'_>) {
    let Some(payroll) = draft.enrichment(SourceId::Payroll) else {
        return;
    };
    for (department, cost) in payroll.departments() {
        let Some(cost) = draft.accept(payroll.source, department, cost) else {
            continue;
        };
        let Some(category) = draft.settings.payroll_buckets.category_for(department) else {
            debug!(department, "Unknown payroll department");
            draft.warnings.push(Warning::unmatched(
                payroll.source,
                format!("payroll department {department} has no category mapping"),
            ));
            draft.unclassified(payroll.source, department, cost, "unknown department");
            continue;
        };
        match payroll_line(&draft.lines, category, department) {
            Some(index) => draft.annotate(
                index,
                payroll,
                ContributionRole::Annotation,
                Some(cost),
                format!("payroll: {department}"),
            ),
            None => {
                draft.warnings.push(Warning::unmatched(
                    payroll.source,
                    format!("payroll department {department} maps to {category}, which has no ledger line"),
                ));
                draft.unclassified(
                    payroll.source,
                    department,
                    cost,
                    format!("no {category} line"),
                );
            }
        }
    }
}

/// Attributes card spend to the expense line with the same normalized label.
fn merge_card_spend(draft: &mut Draft<'_>) {
    let Some(card) = draft.enrichment(SourceId::Card) else {
        return;
    };
    let mut unmatched = Vec::new();
    for (category, spend) in card.spend() {
        let Some(spend) = draft.accept(card.source, category, spend) else {
            continue;
        };
        match find_by_label(&draft.lines, category, |l| l.category.is_expense()) {
            Some(index) => draft.annotate(
                index,
                card,
                ContributionRole::Annotation,
                Some(spend),
                format!("card spend: {category}"),
            ),
            None => {
                draft.unclassified(card.source, category, spend, "no expense line with this label");
                unmatched.push(category);
            }
        }
    }
    if !unmatched.is_empty() {
        draft.warnings.push(Warning::unmatched(
            card.source,
            format!("card spend categories without a ledger line: {}", unmatched.join(", ")),
        ));
    }
}

fn subtotals(draft: &mut Draft<'_>) {
    let revenue = draft.total(&[Category::Revenue]);
    let cogs = draft.total(&[Category::Cogs]);
    let sales_and_marketing = draft.total(&[Category::SalesAndMarketing]);
    let research = draft.total(&[Category::ResearchAndDevelopment]);
    let general = draft.total(&[Category::GeneralAndAdministrative]);
    let other = draft.total(&[Category::OtherExpense]);
    let depreciation: Decimal = draft
        .lines
        .iter()
        .filter(|l| {
            l.category == Category::OtherExpense
                && (label_contains(&l.label, "depreciation") || label_contains(&l.label, "amortization"))
        })
        .map(|l| l.amount.amount)
        .sum();

    let gross_profit = revenue - cogs;
    let operating_expenses = sales_and_marketing + research + general;
    let ebitda = gross_profit - operating_expenses;
    let ebit = ebitda - depreciation;
    let net_income = ebitda - other;

    let amount = SubtotalUnit::Amount;
    draft.subtotal("total_revenue", "Total Revenue", revenue, amount);
    draft.subtotal("total_cogs", "Total COGS", cogs, amount);
    draft.subtotal("gross_profit", "Gross Profit", gross_profit, amount);
    if let Some(margin) = percent(gross_profit, revenue) {
        draft.subtotal("gross_margin", "Gross Margin", margin, SubtotalUnit::Percent);
    }
    draft.subtotal("total_sales_and_marketing", "Total Sales & Marketing", sales_and_marketing, amount);
    draft.subtotal("total_research_and_development", "Total R&D", research, amount);
    draft.subtotal("total_general_and_administrative", "Total G&A", general, amount);
    draft.subtotal("total_operating_expenses", "Total Operating Expenses", operating_expenses, amount);
    draft.subtotal("ebitda", "EBITDA", ebitda, amount);
    if let Some(margin) = percent(ebitda, revenue) {
        draft.subtotal("ebitda_margin", "EBITDA Margin", margin, SubtotalUnit::Percent);
    }
    draft.subtotal("ebit", "EBIT", ebit, amount);
    draft.subtotal("total_other_expense", "Total Other Expense", other, amount);
    draft.subtotal("net_income", "Net Income", net_income, amount);
    if let Some(margin) = percent(net_income, revenue) {
        draft.subtotal("net_margin", "Net Margin", margin, SubtotalUnit::Percent);
    }
}
