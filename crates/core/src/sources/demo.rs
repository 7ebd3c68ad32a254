//! Deterministic demo data for a B2B SaaS company (~$2M ARR, Series A).
//!
//! Lets every statement build end to end before live credentials exist.
//! Annual flow figures are pro-rated by the number of months in the period;
//! balances are point-in-time and not scaled.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};
use ledgerlens_shared::{Currency, Money};
use rust_decimal::Decimal;

use crate::clock::Clock;
use crate::period::Period;
use crate::statement::Category;

use super::error::ProviderError;
use super::provider::SnapshotProvider;
use super::types::{
    BillingInterval, CashTransaction, Direction, FigureKey, Metric, SourceId, SourceSnapshot,
    Subscription,
};

const REVENUE: &[(&str, i64)] = &[
    ("Subscription Revenue", 1_820_000),
    ("Professional Services", 180_000),
];

const COGS: &[(&str, i64)] = &[
    ("Hosting & Infrastructure", 91_000),
    ("Customer Success Payroll", 210_000),
    ("Third-Party Software", 36_400),
    ("Payment Processing Fees", 18_200),
];

const SALES_AND_MARKETING: &[(&str, i64)] = &[
    ("Sales Payroll", 480_000),
    ("Marketing Payroll", 180_000),
    ("Advertising & Demand Gen", 240_000),
    ("Sales Tools & Software", 36_000),
];

const RESEARCH_AND_DEVELOPMENT: &[(&str, i64)] = &[
    ("Engineering Payroll", 560_000),
    ("R&D Software & Tools", 48_000),
];

const GENERAL_AND_ADMINISTRATIVE: &[(&str, i64)] = &[
    ("G&A Payroll", 240_000),
    ("Legal & Professional", 72_000),
    ("Office & Facilities", 36_000),
    ("Insurance", 18_000),
    ("Other G&A", 24_000),
];

const OTHER_EXPENSE: &[(&str, i64)] = &[
    ("Depreciation & Amortization", 12_000),
    ("Interest Expense", 4_800),
];

const CURRENT_ASSETS: &[(&str, i64)] = &[
    ("Cash & Cash Equivalents", 1_240_000),
    ("Payment Processor Balance", 48_300),
    ("Accounts Receivable", 210_000),
    ("Prepaid Expenses", 36_000),
];

const NON_CURRENT_ASSETS: &[(&str, i64)] = &[
    ("Property & Equipment (Net)", 42_000),
    ("Intangible Assets", 18_000),
    ("Security Deposits", 12_000),
];

const CURRENT_LIABILITIES: &[(&str, i64)] = &[
    ("Accounts Payable", 68_000),
    ("Corporate Card Balance", 24_000),
    ("Accrued Payroll & Benefits", 62_000),
    ("Deferred Revenue", 145_000),
    ("Other Accrued Liabilities", 18_000),
];

const NON_CURRENT_LIABILITIES: &[(&str, i64)] = &[("Long-Term Debt", 0), ("Deferred Rent", 8_000)];

const PAID_IN_CAPITAL: &[(&str, i64)] = &[
    ("Common Stock", 5_000),
    ("Additional Paid-In Capital", 4_800_000),
];

const OPERATING_ADJUSTMENTS: &[(&str, i64)] = &[
    ("Depreciation & Amortization", 12_000),
    ("Stock-Based Compensation", 96_000),
    ("Increase in Accounts Receivable", -42_000),
    ("Increase in Deferred Revenue", 72_000),
    ("Increase in Accounts Payable", 18_000),
    ("Change in Accrued Liabilities", 8_000),
    ("Change in Prepaid Expenses", -6_000),
];

const INVESTING: &[(&str, i64)] = &[
    ("Capital Expenditures", -18_000),
    ("Purchase of Intangibles", -6_000),
];

const FINANCING: &[(&str, i64)] = &[
    ("Proceeds from Stock Issuance", 0),
    ("Repayment of Debt", 0),
];

const PAYROLL_DEPARTMENTS: &[(&str, i64)] = &[
    ("Engineering", 560_000),
    ("Customer Success", 210_000),
    ("Sales", 480_000),
    ("Marketing", 180_000),
    ("Finance", 240_000),
];

const CARD_SPEND: &[(&str, i64)] = &[
    ("Advertising & Demand Gen", 150_000),
    ("Hosting & Infrastructure", 91_000),
    ("R&D Software & Tools", 30_000),
    ("Travel & Entertainment", 14_000),
];

/// `(amount, days already elapsed of a 365-day annual term)` at period end.
const ANNUAL_PLANS: &[(i64, i64)] = &[(120_000, 273), (96_000, 92), (60_000, 182), (24_000, 182)];

/// Demo snapshot provider for one source.
pub struct DemoProvider {
    source: SourceId,
    currency: Currency,
    clock: Arc<dyn Clock>,
}

impl DemoProvider {
    /// Creates a demo provider for `source`.
    #[must_use]
    pub fn new(source: SourceId, currency: Currency, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            currency,
            clock,
        }
    }

    fn money(&self, amount: Decimal) -> Money {
        Money::new(amount, self.currency)
    }

    fn ledger(&self, period: &Period, base: SourceSnapshot) -> SourceSnapshot {
        let scale = Scale::new(period);
        let mut snapshot = base;

        let income_sections = [
            (Category::Revenue, REVENUE),
            (Category::Cogs, COGS),
            (Category::SalesAndMarketing, SALES_AND_MARKETING),
            (Category::ResearchAndDevelopment, RESEARCH_AND_DEVELOPMENT),
            (Category::GeneralAndAdministrative, GENERAL_AND_ADMINISTRATIVE),
            (Category::OtherExpense, OTHER_EXPENSE),
        ];
        let mut net_income = Decimal::ZERO;
        for (category, lines) in income_sections {
            for (label, annual) in lines {
                let amount = scale.apply(*annual);
                net_income += if category == Category::Revenue {
                    amount
                } else {
                    -amount
                };
                snapshot = snapshot.with_line(category, *label, self.money(amount));
            }
        }

        let mut total_assets = Decimal::ZERO;
        for (category, lines) in [
            (Category::CurrentAsset, CURRENT_ASSETS),
            (Category::NonCurrentAsset, NON_CURRENT_ASSETS),
        ] {
            for (label, amount) in lines {
                total_assets += Decimal::from(*amount);
                snapshot = snapshot.with_line(category, *label, self.money(Decimal::from(*amount)));
            }
        }
        let mut total_liabilities = Decimal::ZERO;
        for (category, lines) in [
            (Category::CurrentLiability, CURRENT_LIABILITIES),
            (Category::NonCurrentLiability, NON_CURRENT_LIABILITIES),
        ] {
            for (label, amount) in lines {
                total_liabilities += Decimal::from(*amount);
                snapshot = snapshot.with_line(category, *label, self.money(Decimal::from(*amount)));
            }
        }
        let mut paid_in = Decimal::ZERO;
        for (label, amount) in PAID_IN_CAPITAL {
            paid_in += Decimal::from(*amount);
            snapshot = snapshot.with_line(Category::Equity, *label, self.money(Decimal::from(*amount)));
        }
        // Plug so the demo ledger balances: A = L + E.
        let retained = total_assets - total_liabilities - paid_in;
        snapshot = snapshot.with_line(
            Category::Equity,
            "Retained Earnings (Deficit)",
            self.money(retained),
        );

        let mut net_change = net_income;
        snapshot = snapshot.with_line(Category::OperatingCash, "Net Income", self.money(net_income));
        for (category, lines) in [
            (Category::OperatingCash, OPERATING_ADJUSTMENTS),
            (Category::InvestingCash, INVESTING),
            (Category::FinancingCash, FINANCING),
        ] {
            for (label, annual) in lines {
                let amount = scale.apply(*annual);
                net_change += amount;
                snapshot = snapshot.with_line(category, *label, self.money(amount));
            }
        }
        // Beginning cash chosen so ending cash equals the balance-sheet cash line.
        let ending_cash = Decimal::from(CURRENT_ASSETS[0].1);
        let payroll: Decimal = PAYROLL_DEPARTMENTS.iter().map(|(_, a)| scale.apply(*a)).sum();
        snapshot
            .with_metric(Metric::BeginningCash, self.money(ending_cash - net_change))
            .with_metric(Metric::PayrollCashOut, self.money(payroll))
    }

    fn payments(&self, period: &Period, base: SourceSnapshot) -> SourceSnapshot {
        let scale = Scale::new(period);
        let as_of = period.end();
        let annual = ANNUAL_PLANS.iter().enumerate().map(|(i, (amount, elapsed))| {
            let start = as_of - Duration::days(*elapsed);
            Subscription {
                id: format!("sub_annual_{}", i + 1),
                interval: BillingInterval::Year,
                amount: self.money(Decimal::from(*amount)),
                current_period_start: start,
                current_period_end: start + Duration::days(365),
            }
        });
        let monthly = Subscription {
            id: "sub_monthly_1".to_string(),
            interval: BillingInterval::Month,
            amount: self.money(Decimal::from(5_000)),
            current_period_start: as_of - Duration::days(10),
            current_period_end: as_of + Duration::days(20),
        };

        base.with_metric(
            Metric::Mrr,
            self.money((Decimal::from(1_820_000) / Decimal::from(12)).round_dp(2)),
        )
        .with_metric(Metric::Arr, self.money(Decimal::from(1_820_000)))
        .with_metric(Metric::CashRevenue, self.money(scale.apply(2_040_000)))
        .with_metric(Metric::Payouts, self.money(scale.apply(1_960_000)))
        .with_metric(Metric::AvailableBalance, self.money(Decimal::from(48_300)))
        .with_subscriptions(annual.chain(std::iter::once(monthly)))
    }

    fn bank(&self, period: &Period, base: SourceSnapshot) -> SourceSnapshot {
        let mut transactions = Vec::new();
        for (index, day) in mid_month_days(period).into_iter().enumerate() {
            if index == 0 {
                transactions.push(self.transaction(
                    day,
                    Direction::Inflow,
                    500_000,
                    "fundraising",
                    &["series_a"],
                    "Series A tranche",
                ));
            }
            transactions.push(self.transaction(day, Direction::Inflow, 160_000, "revenue", &[], "Customer receipts"));
            transactions.push(self.transaction(day, Direction::Outflow, 139_167, "payroll", &[], "Payroll run"));
            transactions.push(self.transaction(day, Direction::Outflow, 45_000, "vendors", &[], "Vendor payments"));
            transactions.push(self.transaction(day, Direction::Outflow, 3_000, "facilities", &[], "Office rent"));
        }
        base.with_metric(Metric::CashBalance, self.money(Decimal::from(1_240_000)))
            .with_transactions(transactions)
    }

    fn transaction(
        &self,
        posted_on: NaiveDate,
        direction: Direction,
        amount: i64,
        category: &str,
        tags: &[&str],
        description: &str,
    ) -> CashTransaction {
        CashTransaction {
            posted_on,
            direction,
            amount: self.money(Decimal::from(amount)),
            category: Some(category.to_string()),
            tags: tags.iter().map(ToString::to_string).collect(),
            description: description.to_string(),
        }
    }

    fn card(&self, period: &Period, base: SourceSnapshot) -> SourceSnapshot {
        let scale = Scale::new(period);
        CARD_SPEND
            .iter()
            .fold(base, |snapshot, (category, annual)| {
                snapshot.with_figure(
                    FigureKey::Spend((*category).to_string()),
                    self.money(scale.apply(*annual)),
                )
            })
            .with_metric(Metric::CardBalance, self.money(Decimal::from(24_000)))
    }

    fn payroll(&self, period: &Period, base: SourceSnapshot) -> SourceSnapshot {
        let scale = Scale::new(period);
        let mut total = Decimal::ZERO;
        let snapshot = PAYROLL_DEPARTMENTS
            .iter()
            .fold(base, |snapshot, (department, annual)| {
                let amount = scale.apply(*annual);
                total += amount;
                snapshot.with_figure(
                    FigureKey::Department((*department).to_string()),
                    self.money(amount),
                )
            });
        snapshot
            .with_metric(Metric::PayrollTotal, self.money(total))
            .with_metric(Metric::PayrollCashOut, self.money(total))
    }

    fn crm(&self, period: &Period, base: SourceSnapshot) -> SourceSnapshot {
        let scale = Scale::new(period);
        base.with_metric(Metric::PipelineValue, self.money(Decimal::from(2_400_000)))
            .with_metric(Metric::ClosedWon, self.money(scale.apply(640_000)))
    }

    fn spreadsheet(&self, period: &Period, base: SourceSnapshot) -> SourceSnapshot {
        let scale = Scale::new(period);
        base.with_figure(
            FigureKey::Manual("Insurance".to_string()),
            self.money(scale.apply(18_000)),
        )
        .with_figure(
            FigureKey::Manual("Prepaid Expenses".to_string()),
            self.money(Decimal::from(36_000)),
        )
        .with_figure(
            FigureKey::Manual("Accrued Bonus".to_string()),
            self.money(Decimal::from(15_000)),
        )
    }
}

#[async_trait]
impl SnapshotProvider for DemoProvider {
    fn source(&self) -> SourceId {
        self.source
    }

    async fn get_snapshot(&self, period: &Period) -> Result<SourceSnapshot, ProviderError> {
        let base = SourceSnapshot::new(self.source, *period, self.clock.now());
        Ok(match self.source {
            SourceId::Ledger => self.ledger(period, base),
            SourceId::Payments => self.payments(period, base),
            SourceId::Bank => self.bank(period, base),
            SourceId::Card => self.card(period, base),
            SourceId::Payroll => self.payroll(period, base),
            SourceId::Crm => self.crm(period, base),
            SourceId::Spreadsheet => self.spreadsheet(period, base),
        })
    }
}

/// Pro-rates annual figures to the period length.
struct Scale {
    months: Decimal,
}

impl Scale {
    fn new(period: &Period) -> Self {
        Self {
            months: Decimal::from(period.months()),
        }
    }

    fn apply(&self, annual: i64) -> Decimal {
        (Decimal::from(annual) * self.months / Decimal::from(12)).round()
    }
}

/// The 15th of every month the period touches, clamped into the period.
fn mid_month_days(period: &Period) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut cursor = period.start().with_day(1).unwrap_or(period.start());
    while cursor < period.end() {
        let mid = cursor.with_day(15).unwrap_or(cursor);
        days.push(mid.clamp(period.start(), period.last_day()));
        match cursor.checked_add_months(chrono::Months::new(1)) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn provider(source: SourceId) -> DemoProvider {
        let clock = FixedClock(Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap());
        DemoProvider::new(source, Currency::Usd, Arc::new(clock))
    }

    #[tokio::test]
    async fn test_demo_ledger_balance_sheet_balances() {
        let period = Period::fiscal_year(2026, 1).unwrap();
        let snapshot = provider(SourceId::Ledger).get_snapshot(&period).await.unwrap();

        let sum = |pred: fn(Category) -> bool| -> Decimal {
            snapshot
                .lines()
                .filter(|(c, _, _)| pred(*c))
                .map(|(_, _, m)| m.amount)
                .sum()
        };
        let assets = sum(|c| matches!(c, Category::CurrentAsset | Category::NonCurrentAsset));
        let claims = sum(|c| {
            matches!(
                c,
                Category::CurrentLiability | Category::NonCurrentLiability | Category::Equity
            )
        });
        assert_eq!(assets, dec!(1606300));
        assert_eq!(assets, claims);
    }

    #[tokio::test]
    async fn test_demo_ledger_scales_flows_by_period() {
        let year = Period::fiscal_year(2026, 1).unwrap();
        let quarter = Period::quarter(2026, 1).unwrap();
        let ledger = provider(SourceId::Ledger);

        let year_snapshot = ledger.get_snapshot(&year).await.unwrap();
        let quarter_snapshot = ledger.get_snapshot(&quarter).await.unwrap();
        let key = FigureKey::line(Category::Revenue, "Subscription Revenue");

        assert_eq!(year_snapshot.figures[&key].amount, dec!(1820000));
        assert_eq!(quarter_snapshot.figures[&key].amount, dec!(455000));
        // Balances are point in time.
        let cash = FigureKey::line(Category::CurrentAsset, "Cash & Cash Equivalents");
        assert_eq!(quarter_snapshot.figures[&cash], year_snapshot.figures[&cash]);
    }

    #[tokio::test]
    async fn test_demo_cash_flow_ends_at_balance_sheet_cash() {
        let period = Period::fiscal_year(2026, 1).unwrap();
        let snapshot = provider(SourceId::Ledger).get_snapshot(&period).await.unwrap();

        let net_change: Decimal = snapshot
            .lines()
            .filter(|(c, _, _)| {
                matches!(
                    c,
                    Category::OperatingCash | Category::InvestingCash | Category::FinancingCash
                )
            })
            .map(|(_, _, m)| m.amount)
            .sum();
        let beginning = snapshot.metric(Metric::BeginningCash).unwrap().amount;
        assert_eq!(beginning + net_change, dec!(1240000));
    }

    #[tokio::test]
    async fn test_demo_bank_transactions_stay_in_period() {
        let period = Period::quarter(2026, 2).unwrap();
        let snapshot = provider(SourceId::Bank).get_snapshot(&period).await.unwrap();

        assert!(!snapshot.transactions.is_empty());
        assert!(snapshot.transactions.iter().all(|t| period.contains(t.posted_on)));
        let fundraising = snapshot
            .transactions
            .iter()
            .filter(|t| t.category.as_deref() == Some("fundraising"))
            .count();
        assert_eq!(fundraising, 1);
    }

    #[tokio::test]
    async fn test_demo_snapshot_is_deterministic() {
        let period = Period::month(2026, 3).unwrap();
        for source in SourceId::ALL {
            let a = provider(source).get_snapshot(&period).await.unwrap();
            let b = provider(source).get_snapshot(&period).await.unwrap();
            assert_eq!(a, b, "{source} demo snapshot differs between calls");
            assert_eq!(a.source, source);
            assert_eq!(a.period, period);
        }
    }
}
