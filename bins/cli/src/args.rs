//! Command-line arguments.

use clap::{Args, Parser, ValueEnum};
use ledgerlens_core::{Period, StatementKind};
use ledgerlens_shared::AppError;

/// Reconciled financial statements from the general ledger and its satellites.
#[derive(Debug, Parser)]
#[command(name = "ledgerlens", version, long_about = None)]
pub struct Cli {
    /// Statement to build.
    #[arg(value_enum)]
    pub statement: StatementArg,

    #[command(flatten)]
    pub period: PeriodArgs,

    /// Emit logs as JSON lines on stderr.
    #[arg(long)]
    pub json_logs: bool,

    /// Print compact JSON instead of pretty-printed.
    #[arg(long)]
    pub compact: bool,
}

/// Which statement(s) to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatementArg {
    /// Income statement.
    Income,
    /// Balance sheet.
    Balance,
    /// Cash flow statement.
    CashFlow,
    /// All three.
    All,
}

impl StatementArg {
    /// Statement kinds to build, in presentation order.
    pub fn kinds(self) -> &'static [StatementKind] {
        match self {
            Self::Income => &[StatementKind::Income],
            Self::Balance => &[StatementKind::Balance],
            Self::CashFlow => &[StatementKind::CashFlow],
            Self::All => &StatementKind::ALL,
        }
    }
}

/// Exactly one of `--month`, `--quarter` or `--year`.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct PeriodArgs {
    /// Calendar month.
    #[arg(long, value_name = "YYYY-MM")]
    pub month: Option<String>,

    /// Calendar quarter.
    #[arg(long, value_name = "YYYY-QN")]
    pub quarter: Option<String>,

    /// Fiscal year, starting in the configured month.
    #[arg(long, value_name = "YYYY")]
    pub year: Option<i32>,
}

impl PeriodArgs {
    /// Resolves the arguments to a period.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for malformed or out-of-range input.
    pub fn resolve(&self, fiscal_year_start_month: u32) -> Result<Period, AppError> {
        let period = match (&self.month, &self.quarter, self.year) {
            (Some(month), _, _) => {
                let (year, month) = split(month, "YYYY-MM")?;
                let month = month
                    .parse::<u32>()
                    .map_err(|_| invalid(format!("bad month in {month:?}")))?;
                Period::month(year, month)
            }
            (_, Some(quarter), _) => {
                let (year, quarter) = split(quarter, "YYYY-QN")?;
                let quarter = quarter
                    .strip_prefix(['Q', 'q'])
                    .and_then(|q| q.parse::<u32>().ok())
                    .ok_or_else(|| invalid(format!("bad quarter in {quarter:?}")))?;
                Period::quarter(year, quarter)
            }
            (_, _, Some(year)) => Period::fiscal_year(year, fiscal_year_start_month),
            (None, None, None) => return Err(invalid("a period is required")),
        };
        period.map_err(|err| invalid(err.to_string()))
    }
}

fn split<'a>(value: &'a str, format: &str) -> Result<(i32, &'a str), AppError> {
    let (year, rest) = value
        .trim()
        .split_once('-')
        .ok_or_else(|| invalid(format!("expected {format}, got {value:?}")))?;
    let year = year
        .parse::<i32>()
        .map_err(|_| invalid(format!("bad year in {value:?}")))?;
    Ok((year, rest))
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::Validation(message.into())
}
