//! Period types.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::error::PeriodError;

/// Reporting granularity of a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One calendar month.
    Month,
    /// One calendar quarter.
    Quarter,
    /// One (fiscal) year.
    Year,
}

/// A half-open reporting period `[start, end)`.
///
/// Invariant: `start < end`. Deserialization re-validates the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod")]
pub struct Period {
    start: NaiveDate,
    end: NaiveDate,
    granularity: Granularity,
}

#[derive(Deserialize)]
struct RawPeriod {
    start: NaiveDate,
    end: NaiveDate,
    granularity: Granularity,
}

impl TryFrom<RawPeriod> for Period {
    type Error = PeriodError;

    fn try_from(raw: RawPeriod) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end, raw.granularity)
    }
}

impl Period {
    /// Creates a period, validating that `start < end`.
    pub fn new(
        start: NaiveDate,
        end: NaiveDate,
        granularity: Granularity,
    ) -> Result<Self, PeriodError> {
        if start >= end {
            return Err(PeriodError::InvalidRange { start, end });
        }
        Ok(Self {
            start,
            end,
            granularity,
        })
    }

    /// The calendar month `month` of `year`.
    pub fn month(year: i32, month: u32) -> Result<Self, PeriodError> {
        if !(1..=12).contains(&month) {
            return Err(PeriodError::InvalidMonth(month));
        }
        let start = first_of_month(year, month)?;
        let end = add_months(start, 1, year)?;
        Self::new(start, end, Granularity::Month)
    }

    /// Calendar quarter `quarter` (1-4) of `year`.
    pub fn quarter(year: i32, quarter: u32) -> Result<Self, PeriodError> {
        if !(1..=4).contains(&quarter) {
            return Err(PeriodError::InvalidQuarter(quarter));
        }
        let start = first_of_month(year, (quarter - 1) * 3 + 1)?;
        let end = add_months(start, 3, year)?;
        Self::new(start, end, Granularity::Quarter)
    }

    /// Fiscal year `year` starting in `start_month` (1 = calendar year).
    pub fn fiscal_year(year: i32, start_month: u32) -> Result<Self, PeriodError> {
        if !(1..=12).contains(&start_month) {
            return Err(PeriodError::InvalidMonth(start_month));
        }
        let start = first_of_month(year, start_month)?;
        let end = add_months(start, 12, year)?;
        Self::new(start, end, Granularity::Year)
    }

    /// Inclusive start date.
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Exclusive end date.
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Reporting granularity.
    #[must_use]
    pub const fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Last day covered by the period.
    #[must_use]
    pub fn last_day(&self) -> NaiveDate {
        // start < end, so end always has a predecessor >= start.
        self.end.pred_opt().unwrap_or(self.start)
    }

    /// Returns true if `date` falls within `[start, end)`.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    /// Number of calendar months the period touches (at least 1).
    #[must_use]
    pub fn months(&self) -> u32 {
        let first = month_ordinal(self.start);
        let last = month_ordinal(self.last_day());
        u32::try_from(last - first + 1).unwrap_or(1).max(1)
    }

    /// The trailing window of `n` calendar months ending with the period's
    /// last month, clipped so it never starts before the period.
    #[must_use]
    pub fn trailing_months(&self, n: u32) -> Self {
        let last = self.last_day();
        let last_month_start = last.with_day(1).unwrap_or(last);
        let window_start = last_month_start
            .checked_sub_months(Months::new(n.max(1) - 1))
            .unwrap_or(self.start)
            .max(self.start);
        Self {
            start: window_start,
            end: self.end,
            granularity: Granularity::Month,
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// `year * 12 + month0`, used for month arithmetic and grouping.
#[must_use]
pub(crate) fn month_ordinal(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, PeriodError> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or(PeriodError::OutOfRange(year))
}

fn add_months(date: NaiveDate, months: u32, year: i32) -> Result<NaiveDate, PeriodError> {
    date.checked_add_months(Months::new(months))
        .ok_or(PeriodError::OutOfRange(year))
}
