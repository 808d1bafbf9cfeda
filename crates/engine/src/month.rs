//! Calendar months and inclusive month ranges.
//!
//! Every summary row is keyed by a [`YearMonth`]; rebuild triggers are
//! expressed either as a single month or as a [`MonthRange`].

use std::{fmt, str::FromStr};

use chrono::{Datelike, Month, Months, NaiveDate, Utc};

use crate::{EngineError, ResultEngine};

/// A calendar month. `month` is always in `1..=12`.
///
/// Ordering is chronological (year first, then month).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> ResultEngine<Self> {
        if !(1..=12).contains(&month) {
            return Err(EngineError::InvalidMonth(format!(
                "month must be between 1 and 12, got {month}"
            )));
        }
        let candidate = Self { year, month };
        // The month after must exist too, or the month has no end bound.
        let supported = NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|first| first.checked_add_months(Months::new(1)))
            .is_some();
        if !supported {
            return Err(EngineError::InvalidMonth(format!(
                "{candidate} is outside the supported calendar"
            )));
        }
        Ok(candidate)
    }

    /// The month containing `date`; the day is discarded.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The current month in UTC.
    pub fn current() -> Self {
        Self::from_date(Utc::now().date_naive())
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    /// First day of the month.
    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// The following calendar month.
    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// `count` months earlier.
    pub fn minus_months(self, count: u32) -> Self {
        let index = i64::from(self.year) * 12 + i64::from(self.month - 1) - i64::from(count);
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    /// Half-open date bounds `[first day, first day of next month)`.
    pub fn date_bounds(self) -> (NaiveDate, NaiveDate) {
        let start = self.first_day();
        let end = start
            .checked_add_months(Months::new(1))
            .unwrap_or(NaiveDate::MAX);
        (start, end)
    }

    /// Short chart label, e.g. `"Jan 2025"`.
    pub fn short_label(self) -> String {
        let name = self.month_name();
        format!("{} {}", &name[..3], self.year)
    }

    /// Long label, e.g. `"January 2025"`.
    pub fn long_label(self) -> String {
        format!("{} {}", self.month_name(), self.year)
    }

    fn month_name(self) -> &'static str {
        u8::try_from(self.month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .map_or("???", |m| m.name())
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl From<NaiveDate> for YearMonth {
    fn from(value: NaiveDate) -> Self {
        Self::from_date(value)
    }
}

impl FromStr for YearMonth {
    type Err = EngineError;

    /// Parses `YYYY-MM`; `YYYY-MM-DD` is accepted too and the day is ignored
    /// once validated.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid =
            || EngineError::InvalidMonth(format!("invalid month '{trimmed}': expected YYYY-MM"));

        let parts: Vec<&str> = trimmed.split('-').collect();
        if !(2..=3).contains(&parts.len()) {
            return Err(invalid());
        }
        let all_digits = |p: &str| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit());
        if parts[0].len() != 4 || !parts.iter().all(|p| all_digits(p)) {
            return Err(invalid());
        }
        if parts[1].len() > 2 {
            return Err(invalid());
        }

        let year: i32 = parts[0].parse().map_err(|_| invalid())?;
        let month: u32 = parts[1].parse().map_err(|_| invalid())?;
        if let Some(day) = parts.get(2) {
            let day: u32 = day.parse().map_err(|_| invalid())?;
            NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;
        }

        Self::new(year, month).map_err(|_| invalid())
    }
}

/// An inclusive span of calendar months with `from <= to`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonthRange {
    from: YearMonth,
    to: YearMonth,
}

impl MonthRange {
    pub fn new(from: YearMonth, to: YearMonth) -> ResultEngine<Self> {
        if from > to {
            return Err(EngineError::InvalidRange(format!(
                "'from' ({from}) must be before or equal to 'to' ({to})"
            )));
        }
        Ok(Self { from, to })
    }

    pub fn from(&self) -> YearMonth {
        self.from
    }

    pub fn to(&self) -> YearMonth {
        self.to
    }

    /// Number of months in the range (both ends included).
    pub fn len(&self) -> usize {
        let span = (i64::from(self.to.year) - i64::from(self.from.year)) * 12
            + i64::from(self.to.month)
            - i64::from(self.from.month);
        span as usize + 1
    }

    /// Walks from `from` to `to`, one calendar month at a time.
    pub fn iter(&self) -> impl Iterator<Item = YearMonth> + use<> {
        let end = self.to;
        std::iter::successors(Some(self.from), move |current| {
            let next = current.next();
            (next <= end).then_some(next)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    #[test]
    fn rejects_month_out_of_range() {
        assert!(YearMonth::new(2025, 0).is_err());
        assert!(YearMonth::new(2025, 13).is_err());
        assert!(YearMonth::new(2025, 12).is_ok());
    }

    #[test]
    fn rejects_the_last_representable_month() {
        let last = NaiveDate::MAX;
        assert!(matches!(
            YearMonth::new(last.year(), last.month()),
            Err(EngineError::InvalidMonth(_))
        ));
        assert!(YearMonth::new(i32::MAX, 12).is_err());

        let before_last = YearMonth::new(last.year(), last.month() - 1).unwrap();
        let (start, end) = before_last.date_bounds();
        assert!(start < end);
    }

    #[test]
    fn parse_accepts_month_and_date_forms() {
        assert_eq!("2025-01".parse::<YearMonth>().unwrap(), ym(2025, 1));
        assert_eq!("2025-1".parse::<YearMonth>().unwrap(), ym(2025, 1));
        assert_eq!("2025-01-15".parse::<YearMonth>().unwrap(), ym(2025, 1));
        assert_eq!(" 2025-12 ".parse::<YearMonth>().unwrap(), ym(2025, 12));
    }

    #[test]
    fn parse_rejects_garbage() {
        for input in ["", "2025", "2025-13", "25-01", "2025/01", "2025-01-32", "abcd-01", "2025-001"] {
            let err = input.parse::<YearMonth>().unwrap_err();
            assert!(
                matches!(err, EngineError::InvalidMonth(ref msg) if msg.contains(input.trim())),
                "unexpected error for {input:?}: {err}"
            );
        }
    }

    #[test]
    fn next_rolls_over_year() {
        assert_eq!(ym(2024, 12).next(), ym(2025, 1));
        assert_eq!(ym(2025, 6).next(), ym(2025, 7));
    }

    #[test]
    fn minus_months_crosses_years() {
        assert_eq!(ym(2025, 3).minus_months(12), ym(2024, 3));
        assert_eq!(ym(2025, 3).minus_months(3), ym(2024, 12));
        assert_eq!(ym(2025, 3).minus_months(0), ym(2025, 3));
        assert_eq!(ym(2025, 1).minus_months(25), ym(2022, 12));
    }

    #[test]
    fn date_bounds_are_half_open() {
        let (start, end) = ym(2024, 2).date_bounds();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn labels() {
        assert_eq!(ym(2025, 1).short_label(), "Jan 2025");
        assert_eq!(ym(2025, 9).long_label(), "September 2025");
        assert_eq!(ym(2025, 9).to_string(), "2025-09");
    }

    #[test]
    fn range_rejects_reversed_bounds() {
        let err = MonthRange::new(ym(2025, 3), ym(2025, 1)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRange(_)));
    }

    #[test]
    fn range_iterates_inclusively() {
        let range = MonthRange::new(ym(2024, 11), ym(2025, 2)).unwrap();
        let months: Vec<YearMonth> = range.iter().collect();
        assert_eq!(
            months,
            vec![ym(2024, 11), ym(2024, 12), ym(2025, 1), ym(2025, 2)]
        );
        assert_eq!(range.len(), 4);
    }

    #[test]
    fn single_month_range() {
        let range = MonthRange::new(ym(2025, 5), ym(2025, 5)).unwrap();
        assert_eq!(range.iter().count(), 1);
        assert_eq!(range.len(), 1);
    }
}
