//! Calendar date ranges.
//!
//! A [`DateRange`] is the unit every query, cache entry and result is keyed
//! by. A range whose two dates are equal is *daily*, anything else is
//! treated as *monthly* (or arbitrary).

use std::fmt;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};

/// Date format used in cache paths and query parameters.
pub const YMD: &str = "%Y-%m-%d";

/// An inclusive range of calendar dates, `from <= to`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting out-of-order dates.
    ///
    /// # Errors
    /// Returns [`MetricsError::InvalidRange`] if `from` is after `to`. This is
    /// a programming error and is never retried.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(MetricsError::InvalidRange {
                from: from.format(YMD).to_string(),
                to: to.format(YMD).to_string(),
            });
        }
        Ok(Self { from, to })
    }

    /// Creates a single-day range.
    #[must_use]
    pub const fn daily(date: NaiveDate) -> Self {
        Self {
            from: date,
            to: date,
        }
    }

    /// Creates the range covering the whole calendar month containing `date`.
    #[must_use]
    pub fn month_of(date: NaiveDate) -> Self {
        let first = date.with_day(1).unwrap_or(date);
        let last = first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(date);
        Self {
            from: first,
            to: last,
        }
    }

    /// Creates the range covering the given calendar month.
    ///
    /// # Errors
    /// Returns [`MetricsError::InvalidRange`] if the year/month does not exist.
    pub fn month(year: i32, month: u32) -> Result<Self> {
        let first =
            NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| MetricsError::InvalidRange {
                from: format!("{year}-{month:02}"),
                to: format!("{year}-{month:02}"),
            })?;
        Ok(Self::month_of(first))
    }

    /// Parses a range from two `YYYY-MM-DD` strings.
    ///
    /// # Errors
    /// Returns [`MetricsError::Parse`] for malformed dates and
    /// [`MetricsError::InvalidRange`] for out-of-order ones.
    pub fn parse(from: &str, to: &str) -> Result<Self> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s, YMD)
                .map_err(|e| MetricsError::Parse(format!("bad date {s:?}: {e}")))
        };
        Self::new(parse(from)?, parse(to)?)
    }

    /// First day of the range.
    #[must_use]
    pub const fn from_date(&self) -> NaiveDate {
        self.from
    }

    /// Last day of the range.
    #[must_use]
    pub const fn to_date(&self) -> NaiveDate {
        self.to
    }

    /// Returns true if the range covers a single day.
    #[must_use]
    pub fn is_daily(&self) -> bool {
        self.from == self.to
    }

    /// Returns true if the range covers more than one day.
    #[must_use]
    pub fn is_monthly(&self) -> bool {
        !self.is_daily()
    }

    /// Returns true if `date` falls strictly between the two ends.
    #[must_use]
    pub fn straddles(&self, date: NaiveDate) -> bool {
        self.from < date && date < self.to
    }

    /// Splits the range into one daily range per day.
    #[must_use]
    pub fn days(&self) -> Vec<Self> {
        self.from
            .iter_days()
            .take_while(|day| *day <= self.to)
            .map(Self::daily)
            .collect()
    }

    /// Splits the range into whole calendar months, one per month touched.
    ///
    /// The first and last months are widened to their full extent.
    #[must_use]
    pub fn months(&self) -> Vec<Self> {
        let mut months = Vec::new();
        let mut month = Self::month_of(self.from);
        while month.from <= self.to {
            months.push(month);
            match month.to.succ_opt() {
                Some(next) => month = Self::month_of(next),
                None => break,
            }
        }
        months
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_daily() {
            write!(f, "{}", self.to.format(YMD))
        } else {
            write!(f, "{}_{}", self.from.format(YMD), self.to.format(YMD))
        }
    }
}
