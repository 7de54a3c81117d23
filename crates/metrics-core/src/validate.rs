//! Date range safety checks.
//!
//! The analytics backend happily answers for ranges it hasn't finished
//! processing, returning partial or empty data. These checks keep such ranges
//! out of queries and out of the cache.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use crate::kind::MetricKind;
use crate::range::DateRange;

// A day is complete once all of it lies more than 24 hours in the past, so
// yesterday never is.
fn yesterday(now: NaiveDateTime) -> NaiveDate {
    now.date() - Duration::days(1)
}

/// Returns true if `range` can be queried without risking partial results.
///
/// A range is rejected when it starts before `inception`, or when it is a
/// single day that is yesterday or later.
#[must_use]
pub fn is_valid_range(range: DateRange, inception: NaiveDate, now: NaiveDateTime) -> bool {
    if range.from_date() < inception {
        debug!(%range, %inception, "date range invalid, it starts earlier than when we started collecting");
        return false;
    }

    if !range.is_daily() {
        return true;
    }

    let to = range.to_date();
    if to >= now.date() {
        debug!(%range, "date range invalid, current/future dates may generate partial or empty results");
        return false;
    }

    if to >= yesterday(now) {
        debug!(%range, "date range invalid, a date less than 24hrs in the past may generate partial or empty results");
        return false;
    }

    true
}

/// Returns true if `range` is safe to query for the given metric.
#[must_use]
pub fn is_valid_for(kind: MetricKind, range: DateRange, now: NaiveDateTime) -> bool {
    is_valid_range(range, kind.inception(), now)
}

/// Drops the ranges that are unsafe to query for `kind`, logging each one.
#[must_use]
pub fn filter_ranges(kind: MetricKind, ranges: &[DateRange], now: NaiveDateTime) -> Vec<DateRange> {
    ranges
        .iter()
        .copied()
        .filter(|range| {
            let valid = is_valid_for(kind, *range, now);
            if !valid {
                warn!(
                    kind = %kind,
                    from = %range.from_date(),
                    to = %range.to_date(),
                    "excluding invalid pair"
                );
            }
            valid
        })
        .collect()
}

/// Returns true if a query ending on `end_date` may be sent.
///
/// The end date must be before yesterday, so the whole range is more than 24
/// hours old.
#[must_use]
pub fn is_queryable_end(end_date: NaiveDate, now: NaiveDateTime) -> bool {
    end_date < yesterday(now)
}

/// Returns true if results ending on `end_date` are complete enough to cache.
///
/// Anything ending today or yesterday is refused.
#[must_use]
pub fn is_cacheable_end(end_date: NaiveDate, today: NaiveDate) -> bool {
    today
        .pred_opt()
        .is_some_and(|yesterday| end_date < yesterday)
}
