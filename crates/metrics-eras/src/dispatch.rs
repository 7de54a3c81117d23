//! Era thresholds and the first-match dispatcher.
//!
//! Rules are checked in order and the first one that applies wins. The
//! order is significant: the versionless-URL month carve-out sits before the
//! general "after versionless URLs" rule so that the month straddling the
//! switch is queried with the newer pattern.

use chrono::NaiveDate;
use metrics_core::DateRange;

use crate::strategy::Strategy;

const fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => panic!("invalid threshold date"),
    }
}

/// When the site moved away from its original host.
pub const SITE_SWITCH: NaiveDate = date(2016, 2, 9);

/// When the latest article version became reachable without a version suffix.
pub const VERSIONLESS_URLS: NaiveDate = date(2016, 5, 5);

/// When the second URL scheme (`/articles/<id>`) went live.
pub const SITE_SWITCH_V2: NaiveDate = date(2017, 6, 1);

/// When the `/executable` article page type was added.
pub const EXECUTABLE_ADDITION: NaiveDate = date(2020, 2, 21);

/// When whitelisted URL parameters started being recorded in page paths.
pub const URL_PARAMS: NaiveDate = date(2021, 11, 30);

/// When the analytics provider's current API replaced the legacy one.
pub const API_SWITCH: NaiveDate = date(2023, 3, 20);

/// One entry of the dispatch table.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Short description used in logs and tests.
    pub name: &'static str,
    /// Whether the rule applies to a range.
    pub applies: fn(&DateRange) -> bool,
    /// Strategy selected when it does.
    pub strategy: Strategy,
}

fn after_api_switch(range: &DateRange) -> bool {
    range.from_date() >= API_SWITCH
}

fn after_url_params(range: &DateRange) -> bool {
    range.from_date() > URL_PARAMS
}

fn after_executable_addition(range: &DateRange) -> bool {
    range.from_date() >= EXECUTABLE_ADDITION
}

fn after_site_switch_v2(range: &DateRange) -> bool {
    range.from_date() >= SITE_SWITCH_V2
}

fn is_versionless_urls_month(range: &DateRange) -> bool {
    range.is_monthly() && *range == DateRange::month_of(VERSIONLESS_URLS)
}

fn after_versionless_urls(range: &DateRange) -> bool {
    range.from_date() > VERSIONLESS_URLS
}

fn after_site_switch(range: &DateRange) -> bool {
    range.from_date() > SITE_SWITCH
}

// The days before the switch are counted with the newer pattern and lost.
fn straddles_site_switch(range: &DateRange) -> bool {
    range.is_monthly() && range.straddles(SITE_SWITCH)
}

fn always(_: &DateRange) -> bool {
    true
}

/// The dispatch table, checked top to bottom.
pub const RULES: [Rule; 9] = [
    Rule {
        name: "api switch",
        applies: after_api_switch,
        strategy: Strategy::V7,
    },
    Rule {
        name: "url params whitelisted",
        applies: after_url_params,
        strategy: Strategy::V6,
    },
    Rule {
        name: "executable page added",
        applies: after_executable_addition,
        strategy: Strategy::V5,
    },
    Rule {
        name: "second url scheme",
        applies: after_site_switch_v2,
        strategy: Strategy::V4,
    },
    Rule {
        name: "versionless urls month",
        applies: is_versionless_urls_month,
        strategy: Strategy::V3,
    },
    Rule {
        name: "versionless urls",
        applies: after_versionless_urls,
        strategy: Strategy::V3,
    },
    Rule {
        name: "site switch",
        applies: after_site_switch,
        strategy: Strategy::V2,
    },
    Rule {
        name: "range straddles site switch",
        applies: straddles_site_switch,
        strategy: Strategy::V2,
    },
    Rule {
        name: "original site",
        applies: always,
        strategy: Strategy::V1,
    },
];

/// Returns the first rule that applies to `range`.
#[must_use]
pub fn matching_rule(range: DateRange) -> &'static Rule {
    RULES
        .iter()
        .find(|rule| (rule.applies)(&range))
        .unwrap_or(&RULES[RULES.len() - 1])
}

/// Returns the strategy to use for querying `range`.
#[must_use]
pub fn pick(range: DateRange) -> Strategy {
    let rule = matching_rule(range);
    tracing::trace!(%range, rule = rule.name, strategy = %rule.strategy, "picked strategy");
    rule.strategy
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn daily(date: NaiveDate) -> DateRange {
        DateRange::daily(date)
    }

    fn day_before(date: NaiveDate) -> NaiveDate {
        date.checked_sub_days(Days::new(1)).unwrap()
    }

    fn day_after(date: NaiveDate) -> NaiveDate {
        date.checked_add_days(Days::new(1)).unwrap()
    }

    #[test]
    fn test_api_switch_boundary_is_inclusive() {
        assert_eq!(pick(daily(day_before(API_SWITCH))), Strategy::V6);
        assert_eq!(pick(daily(API_SWITCH)), Strategy::V7);
        assert_eq!(pick(daily(day_after(API_SWITCH))), Strategy::V7);
    }

    #[test]
    fn test_url_params_boundary_is_exclusive() {
        assert_eq!(pick(daily(URL_PARAMS)), Strategy::V5);
        assert_eq!(pick(daily(day_after(URL_PARAMS))), Strategy::V6);
    }

    #[test]
    fn test_executable_boundary_is_inclusive() {
        assert_eq!(pick(daily(day_before(EXECUTABLE_ADDITION))), Strategy::V4);
        assert_eq!(pick(daily(EXECUTABLE_ADDITION)), Strategy::V5);
    }

    #[test]
    fn test_second_url_scheme_boundary_is_inclusive() {
        assert_eq!(pick(daily(day_before(SITE_SWITCH_V2))), Strategy::V3);
        assert_eq!(pick(daily(SITE_SWITCH_V2)), Strategy::V4);
    }

    #[test]
    fn test_versionless_boundary_is_exclusive() {
        assert_eq!(pick(daily(VERSIONLESS_URLS)), Strategy::V2);
        assert_eq!(pick(daily(day_after(VERSIONLESS_URLS))), Strategy::V3);
    }

    #[test]
    fn test_site_switch_boundary_is_exclusive() {
        assert_eq!(pick(daily(SITE_SWITCH)), Strategy::V1);
        assert_eq!(pick(daily(day_after(SITE_SWITCH))), Strategy::V2);
        assert_eq!(pick(daily(day_before(SITE_SWITCH))), Strategy::V1);
    }

    #[test]
    fn test_versionless_month_carve_out() {
        let may = DateRange::month(2016, 5).unwrap();
        // by start date alone this would be a V2 range
        assert!(!after_versionless_urls(&may));
        assert!(after_site_switch(&may));
        assert_eq!(matching_rule(may).name, "versionless urls month");
        assert_eq!(pick(may), Strategy::V3);

        // a partial month doesn't qualify
        let partial = DateRange::parse("2016-05-01", "2016-05-30").unwrap();
        assert_eq!(pick(partial), Strategy::V2);
    }

    #[test]
    fn test_range_straddling_site_switch() {
        let february = DateRange::month(2016, 2).unwrap();
        assert_eq!(matching_rule(february).name, "range straddles site switch");
        assert_eq!(pick(february), Strategy::V2);

        let january = DateRange::month(2016, 1).unwrap();
        assert_eq!(pick(january), Strategy::V1);
    }

    #[test]
    fn test_monthly_ranges_after_thresholds() {
        assert_eq!(pick(DateRange::month(2017, 6).unwrap()), Strategy::V4);
        assert_eq!(pick(DateRange::month(2021, 12).unwrap()), Strategy::V6);
        assert_eq!(pick(DateRange::month(2023, 4).unwrap()), Strategy::V7);
        // a month starting before the switch stays on the older strategy
        assert_eq!(pick(DateRange::month(2023, 3).unwrap()), Strategy::V6);
    }

    #[test]
    fn test_original_site() {
        assert_eq!(pick(DateRange::month(2014, 6).unwrap()), Strategy::V1);
    }
}
