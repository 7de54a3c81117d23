//! After the first host switch article paths carry a version, `e<id>v<n>`.

use std::sync::LazyLock;

use metrics_core::{DateRange, LegacyQuery, MetricsResult, Query};
use regex::Regex;
use serde_json::Value;

use crate::parse::{article_page, legacy_row, tally};

static VIEWS_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/content/\d+/e(\d{5})v\d+(?:\.(?<suffix>abstract|full|digest))?$")
        .expect("valid regex")
});

const VIEWS_FILTERS: &str = concat!(
    r"ga:pagePath=~^/content/[0-9]+/e[0-9]+v[0-9]+$",
    ",",
    r"ga:pagePath=~^/content/[0-9]+/e[0-9]+v[0-9]+\.abstract$",
    ",",
    r"ga:pagePath=~^/content/[0-9]+/e[0-9]+v[0-9]+\.full$",
    ",",
    r"ga:pagePath=~^/content/[0-9]+/e[0-9]+v[0-9]+\.digest$",
);

pub(crate) fn views_query(table_id: &str, range: DateRange) -> Query {
    Query::Legacy(
        LegacyQuery::new(table_id, range, "ga:pageviews", "ga:pagePath", VIEWS_FILTERS)
            .with_sort("-ga:pageviews"),
    )
}

pub(crate) fn parse_views(rows: &[Value]) -> MetricsResult {
    tally(rows, legacy_row, |path| article_page(&VIEWS_PATH, path))
}
