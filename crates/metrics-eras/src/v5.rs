//! Adds the `/executable` article page, counted as a full text view.

use std::sync::LazyLock;

use metrics_core::{DateRange, LegacyQuery, MetricsResult, Query};
use regex::Regex;
use serde_json::Value;

use crate::parse::{article_page, digest_page, legacy_row, tally};

static VIEWS_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/articles/(\d{5,6})(?:v\d+)?(?:/(?<suffix>figures|executable))?$")
        .expect("valid regex")
});

const VIEWS_FILTERS: &str = concat!(
    r"ga:pagePath=~^/articles/[0-9]+(v[0-9]+)?(/figures|/executable)?$",
    ",",
    r"ga:pagePath=~^/digests/[0-9]+$",
);

pub(crate) fn views_query(table_id: &str, range: DateRange) -> Query {
    Query::Legacy(
        LegacyQuery::new(table_id, range, "ga:pageviews", "ga:pagePath", VIEWS_FILTERS)
            .with_sort("-ga:pageviews"),
    )
}

pub(crate) fn parse_views(rows: &[Value]) -> MetricsResult {
    tally(rows, legacy_row, |path| {
        article_page(&VIEWS_PATH, path).or_else(|| digest_page(path))
    })
}
