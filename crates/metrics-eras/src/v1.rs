//! The original site, `/content/<volume>/e<id>` paths.
//!
//! Downloads are tracked as `Download`/`PDF` events labelled with the file name
//! and are shared by the first three eras.

use std::sync::LazyLock;

use metrics_core::{DateRange, LegacyQuery, MetricsResult, Query};
use regex::Regex;
use serde_json::Value;

use crate::parse::{article_page, legacy_row, pdf_download, tally};

static VIEWS_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/content/\d+/e(\d{5})(?:\.(?<suffix>abstract|full|digest))?$")
        .expect("valid regex")
});

static PDF_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^elife-(\d{5})-v\d+\.pdf$").expect("valid regex"));

pub(crate) const VIEWS_FILTERS: &str = concat!(
    r"ga:pagePath=~^/content/[0-9]+/e[0-9]+$",
    ",",
    r"ga:pagePath=~^/content/[0-9]+/e[0-9]+\.abstract$",
    ",",
    r"ga:pagePath=~^/content/[0-9]+/e[0-9]+\.full$",
    ",",
    r"ga:pagePath=~^/content/[0-9]+/e[0-9]+\.digest$",
);

pub(crate) const DOWNLOADS_FILTERS: &str = "ga:eventCategory==Download;ga:eventAction==PDF";

pub(crate) fn views_query(table_id: &str, range: DateRange) -> Query {
    Query::Legacy(
        LegacyQuery::new(table_id, range, "ga:pageviews", "ga:pagePath", VIEWS_FILTERS)
            .with_sort("-ga:pageviews"),
    )
}

pub(crate) fn downloads_query(table_id: &str, range: DateRange) -> Query {
    Query::Legacy(
        LegacyQuery::new(
            table_id,
            range,
            "ga:totalEvents",
            "ga:eventLabel",
            DOWNLOADS_FILTERS,
        )
        .with_sort("-ga:totalEvents"),
    )
}

pub(crate) fn parse_views(rows: &[Value]) -> MetricsResult {
    tally(rows, legacy_row, |path| article_page(&VIEWS_PATH, path))
}

pub(crate) fn parse_downloads(rows: &[Value]) -> MetricsResult {
    tally(rows, legacy_row, |label| pdf_download(&PDF_LABEL, label))
}
