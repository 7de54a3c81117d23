//! The second URL scheme, `/articles/<id>` with an optional figures page.
//!
//! PDF downloads are `Download`/`Article` events labelled with the CDN URL of
//! the file. The next two eras count downloads the same way.

use std::sync::LazyLock;

use metrics_core::{DateRange, LegacyQuery, MetricsResult, Query};
use regex::Regex;
use serde_json::Value;

use crate::parse::{article_page, digest_page, legacy_row, pdf_download, tally};

static VIEWS_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/articles/(\d{5,6})(?:v\d+)?(?:/(?<suffix>figures))?$").expect("valid regex")
});

pub(crate) static PDF_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/articles/(\d{5,6})/elife-\d{5,6}-v\d+\.pdf(?:\?.*)?$").expect("valid regex")
});

const VIEWS_FILTERS: &str = concat!(
    r"ga:pagePath=~^/articles/[0-9]+(v[0-9]+)?(/figures)?$",
    ",",
    r"ga:pagePath=~^/digests/[0-9]+$",
);

const DOWNLOADS_FILTERS: &str = "ga:eventCategory==Download;ga:eventAction==Article";

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
    tally(rows, legacy_row, |path| {
        article_page(&VIEWS_PATH, path).or_else(|| digest_page(path))
    })
}

pub(crate) fn parse_downloads(rows: &[Value]) -> MetricsResult {
    tally(rows, legacy_row, |label| pdf_download(&PDF_URL, label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_core::types::{ABSTRACT, DIGEST, FULL, PDF};
    use serde_json::json;

    #[test]
    fn test_parse_views() {
        let rows = vec![
            json!(["/articles/09560", "10"]),
            json!(["/articles/09560v2", "2"]),
            json!(["/articles/09560/figures", "3"]),
            json!(["/articles/100123", "1"]),
            json!(["/articles/09560/executable", "50"]),
            json!(["/articles/09560?utm_source=x", "50"]),
            json!(["/digests/09560", "4"]),
        ];
        let result = parse_views(&rows);
        assert_eq!(result.count("10.7554/eLife.09560", FULL), 15);
        assert_eq!(result.count("10.7554/eLife.09560", DIGEST), 4);
        assert_eq!(result.count("10.7554/eLife.09560", ABSTRACT), 0);
        assert_eq!(result.count("10.7554/eLife.100123", FULL), 1);
    }

    #[test]
    fn test_parse_downloads() {
        let rows = vec![
            json!(["https://cdn.elifesciences.org/articles/09560/elife-09560-v1.pdf", "5"]),
            json!([
                "https://cdn.elifesciences.org/articles/09560/elife-09560-v2.pdf?canonicalUri=x",
                "1"
            ]),
            json!([
                "https://cdn.elifesciences.org/articles/09560/elife-09560-figures-v1.pdf",
                "8"
            ]),
        ];
        let result = parse_downloads(&rows);
        assert_eq!(result.count("10.7554/eLife.09560", PDF), 6);
    }

    #[test]
    fn test_downloads_query_filters_article_events() {
        let range = DateRange::month(2018, 1).unwrap();
        let Query::Legacy(q) = downloads_query("12345", range) else {
            panic!("expected a legacy query");
        };
        assert_eq!(q.filters, DOWNLOADS_FILTERS);
        assert_eq!(q.dimensions, "ga:eventLabel");
    }
}
