//! The provider's current data API.
//!
//! Page views come from `pagePathPlusQueryString`, downloads from
//! `file_download` events keyed by link URL. Paths and URLs follow the same
//! patterns as the previous two eras.

use metrics_core::{DateRange, MetricsResult, Query, ReportRequest};
use serde_json::{Value, json};

use crate::parse::{article_page, current_row, pdf_download, tally};
use crate::{v4, v6};

pub(crate) fn views_query(range: DateRange) -> Query {
    Query::Current(
        ReportRequest::new(range, &["pagePathPlusQueryString"], &["screenPageViews"]).with_filter(
            json!({
                "filter": {
                    "fieldName": "pagePathPlusQueryString",
                    "stringFilter": {"matchType": "BEGINS_WITH", "value": "/articles/"}
                }
            }),
        ),
    )
}

pub(crate) fn downloads_query(range: DateRange) -> Query {
    Query::Current(
        ReportRequest::new(range, &["linkUrl"], &["eventCount"]).with_filter(json!({
            "filter": {
                "fieldName": "eventName",
                "stringFilter": {"matchType": "EXACT", "value": "file_download"}
            }
        })),
    )
}

pub(crate) fn parse_views(rows: &[Value]) -> MetricsResult {
    tally(rows, current_row, |path| article_page(&v6::VIEWS_PATH, path))
}

pub(crate) fn parse_downloads(rows: &[Value]) -> MetricsResult {
    tally(rows, current_row, |url| pdf_download(&v4::PDF_URL, url))
}
