//! Analytics queries and raw reports.
//!
//! Two generations of the analytics API are in play:
//!
//! - [`LegacyQuery`] - the older core reporting API, keyed by a table id and
//!   paginated with a 1-based `start_index`
//! - [`ReportRequest`] - the current data API, keyed by a property and
//!   paginated with a 0-based `offset`
//!
//! Both are wrapped by [`Query`]. Whatever comes back is kept as a raw JSON
//! [`Report`] so it can be cached verbatim.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{MetricsError, Result};
use crate::range::{DateRange, YMD};

/// Default (and maximum) number of rows requested per page.
pub const MAX_RESULTS: u32 = 10_000;

/// Top-level response keys that identify the account and are never cached.
pub const SANITISE_KEYS: [&str; 3] = ["profileInfo", "id", "selfLink"];

/// Which generation of the analytics API a query or report belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApiVersion {
    /// The older core reporting API.
    Legacy,
    /// The current data API.
    Current,
}

/// Guesses the API generation of a raw query mapping.
///
/// Legacy queries carry a `start_date`; current ones use `dateRanges`.
#[must_use]
pub fn guess_version_from_query(query: &Value) -> ApiVersion {
    if query.get("start_date").is_some() {
        ApiVersion::Legacy
    } else {
        ApiVersion::Current
    }
}

/// Guesses the API generation of a raw response.
///
/// Only legacy responses echo the `query` back.
#[must_use]
pub fn guess_version_from_response(response: &Value) -> ApiVersion {
    if response.get("query").is_some() {
        ApiVersion::Legacy
    } else {
        ApiVersion::Current
    }
}

/// Prefixes a bare table id with `ga:` if it isn't already.
#[must_use]
pub fn normalize_table_id(table_id: &str) -> String {
    if table_id.starts_with("ga:") {
        table_id.to_string()
    } else {
        format!("ga:{table_id}")
    }
}

/// A query against the legacy core reporting API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyQuery {
    /// Table id, always `ga:` prefixed.
    pub ids: String,
    /// First day of the report.
    pub start_date: NaiveDate,
    /// Last day of the report.
    pub end_date: NaiveDate,
    /// Comma separated metric names.
    pub metrics: String,
    /// Comma separated dimension names.
    pub dimensions: String,
    /// Sort expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    /// Filter expression (`,` is OR, `;` is AND).
    pub filters: String,
    /// Rows per page.
    pub max_results: u32,
    /// 1-based index of the first row to return.
    pub start_index: u32,
}

impl LegacyQuery {
    /// Creates a query for the first page of results.
    #[must_use]
    pub fn new(
        table_id: &str,
        range: DateRange,
        metrics: impl Into<String>,
        dimensions: impl Into<String>,
        filters: impl Into<String>,
    ) -> Self {
        Self {
            ids: normalize_table_id(table_id),
            start_date: range.from_date(),
            end_date: range.to_date(),
            metrics: metrics.into(),
            dimensions: dimensions.into(),
            sort: None,
            filters: filters.into(),
            max_results: MAX_RESULTS,
            start_index: 1,
        }
    }

    /// Sets the sort expression.
    #[must_use]
    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Request parameters as the reporting API names them.
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("ids", normalize_table_id(&self.ids)),
            ("start-date", self.start_date.format(YMD).to_string()),
            ("end-date", self.end_date.format(YMD).to_string()),
            ("metrics", self.metrics.clone()),
            ("dimensions", self.dimensions.clone()),
            ("filters", self.filters.clone()),
            ("max-results", self.max_results.to_string()),
            ("start-index", self.start_index.to_string()),
        ];
        if let Some(sort) = &self.sort {
            params.push(("sort", sort.clone()));
        }
        params
    }
}

/// A date range as the current data API spells it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDateRange {
    /// First day of the report.
    pub start_date: NaiveDate,
    /// Last day of the report.
    pub end_date: NaiveDate,
}

/// A named dimension or metric.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// The API name.
    pub name: String,
}

impl Field {
    /// Creates a field with the given API name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A `runReport` request against the current data API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    /// Exactly one range is used.
    pub date_ranges: Vec<ReportDateRange>,
    /// Dimensions to group by.
    pub dimensions: Vec<Field>,
    /// Metrics to report.
    pub metrics: Vec<Field>,
    /// Filter expression, passed through as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension_filter: Option<Value>,
    /// Rows per page.
    pub limit: u32,
    /// 0-based index of the first row to return.
    pub offset: u32,
}

impl ReportRequest {
    /// Creates a request for the first page of results.
    #[must_use]
    pub fn new(range: DateRange, dimensions: &[&str], metrics: &[&str]) -> Self {
        Self {
            date_ranges: vec![ReportDateRange {
                start_date: range.from_date(),
                end_date: range.to_date(),
            }],
            dimensions: dimensions.iter().copied().map(Field::new).collect(),
            metrics: metrics.iter().copied().map(Field::new).collect(),
            dimension_filter: None,
            limit: MAX_RESULTS,
            offset: 0,
        }
    }

    /// Sets the dimension filter.
    #[must_use]
    pub fn with_filter(mut self, filter: Value) -> Self {
        self.dimension_filter = Some(filter);
        self
    }
}

/// A query for either API generation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Query {
    /// Core reporting API query.
    Legacy(LegacyQuery),
    /// Data API `runReport` request.
    Current(ReportRequest),
}

impl Query {
    /// Builds a query from a raw JSON mapping, picking the generation by its keys.
    ///
    /// # Errors
    /// Returns [`MetricsError::Parse`] if the mapping doesn't fit the guessed shape.
    pub fn from_value(value: Value) -> Result<Self> {
        match guess_version_from_query(&value) {
            ApiVersion::Legacy => Ok(Self::Legacy(serde_json::from_value(value)?)),
            ApiVersion::Current => Ok(Self::Current(serde_json::from_value(value)?)),
        }
    }

    /// The API generation this query targets.
    #[must_use]
    pub const fn version(&self) -> ApiVersion {
        match self {
            Self::Legacy(_) => ApiVersion::Legacy,
            Self::Current(_) => ApiVersion::Current,
        }
    }

    /// The range this query covers.
    ///
    /// # Errors
    /// Returns [`MetricsError::InvalidQuery`] if a data API request carries no range.
    pub fn range(&self) -> Result<DateRange> {
        let (from, to) = match self {
            Self::Legacy(q) => (q.start_date, q.end_date),
            Self::Current(q) => {
                let range = q.date_ranges.first().ok_or_else(|| {
                    MetricsError::InvalidQuery("report request has no date range".to_string())
                })?;
                (range.start_date, range.end_date)
            }
        };
        DateRange::new(from, to)
    }

    /// Rows requested per page.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        match self {
            Self::Legacy(q) => q.max_results,
            Self::Current(q) => q.limit,
        }
    }

    /// Points the query at the page starting at the 1-based `start_index`.
    pub fn set_page(&mut self, start_index: u32, page_size: u32) {
        match self {
            Self::Legacy(q) => {
                q.start_index = start_index;
                q.max_results = page_size;
            }
            Self::Current(q) => {
                q.offset = start_index.saturating_sub(1);
                q.limit = page_size;
            }
        }
    }

    /// A short description for log lines.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Legacy(q) => q.filters.clone(),
            Self::Current(q) => q
                .dimension_filter
                .as_ref()
                .map_or_else(String::new, Value::to_string),
        }
    }
}

/// A raw analytics response, kept as a JSON object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report(Map<String, Value>);

impl Report {
    /// Wraps a JSON object.
    #[must_use]
    pub const fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Wraps a JSON value, which must be an object.
    ///
    /// # Errors
    /// Returns [`MetricsError::Parse`] for anything but an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(MetricsError::Parse(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }

    /// The API generation that produced this report.
    #[must_use]
    pub fn version(&self) -> ApiVersion {
        if self.0.contains_key("query") {
            ApiVersion::Legacy
        } else {
            ApiVersion::Current
        }
    }

    /// The result rows, empty when the report has none.
    #[must_use]
    pub fn rows(&self) -> &[Value] {
        self.0
            .get("rows")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Removes and returns the result rows.
    pub fn take_rows(&mut self) -> Vec<Value> {
        match self.0.remove("rows") {
            Some(Value::Array(rows)) => rows,
            _ => Vec::new(),
        }
    }

    /// Replaces the result rows.
    pub fn set_rows(&mut self, rows: Vec<Value>) {
        self.0.insert("rows".to_string(), Value::Array(rows));
    }

    /// Total number of rows the backend reports across all pages.
    ///
    /// Legacy reports call this `totalResults`, current ones `rowCount`
    /// (omitted when zero).
    #[must_use]
    pub fn total_results(&self) -> u64 {
        ["totalResults", "rowCount"]
            .iter()
            .find_map(|key| self.0.get(*key))
            .and_then(|v| v.as_u64().or_else(|| v.as_str()?.parse().ok()))
            .unwrap_or_default()
    }

    /// Number of pages fetched, once the paginator has run.
    #[must_use]
    pub fn total_pages(&self) -> Option<u64> {
        self.0.get("totalPages").and_then(Value::as_u64)
    }

    /// Records the number of pages fetched.
    pub fn set_total_pages(&mut self, pages: u64) {
        self.0.insert("totalPages".to_string(), Value::from(pages));
    }

    /// Strips account identifiers and self links.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        for key in SANITISE_KEYS {
            self.0.remove(key);
        }
        if let Some(Value::Object(query)) = self.0.get_mut("query") {
            query.remove("ids");
        }
        self
    }

    /// Borrows the underlying JSON object.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Returns the underlying JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn january() -> DateRange {
        DateRange::month(2020, 1).unwrap()
    }

    #[test]
    fn test_table_id_normalized() {
        let q = LegacyQuery::new("12345", january(), "ga:pageviews", "ga:pagePath", "");
        assert_eq!(q.ids, "ga:12345");
        let q = LegacyQuery::new("ga:12345", january(), "ga:pageviews", "ga:pagePath", "");
        assert_eq!(q.ids, "ga:12345");
    }

    #[test]
    fn test_legacy_params_use_api_names() {
        let q = LegacyQuery::new("12345", january(), "ga:pageviews", "ga:pagePath", "f")
            .with_sort("-ga:pageviews");
        let params = q.params();
        assert!(params.contains(&("start-date", "2020-01-01".to_string())));
        assert!(params.contains(&("end-date", "2020-01-31".to_string())));
        assert!(params.contains(&("start-index", "1".to_string())));
        assert!(params.contains(&("max-results", "10000".to_string())));
        assert!(params.contains(&("sort", "-ga:pageviews".to_string())));
    }

    #[test]
    fn test_guess_version() {
        assert_eq!(
            guess_version_from_query(&json!({"start_date": "2020-01-01"})),
            ApiVersion::Legacy
        );
        assert_eq!(
            guess_version_from_query(&json!({"dateRanges": []})),
            ApiVersion::Current
        );
        assert_eq!(
            guess_version_from_response(&json!({"query": {}, "rows": []})),
            ApiVersion::Legacy
        );
        assert_eq!(
            guess_version_from_response(&json!({"rows": []})),
            ApiVersion::Current
        );
    }

    #[test]
    fn test_query_from_value() {
        let legacy = LegacyQuery::new("1", january(), "m", "d", "f");
        let value = serde_json::to_value(&legacy).unwrap();
        assert_eq!(
            Query::from_value(value).unwrap(),
            Query::Legacy(legacy.clone())
        );

        let current = ReportRequest::new(january(), &["pagePath"], &["screenPageViews"]);
        let value = serde_json::to_value(&current).unwrap();
        assert!(value.get("dateRanges").is_some());
        assert_eq!(Query::from_value(value).unwrap(), Query::Current(current));
    }

    #[test]
    fn test_set_page() {
        let mut legacy = Query::Legacy(LegacyQuery::new("1", january(), "m", "d", "f"));
        legacy.set_page(10_001, 10_000);
        match &legacy {
            Query::Legacy(q) => assert_eq!(q.start_index, 10_001),
            Query::Current(_) => unreachable!(),
        }

        let mut current = Query::Current(ReportRequest::new(january(), &["d"], &["m"]));
        current.set_page(10_001, 10_000);
        match &current {
            Query::Current(q) => assert_eq!(q.offset, 10_000),
            Query::Legacy(_) => unreachable!(),
        }
        assert_eq!(current.range().unwrap(), january());
    }

    #[test]
    fn test_report_totals() {
        let legacy = Report::from_value(json!({"query": {}, "totalResults": 25000})).unwrap();
        assert_eq!(legacy.total_results(), 25000);
        let current = Report::from_value(json!({"rowCount": 12})).unwrap();
        assert_eq!(current.total_results(), 12);
        let empty = Report::from_value(json!({"kind": "analyticsData#runReport"})).unwrap();
        assert_eq!(empty.total_results(), 0);
        assert!(empty.rows().is_empty());
    }

    #[test]
    fn test_sanitized() {
        let report = Report::from_value(json!({
            "id": "https://www.googleapis.com/analytics/v3/data/ga?ids=ga:1",
            "selfLink": "https://www.googleapis.com/analytics/v3/data/ga?ids=ga:1",
            "profileInfo": {"accountId": "1"},
            "query": {"ids": "ga:1", "start-date": "2020-01-01"},
            "rows": [["/articles/09560", "10"]]
        }))
        .unwrap()
        .sanitized();
        let map = report.as_map();
        assert!(!map.contains_key("id"));
        assert!(!map.contains_key("selfLink"));
        assert!(!map.contains_key("profileInfo"));
        assert!(map["query"].get("ids").is_none());
        assert_eq!(map["query"]["start-date"], "2020-01-01");
        assert_eq!(report.rows().len(), 1);
    }

    #[test]
    fn test_report_must_be_object() {
        assert!(Report::from_value(json!([1, 2, 3])).is_err());
    }
}
