//! Row decoding shared by the era strategies.

use std::sync::LazyLock;

use metrics_core::types::{ABSTRACT, DIGEST, FULL, PDF};
use metrics_core::{MetricsResult, msid_to_doi};
use regex::Regex;
use serde_json::Value;
use tracing::debug;

fn count(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| value.as_str()?.parse().ok())
}

/// Legacy rows are `[dimension, count]` arrays with the count as a string.
pub(crate) fn legacy_row(row: &Value) -> Option<(&str, u64)> {
    let cells = row.as_array()?;
    let key = cells.first()?.as_str()?;
    Some((key, count(cells.get(1)?)?))
}

/// Current rows are `{dimensionValues: [{value}], metricValues: [{value}]}`.
pub(crate) fn current_row(row: &Value) -> Option<(&str, u64)> {
    let key = row
        .get("dimensionValues")?
        .get(0)?
        .get("value")?
        .as_str()?;
    let value = row.get("metricValues")?.get(0)?.get("value")?;
    Some((key, count(value)?))
}

/// Maps an optional page suffix to the metric it counts towards.
pub(crate) fn suffix_metric(suffix: Option<&str>) -> Option<&'static str> {
    match suffix {
        None | Some("full" | "figures" | "executable") => Some(FULL),
        Some("abstract") => Some(ABSTRACT),
        Some("digest") => Some(DIGEST),
        Some(_) => None,
    }
}

/// Classifies an article page path.
///
/// The pattern's first group is the manuscript id, an optional group named
/// `suffix` selects the page type.
pub(crate) fn article_page(pattern: &Regex, path: &str) -> Option<(String, &'static str)> {
    let caps = pattern.captures(path)?;
    let metric = suffix_metric(caps.name("suffix").map(|m| m.as_str()))?;
    Some((msid_to_doi(caps.get(1)?.as_str()), metric))
}

static DIGEST_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/digests/(\d{5,6})(?:\?.*)?$").expect("valid regex"));

/// Classifies a digest page path, `/digests/<id>`.
pub(crate) fn digest_page(path: &str) -> Option<(String, &'static str)> {
    let caps = DIGEST_PATH.captures(path)?;
    Some((msid_to_doi(caps.get(1)?.as_str()), DIGEST))
}

/// Classifies a PDF download label. The first group is the manuscript id.
pub(crate) fn pdf_download(pattern: &Regex, label: &str) -> Option<(String, &'static str)> {
    let caps = pattern.captures(label)?;
    Some((msid_to_doi(caps.get(1)?.as_str()), PDF))
}

/// Decodes rows and sums their counts by identifier and metric.
///
/// Rows that can't be decoded or classified are skipped.
pub(crate) fn tally<C>(
    rows: &[Value],
    decode: fn(&Value) -> Option<(&str, u64)>,
    classify: C,
) -> MetricsResult
where
    C: Fn(&str) -> Option<(String, &'static str)>,
{
    let mut result = MetricsResult::new();
    for row in rows {
        let Some((key, n)) = decode(row) else {
            debug!(%row, "skipping undecodable row");
            continue;
        };
        match classify(key) {
            Some((identifier, metric)) => result.add(identifier, metric, n),
            None => debug!(key, "skipping unrecognised row"),
        }
    }
    result
}
