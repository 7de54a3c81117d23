//! Tabular view of collected metrics.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use metrics_core::types::{ABSTRACT, DIGEST, FULL, PDF};
use metrics_core::{MetricsError, Result};
use polars::prelude::*;

use crate::client::RangeMetrics;

/// Column names, in order.
pub const COLUMNS: [&str; 7] = ["from", "to", "identifier", FULL, ABSTRACT, DIGEST, PDF];

/// Flattens per-range metrics into one row per range and identifier.
///
/// Identifiers seen only in downloads still get a row, with zero views.
/// Rows are ordered by range, then identifier.
///
/// # Errors
/// Returns [`MetricsError::Other`] if the frame can't be built.
pub fn metrics_frame(results: &RangeMetrics) -> Result<DataFrame> {
    let mut from: Vec<NaiveDate> = Vec::new();
    let mut to: Vec<NaiveDate> = Vec::new();
    let mut identifiers: Vec<String> = Vec::new();
    let mut full = Vec::new();
    let mut abstracts = Vec::new();
    let mut digests = Vec::new();
    let mut pdfs = Vec::new();

    for (range, metrics) in results {
        let ids: BTreeSet<&String> = metrics
            .views
            .identifiers()
            .chain(metrics.downloads.identifiers())
            .collect();
        for id in ids {
            from.push(range.from_date());
            to.push(range.to_date());
            identifiers.push(id.clone());
            full.push(metrics.views.count(id, FULL));
            abstracts.push(metrics.views.count(id, ABSTRACT));
            digests.push(metrics.views.count(id, DIGEST));
            pdfs.push(metrics.downloads.count(id, PDF));
        }
    }

    let df = DataFrame::new(vec![
        Column::new("from".into(), from),
        Column::new("to".into(), to),
        Column::new("identifier".into(), identifiers),
        Column::new(FULL.into(), full),
        Column::new(ABSTRACT.into(), abstracts),
        Column::new(DIGEST.into(), digests),
        Column::new(PDF.into(), pdfs),
    ])
    .map_err(|e| MetricsError::Other(e.to_string()))?;

    df.lazy()
        .sort(["from", "to", "identifier"], Default::default())
        .collect()
        .map_err(|e| MetricsError::Other(e.to_string()))
}
