//! Result types for parsed article metrics.
//!
//! - [`Counts`] - metric name to count for one identifier
//! - [`MetricsResult`] - identifier to [`Counts`] for one range and result type
//! - [`ArticleMetrics`] - views and downloads for one range

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Article DOI prefix.
pub const DOI_PREFIX: &str = "10.7554/eLife.";

/// Page views of the full article text.
pub const FULL: &str = "full";
/// Page views of the abstract.
pub const ABSTRACT: &str = "abstract";
/// Page views of the digest.
pub const DIGEST: &str = "digest";
/// PDF downloads.
pub const PDF: &str = "pdf";

/// Metric name to count.
pub type Counts = BTreeMap<String, u64>;

/// Parsed metrics for one date range and one result type, keyed by identifier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsResult(BTreeMap<String, Counts>);

impl MetricsResult {
    /// Creates an empty result.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds `count` to `metric` for `identifier`, summing with earlier rows.
    pub fn add(&mut self, identifier: impl Into<String>, metric: &str, count: u64) {
        *self
            .0
            .entry(identifier.into())
            .or_default()
            .entry(metric.to_string())
            .or_default() += count;
    }

    /// Returns the counts for an identifier.
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<&Counts> {
        self.0.get(identifier)
    }

    /// Returns a single count, zero when absent.
    #[must_use]
    pub fn count(&self, identifier: &str, metric: &str) -> u64 {
        self.get(identifier)
            .and_then(|counts| counts.get(metric))
            .copied()
            .unwrap_or_default()
    }

    /// Returns the number of identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no identifiers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over identifiers and their counts, in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Counts)> {
        self.0.iter()
    }

    /// Returns an iterator over identifiers.
    pub fn identifiers(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
}

impl FromIterator<(String, String, u64)> for MetricsResult {
    fn from_iter<I: IntoIterator<Item = (String, String, u64)>>(iter: I) -> Self {
        let mut result = Self::new();
        for (identifier, metric, count) in iter {
            result.add(identifier, &metric, count);
        }
        result
    }
}

/// Views and downloads for one date range.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleMetrics {
    /// Page views keyed by identifier.
    pub views: MetricsResult,
    /// PDF downloads keyed by identifier.
    pub downloads: MetricsResult,
}

impl ArticleMetrics {
    /// Identifiers that were downloaded but never viewed.
    pub fn downloads_without_views(&self) -> impl Iterator<Item = &String> {
        self.downloads
            .identifiers()
            .filter(|id| self.views.get(id).is_none())
    }
}

/// Converts a manuscript id such as `"9560"` or `"09560"` to its DOI.
///
/// Ids shorter than five digits are zero-padded.
#[must_use]
pub fn msid_to_doi(msid: &str) -> String {
    let trimmed = msid.trim_start_matches('0');
    let digits = if trimmed.is_empty() { "0" } else { trimmed };
    format!("{DOI_PREFIX}{digits:0>5}")
}
