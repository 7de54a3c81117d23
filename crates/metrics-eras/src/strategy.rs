//! The closed set of era strategies.

use std::fmt;

use metrics_core::{ApiVersion, DateRange, MetricKind, MetricsResult, Query};
use serde_json::Value;

use crate::{v1, v2, v3, v4, v5, v6, v7};

/// A query shape and row format for one historical era.
///
/// Variants are ordered oldest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strategy {
    /// Original site, before the first host switch.
    V1,
    /// First URL scheme change, versioned article paths.
    V2,
    /// Versionless paths for the latest article version.
    V3,
    /// Second URL scheme, `/articles/<id>`.
    V4,
    /// Adds the `/executable` article page.
    V5,
    /// Page paths carry whitelisted URL parameters.
    V6,
    /// The provider's current data API.
    V7,
}

impl Strategy {
    /// Every strategy, oldest first.
    pub const ALL: [Self; 7] = [
        Self::V1,
        Self::V2,
        Self::V3,
        Self::V4,
        Self::V5,
        Self::V6,
        Self::V7,
    ];

    /// The API generation this strategy's queries target.
    #[must_use]
    pub const fn api_version(&self) -> ApiVersion {
        match self {
            Self::V7 => ApiVersion::Current,
            _ => ApiVersion::Legacy,
        }
    }

    /// Builds the page views query for `range`.
    #[must_use]
    pub fn views_query(&self, table_id: &str, range: DateRange) -> Query {
        match self {
            Self::V1 => v1::views_query(table_id, range),
            Self::V2 => v2::views_query(table_id, range),
            Self::V3 => v3::views_query(table_id, range),
            Self::V4 => v4::views_query(table_id, range),
            Self::V5 => v5::views_query(table_id, range),
            Self::V6 => v6::views_query(table_id, range),
            Self::V7 => v7::views_query(range),
        }
    }

    /// Builds the PDF downloads query for `range`.
    #[must_use]
    pub fn downloads_query(&self, table_id: &str, range: DateRange) -> Query {
        match self {
            Self::V1 | Self::V2 | Self::V3 => v1::downloads_query(table_id, range),
            Self::V4 | Self::V5 | Self::V6 => v4::downloads_query(table_id, range),
            Self::V7 => v7::downloads_query(range),
        }
    }

    /// Builds the query for either metric.
    #[must_use]
    pub fn query(&self, kind: MetricKind, table_id: &str, range: DateRange) -> Query {
        match kind {
            MetricKind::Views => self.views_query(table_id, range),
            MetricKind::Downloads => self.downloads_query(table_id, range),
        }
    }

    /// Parses page views rows into counts per article.
    #[must_use]
    pub fn parse_views(&self, rows: &[Value]) -> MetricsResult {
        match self {
            Self::V1 => v1::parse_views(rows),
            Self::V2 => v2::parse_views(rows),
            Self::V3 => v3::parse_views(rows),
            Self::V4 => v4::parse_views(rows),
            Self::V5 => v5::parse_views(rows),
            Self::V6 => v6::parse_views(rows),
            Self::V7 => v7::parse_views(rows),
        }
    }

    /// Parses PDF download rows into counts per article.
    #[must_use]
    pub fn parse_downloads(&self, rows: &[Value]) -> MetricsResult {
        match self {
            Self::V1 | Self::V2 | Self::V3 => v1::parse_downloads(rows),
            Self::V4 | Self::V5 | Self::V6 => v4::parse_downloads(rows),
            Self::V7 => v7::parse_downloads(rows),
        }
    }

    /// Parses rows for either metric.
    #[must_use]
    pub fn parse(&self, kind: MetricKind, rows: &[Value]) -> MetricsResult {
        match kind {
            MetricKind::Views => self.parse_views(rows),
            MetricKind::Downloads => self.parse_downloads(rows),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
            Self::V3 => "v3",
            Self::V4 => "v4",
            Self::V5 => "v5",
            Self::V6 => "v6",
            Self::V7 => "v7",
        };
        f.write_str(name)
    }
}
