//! Metric kinds and result types.
//!
//! This module defines [`MetricKind`] for the two article metrics that are
//! collected and [`ResultType`] for the names results are cached under.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::MetricsError;

/// First day page views were collected.
pub const VIEWS_INCEPTION: NaiveDate = match NaiveDate::from_ymd_opt(2014, 3, 12) {
    Some(date) => date,
    None => panic!("invalid date"),
};

/// First day PDF downloads were collected.
pub const DOWNLOADS_INCEPTION: NaiveDate = match NaiveDate::from_ymd_opt(2015, 2, 13) {
    Some(date) => date,
    None => panic!("invalid date"),
};

/// An article metric collected from the analytics backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Article page views.
    Views,
    /// Article PDF downloads.
    Downloads,
}

impl MetricKind {
    /// The earliest date this metric was ever collected.
    #[must_use]
    pub const fn inception(&self) -> NaiveDate {
        match self {
            Self::Views => VIEWS_INCEPTION,
            Self::Downloads => DOWNLOADS_INCEPTION,
        }
    }

    /// The result type this metric is cached under.
    #[must_use]
    pub const fn result_type(&self) -> ResultType {
        match self {
            Self::Views => ResultType::Views,
            Self::Downloads => ResultType::Downloads,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.result_type().as_str())
    }
}

/// Names that results are cached under.
///
/// Besides article views and downloads, results for the site's other page
/// types share the same cache layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultType {
    /// Article page views.
    Views,
    /// Article PDF downloads.
    Downloads,
    /// Blog article page views.
    BlogArticle,
    /// Collection page views.
    Collection,
    /// Digest page views.
    Digest,
    /// Event page views.
    Event,
    /// Interview page views.
    Interview,
    /// Labs post page views.
    LabsPost,
    /// Press package page views.
    PressPackage,
}

impl ResultType {
    /// Every known result type.
    pub const ALL: [Self; 9] = [
        Self::Views,
        Self::Downloads,
        Self::BlogArticle,
        Self::Collection,
        Self::Digest,
        Self::Event,
        Self::Interview,
        Self::LabsPost,
        Self::PressPackage,
    ];

    /// The directory name used for this result type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Views => "views",
            Self::Downloads => "downloads",
            Self::BlogArticle => "blog-article",
            Self::Collection => "collection",
            Self::Digest => "digest",
            Self::Event => "event",
            Self::Interview => "interview",
            Self::LabsPost => "labs-post",
            Self::PressPackage => "press-package",
        }
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultType {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| MetricsError::UnknownResultType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_type_round_trips_through_str() {
        for t in ResultType::ALL {
            assert_eq!(t.as_str().parse::<ResultType>().unwrap(), t);
        }
    }

    #[test]
    fn test_unknown_result_type() {
        let err = "citations".parse::<ResultType>().unwrap_err();
        assert!(matches!(err, MetricsError::UnknownResultType(name) if name == "citations"));
    }

    #[test]
    fn test_inception_dates_differ() {
        assert!(MetricKind::Views.inception() < MetricKind::Downloads.inception());
        assert_eq!(MetricKind::Downloads.result_type(), ResultType::Downloads);
    }
}
