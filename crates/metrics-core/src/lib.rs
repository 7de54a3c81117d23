#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/article-metrics/article-metrics/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for article metrics aggregation.
//!
//! This crate provides the foundational abstractions shared by the rest of the
//! workspace:
//!
//! - [`DateRange`](range::DateRange) - Validated calendar date ranges
//! - [`Query`](query::Query) and [`Report`](query::Report) - Analytics requests and raw responses
//! - [`AnalyticsBackend`](backend::AnalyticsBackend) - Single-request backend boundary
//! - [`ResultCache`](cache::ResultCache) - Caching abstraction for raw reports
//! - [`validate`] - Range safety checks

/// Analytics backend trait.
pub mod backend;
/// Cache trait for storing raw reports.
pub mod cache;
/// Error types for metrics operations.
pub mod error;
/// Metric kinds and result types.
pub mod kind;
/// Analytics queries and raw reports.
pub mod query;
/// Calendar date ranges.
pub mod range;
/// Parsed metrics types.
pub mod types;
/// Date range safety checks.
pub mod validate;

// Re-export commonly used items at crate root
pub use backend::AnalyticsBackend;
pub use cache::ResultCache;
pub use error::{BackendError, MetricsError, Result};
pub use kind::{DOWNLOADS_INCEPTION, MetricKind, ResultType, VIEWS_INCEPTION};
pub use query::{ApiVersion, LegacyQuery, Query, Report, ReportRequest};
pub use range::DateRange;
pub use types::{ArticleMetrics, Counts, MetricsResult, msid_to_doi};
