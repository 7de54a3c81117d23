#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/article-metrics/article-metrics/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Article page views and PDF downloads from web analytics.
//!
//! This crate ties the workspace together. It re-exports the core types, the
//! era strategies and the caches, and provides an [`ArticleMetricsClient`]
//! that queries each date range with the right strategy, retries rate limited
//! requests, pages through large reports and caches what it fetched.
//!
//! # Features
//!
//! - `ga` - Google Analytics backend (enabled by default)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use article_metrics::{ArticleMetricsClient, CacheMode, Settings, metrics_frame};
//! use chrono::NaiveDate;
//!
//! #[tokio::main]
//! async fn main() -> article_metrics::Result<()> {
//!     let settings = Settings::from_env()?;
//!     let backend = settings.backend().await?;
//!     let client = ArticleMetricsClient::from_settings(Arc::new(backend), &settings)?;
//!
//!     let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//!     let to = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
//!     let monthly = client.monthly_metrics_between(from, to, CacheMode::Cached).await?;
//!     println!("{}", metrics_frame(&monthly)?);
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use metrics_core::*;

// Era strategies
pub use metrics_eras::{Strategy, pick};

// Cache implementations
pub use metrics_cache::{FileCache, InMemoryCache, NoopCache};

// Backends
#[cfg(feature = "ga")]
pub use metrics_ga::GoogleAnalytics;

/// The article metrics pipeline.
pub mod client;
/// Runtime settings.
pub mod config;
/// Single request execution with backoff.
pub mod executor;
/// Tabular output.
pub mod frame;
/// Paging through large reports.
pub mod paginator;

#[cfg(test)]
mod testing;

pub use client::{ArticleMetricsClient, CacheMode, RangeMetrics};
pub use config::Settings;
pub use executor::{RetryPolicy, execute_with_backoff};
pub use frame::metrics_frame;
pub use paginator::query_all_pages;
