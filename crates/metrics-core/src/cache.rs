//! Cache trait for storing raw analytics reports.
//!
//! This module defines the [`ResultCache`] trait that provides a unified
//! interface for persisting reports keyed by result type and date range.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{error::Result, kind::ResultType, query::Report, range::DateRange};

/// Trait for caching raw analytics reports.
///
/// Entries never expire. Implementations must refuse to store reports whose
/// range ends today or yesterday, since those may be incomplete.
#[async_trait]
pub trait ResultCache: Send + Sync + Debug {
    /// Retrieves the cached report for a result type and range.
    ///
    /// Returns `Ok(Some(report))` if cached, `Ok(None)` if not cached.
    async fn get(&self, result_type: ResultType, range: DateRange) -> Result<Option<Report>>;

    /// Stores a report, stripped of account identifiers.
    ///
    /// Returns `Ok(false)` without storing anything if the range may hold
    /// partial results.
    async fn put(&self, result_type: ResultType, range: DateRange, report: &Report)
    -> Result<bool>;

    /// Returns true if a report is cached for the result type and range.
    async fn contains(&self, result_type: ResultType, range: DateRange) -> Result<bool>;
}
