//! The analytics backend boundary.
//!
//! An [`AnalyticsBackend`] executes exactly one request and reports what
//! happened. Retrying, backing off and paging are layered on top by the
//! caller, so implementations stay thin.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::{
    error::BackendError,
    query::{Query, Report},
};

/// A connection to the analytics provider.
///
/// Construct one per process and share it; it owns its authenticated
/// transport.
#[async_trait]
pub trait AnalyticsBackend: Send + Sync + Debug {
    /// Returns the name of this backend (e.g., "Google Analytics").
    fn name(&self) -> &str;

    /// Executes a single request for one page of results.
    async fn execute(&self, query: &Query) -> std::result::Result<Report, BackendError>;
}
