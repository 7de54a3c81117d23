//! No-op cache implementation.

use async_trait::async_trait;
use metrics_core::{DateRange, Report, Result, ResultCache, ResultType};
use tracing::trace;

/// A no-op cache that doesn't store anything.
///
/// `get` returns `Ok(None)`, `put` returns `Ok(false)` and `contains` is always
/// false. Useful for disabling caching or testing code paths without cache hits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl NoopCache {
    /// Create a new no-op cache.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResultCache for NoopCache {
    async fn get(&self, _result_type: ResultType, _range: DateRange) -> Result<Option<Report>> {
        trace!("NoopCache: get called, returning None");
        Ok(None)
    }

    async fn put(
        &self,
        _result_type: ResultType,
        _range: DateRange,
        _report: &Report,
    ) -> Result<bool> {
        trace!("NoopCache: put called, doing nothing");
        Ok(false)
    }

    async fn contains(&self, _result_type: ResultType, _range: DateRange) -> Result<bool> {
        Ok(false)
    }
}
