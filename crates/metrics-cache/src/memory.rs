//! In-memory cache implementation.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use metrics_core::validate::is_cacheable_end;
use metrics_core::{DateRange, Report, Result, ResultCache, ResultType};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Key for cached reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ReportKey {
    result_type: ResultType,
    range: DateRange,
}

/// Simple in-memory cache for testing and development.
///
/// Reports are stored in a `RwLock`-protected `HashMap` and are lost when the
/// cache is dropped. The same freshness rule and sanitizing as [`FileCache`]
/// apply.
///
/// [`FileCache`]: crate::FileCache
#[derive(Debug, Default)]
pub struct InMemoryCache {
    reports: RwLock<HashMap<ReportKey, Report>>,
    today: Option<NaiveDate>,
}

impl InMemoryCache {
    /// Create a new empty in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the date used for the freshness check instead of the system clock.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Number of cached reports.
    pub async fn len(&self) -> usize {
        self.reports.read().await.len()
    }

    /// Returns true if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.reports.read().await.is_empty()
    }

    /// Remove every cached report.
    pub async fn clear(&self) {
        self.reports.write().await.clear();
        debug!("Cleared all cache entries");
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }
}

#[async_trait]
impl ResultCache for InMemoryCache {
    #[instrument(skip(self, range), fields(range = %range))]
    async fn get(&self, result_type: ResultType, range: DateRange) -> Result<Option<Report>> {
        let key = ReportKey { result_type, range };
        let cache = self.reports.read().await;
        match cache.get(&key) {
            Some(report) => {
                debug!("Cache hit");
                Ok(Some(report.clone()))
            }
            None => {
                debug!("Cache miss");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, range, report), fields(range = %range))]
    async fn put(&self, result_type: ResultType, range: DateRange, report: &Report) -> Result<bool> {
        if !is_cacheable_end(range.to_date(), self.today()) {
            debug!("Not caching potentially partial results");
            return Ok(false);
        }
        let key = ReportKey { result_type, range };
        let mut cache = self.reports.write().await;
        cache.insert(key, report.clone().sanitized());
        debug!("Cached {} rows", report.rows().len());
        Ok(true)
    }

    async fn contains(&self, result_type: ResultType, range: DateRange) -> Result<bool> {
        let key = ReportKey { result_type, range };
        Ok(self.reports.read().await.contains_key(&key))
    }
}
