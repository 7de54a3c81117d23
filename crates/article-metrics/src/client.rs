//! The article metrics pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use metrics_cache::FileCache;
use metrics_core::validate::{filter_ranges, is_queryable_end, is_valid_for};
use metrics_core::{
    AnalyticsBackend, ArticleMetrics, DateRange, MetricKind, MetricsResult, Query, Report,
    Result, ResultCache, ResultType,
};
use tracing::{debug, info, instrument, warn};

use crate::config::Settings;
use crate::executor::RetryPolicy;
use crate::paginator::query_all_pages;

/// Where results come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheMode {
    /// Always query the backend, then cache what came back.
    Live,
    /// Use a cached report if there is one, otherwise query the backend.
    Cached,
    /// Use a cached report if there is one, otherwise return nothing.
    OnlyCached,
}

impl CacheMode {
    const fn reads_cache(self) -> bool {
        matches!(self, Self::Cached | Self::OnlyCached)
    }
}

/// Metrics keyed by the range they were queried for.
pub type RangeMetrics = BTreeMap<DateRange, ArticleMetrics>;

/// Queries article views and downloads, one request at a time.
///
/// The client picks the right query shape for each range's era, refuses
/// ranges that could return partial data, caches every report it fetches and
/// parses the rows into per-article counts.
///
/// # Example
///
/// ```rust,ignore
/// use article_metrics::{ArticleMetricsClient, CacheMode, Settings};
///
/// let settings = Settings::from_env()?;
/// let backend = settings.backend().await?;
/// let client = ArticleMetricsClient::from_settings(Arc::new(backend), &settings)?;
///
/// let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let to = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
/// let daily = client.daily_metrics_between(from, to, CacheMode::Cached).await?;
/// ```
pub struct ArticleMetricsClient {
    backend: Arc<dyn AnalyticsBackend>,
    cache: Arc<dyn ResultCache>,
    table_id: String,
    policy: RetryPolicy,
    page_size: u32,
    now: Option<NaiveDateTime>,
}

impl std::fmt::Debug for ArticleMetricsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArticleMetricsClient")
            .field("backend", &self.backend.name())
            .field("cache", &self.cache)
            .field("table_id", &self.table_id)
            .field("policy", &self.policy)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl ArticleMetricsClient {
    /// Create a client with the default retry policy and page size.
    #[must_use]
    pub fn new(
        backend: Arc<dyn AnalyticsBackend>,
        cache: Arc<dyn ResultCache>,
        table_id: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            cache,
            table_id: table_id.into(),
            policy: RetryPolicy::default(),
            page_size: metrics_core::query::MAX_RESULTS,
            now: None,
        }
    }

    /// Create a client caching to files under the configured output path.
    ///
    /// # Errors
    /// Returns [`MetricsError::NotConfigured`](metrics_core::MetricsError::NotConfigured)
    /// if the settings don't validate.
    pub fn from_settings(backend: Arc<dyn AnalyticsBackend>, settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let cache = Arc::new(FileCache::new(&settings.output_path));
        Ok(Self::new(backend, cache, settings.table_id.clone())
            .with_retry_policy(settings.retry_policy())
            .with_page_size(settings.page_size))
    }

    /// Set the retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the number of rows requested per page.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Pin the current time used for range checks instead of the system clock.
    #[must_use]
    pub const fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = Some(now);
        self
    }

    /// The legacy reporting table id.
    #[must_use]
    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    fn now(&self) -> NaiveDateTime {
        self.now.unwrap_or_else(|| Utc::now().naive_utc())
    }

    /// Fetches every page of `query` and caches the result under
    /// `result_type` and the query's range.
    ///
    /// Returns the combined report and whether it was stored. Recent ranges
    /// are fetched but not stored.
    ///
    /// # Errors
    /// Returns any error from paging or from writing the cache.
    #[instrument(skip(self, query, result_type), fields(result_type = %result_type))]
    pub async fn query_write_results(
        &self,
        mut query: Query,
        result_type: ResultType,
    ) -> Result<(Report, bool)> {
        let range = query.range()?;
        query.set_page(1, self.page_size);
        let report = query_all_pages(self.backend.as_ref(), query, &self.policy, self.now()).await?;
        let stored = self.cache.put(result_type, range, &report).await?;
        info!(%range, rows = report.rows().len(), stored, "query complete");
        Ok((report, stored))
    }

    async fn raw_report(
        &self,
        kind: MetricKind,
        range: DateRange,
        mode: CacheMode,
    ) -> Result<Option<Report>> {
        let result_type = kind.result_type();
        if mode.reads_cache() {
            if let Some(report) = self.cache.get(result_type, range).await? {
                return Ok(Some(report));
            }
            if mode == CacheMode::OnlyCached {
                debug!(%range, %result_type, "no cached results and only the cache may be used");
                return Ok(None);
            }
        }
        let query = metrics_eras::pick(range).query(kind, &self.table_id, range);
        let (report, _) = self.query_write_results(query, result_type).await?;
        Ok(Some(report))
    }

    /// Views or downloads for one range.
    ///
    /// Ranges that are unsafe to query for `kind` yield an empty result.
    ///
    /// # Errors
    /// Returns any error from the cache or the backend.
    #[instrument(skip(self, range), fields(range = %range))]
    pub async fn article_counts(
        &self,
        kind: MetricKind,
        range: DateRange,
        mode: CacheMode,
    ) -> Result<MetricsResult> {
        if !is_valid_for(kind, range, self.now()) {
            warn!(
                %kind,
                inception = %kind.inception(),
                "date range is unsafe to query, skipping"
            );
            return Ok(MetricsResult::new());
        }
        let strategy = metrics_eras::pick(range);
        let report = self.raw_report(kind, range, mode).await?;
        Ok(report.map_or_else(MetricsResult::new, |report| {
            strategy.parse(kind, report.rows())
        }))
    }

    /// Page views for one range.
    ///
    /// # Errors
    /// Returns any error from the cache or the backend.
    pub async fn article_views(&self, range: DateRange, mode: CacheMode) -> Result<MetricsResult> {
        self.article_counts(MetricKind::Views, range, mode).await
    }

    /// PDF downloads for one range.
    ///
    /// # Errors
    /// Returns any error from the cache or the backend.
    pub async fn article_downloads(
        &self,
        range: DateRange,
        mode: CacheMode,
    ) -> Result<MetricsResult> {
        self.article_counts(MetricKind::Downloads, range, mode).await
    }

    /// Views and downloads for one range.
    ///
    /// # Errors
    /// Returns any error from the cache or the backend.
    pub async fn article_metrics(&self, range: DateRange, mode: CacheMode) -> Result<ArticleMetrics> {
        let metrics = ArticleMetrics {
            views: self.article_views(range, mode).await?,
            downloads: self.article_downloads(range, mode).await?,
        };
        let missing: Vec<&String> = metrics.downloads_without_views().collect();
        if !missing.is_empty() {
            debug!(%range, ?missing, "downloads with no corresponding page view");
        }
        Ok(metrics)
    }

    /// One query per range, each shaped for the range's era.
    ///
    /// In [`CacheMode::Cached`] ranges that are already cached are skipped; in
    /// [`CacheMode::OnlyCached`] nothing is generated.
    ///
    /// # Errors
    /// Returns any error from checking the cache.
    pub async fn generate_queries(
        &self,
        kind: MetricKind,
        ranges: &[DateRange],
        mode: CacheMode,
    ) -> Result<Vec<Query>> {
        if mode == CacheMode::OnlyCached {
            debug!(%kind, ranges = ranges.len(), "only the cache may be used, no queries generated");
            return Ok(Vec::new());
        }
        let result_type = kind.result_type();
        let mut queries = Vec::with_capacity(ranges.len());
        for &range in ranges {
            if mode == CacheMode::Cached && self.cache.contains(result_type, range).await? {
                debug!(%range, %result_type, "query skipped, results already cached");
                continue;
            }
            queries.push(metrics_eras::pick(range).query(kind, &self.table_id, range));
        }
        Ok(queries)
    }

    /// Executes and caches each query in turn, for the side effect.
    ///
    /// Returns how many reports were stored.
    ///
    /// # Errors
    /// Stops at the first failing query.
    pub async fn bulk_query(&self, queries: Vec<Query>, result_type: ResultType) -> Result<usize> {
        let mut stored = 0;
        for query in queries {
            let (_, written) = self.query_write_results(query, result_type).await?;
            if written {
                stored += 1;
            }
        }
        Ok(stored)
    }

    /// Views and downloads for each range.
    ///
    /// # Errors
    /// Stops at the first failing range.
    pub async fn metrics_for_range(
        &self,
        ranges: &[DateRange],
        mode: CacheMode,
    ) -> Result<RangeMetrics> {
        let mut results = RangeMetrics::new();
        for &range in ranges {
            results.insert(range, self.article_metrics(range, mode).await?);
        }
        Ok(results)
    }

    /// Per-day metrics for every day from `from` to `to` inclusive.
    ///
    /// Days that are unsafe to query are left out.
    ///
    /// # Errors
    /// Returns [`MetricsError::InvalidRange`](metrics_core::MetricsError::InvalidRange)
    /// if `from` is after `to`, or any error from the cache or the backend.
    #[instrument(skip(self))]
    pub async fn daily_metrics_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        mode: CacheMode,
    ) -> Result<RangeMetrics> {
        let days = DateRange::new(from, to)?.days();
        self.metrics_between(&days, mode).await
    }

    /// Per-month metrics for every whole month from `from` to `to`.
    ///
    /// # Errors
    /// Returns [`MetricsError::InvalidRange`](metrics_core::MetricsError::InvalidRange)
    /// if `from` is after `to`, or any error from the cache or the backend.
    #[instrument(skip(self))]
    pub async fn monthly_metrics_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        mode: CacheMode,
    ) -> Result<RangeMetrics> {
        let months = DateRange::new(from, to)?.months();
        self.metrics_between(&months, mode).await
    }

    async fn metrics_between(&self, ranges: &[DateRange], mode: CacheMode) -> Result<RangeMetrics> {
        let now = self.now();
        // a month still in progress passes range validation but can't be queried
        let ranges: Vec<DateRange> = ranges
            .iter()
            .copied()
            .filter(|range| {
                let queryable = is_queryable_end(range.to_date(), now);
                if !queryable {
                    warn!(
                        from = %range.from_date(),
                        to = %range.to_date(),
                        "excluding pair that ends too recently"
                    );
                }
                queryable
            })
            .collect();
        let views_ranges = filter_ranges(MetricKind::Views, &ranges, now);
        let downloads_ranges = filter_ranges(MetricKind::Downloads, &ranges, now);

        let queries = self
            .generate_queries(MetricKind::Views, &views_ranges, mode)
            .await?;
        self.bulk_query(queries, ResultType::Views).await?;

        let queries = self
            .generate_queries(MetricKind::Downloads, &downloads_ranges, mode)
            .await?;
        self.bulk_query(queries, ResultType::Downloads).await?;

        // everything fetchable is cached by now, unless it was too recent to store
        let read_back = match mode {
            CacheMode::OnlyCached => CacheMode::OnlyCached,
            CacheMode::Live | CacheMode::Cached => CacheMode::Cached,
        };
        self.metrics_for_range(&views_ranges, read_back).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBackend;
    use metrics_cache::InMemoryCache;
    use metrics_core::types::{FULL, PDF};
    use metrics_core::{BackendError, MetricsError};
    use serde_json::json;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn now() -> NaiveDateTime {
        ymd(2024, 6, 10).and_hms_opt(0, 0, 0).unwrap()
    }

    fn legacy(rows: serde_json::Value) -> Report {
        let total = rows.as_array().map_or(0, Vec::len);
        Report::from_value(json!({
            "query": {"ids": "ga:1"},
            "profileInfo": {"profileId": "1"},
            "totalResults": total,
            "rows": rows
        }))
        .unwrap()
    }

    fn views_2020() -> Report {
        legacy(json!([
            ["/articles/09560", "10"],
            ["/articles/09560/figures", "2"],
            ["/articles/01234", "1"]
        ]))
    }

    fn downloads_2020() -> Report {
        legacy(json!([
            ["https://cdn.elifesciences.org/articles/09560/elife-09560-v1.pdf", "4"],
            ["https://cdn.elifesciences.org/articles/05555/elife-05555-v2.pdf", "1"]
        ]))
    }

    fn client(backend: Arc<ScriptedBackend>, cache: Arc<dyn ResultCache>) -> ArticleMetricsClient {
        ArticleMetricsClient::new(backend, cache, "12345").with_now(now())
    }

    fn memory_cache() -> Arc<InMemoryCache> {
        Arc::new(InMemoryCache::new().with_today(now().date()))
    }

    #[tokio::test]
    async fn test_article_metrics_live() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(views_2020()), Ok(downloads_2020())]));
        let cache = memory_cache();
        let client = client(backend.clone(), cache.clone());
        let range = DateRange::month(2020, 1).unwrap();

        let metrics = client.article_metrics(range, CacheMode::Live).await.unwrap();

        assert_eq!(metrics.views.count("10.7554/eLife.09560", FULL), 12);
        assert_eq!(metrics.downloads.count("10.7554/eLife.09560", PDF), 4);
        let missing: Vec<_> = metrics.downloads_without_views().collect();
        assert_eq!(missing, vec!["10.7554/eLife.05555"]);
        assert_eq!(backend.calls(), 2);
        assert!(cache.contains(ResultType::Views, range).await.unwrap());
        assert!(cache.contains(ResultType::Downloads, range).await.unwrap());

        // the legacy table id is carried in the era's query
        match &backend.queries()[0] {
            Query::Legacy(q) => {
                assert_eq!(q.ids, "ga:12345");
                assert_eq!(q.metrics, "ga:pageviews");
            }
            Query::Current(_) => panic!("2020 is a legacy era"),
        }
    }

    #[tokio::test]
    async fn test_cached_hit_makes_no_call() {
        let backend = Arc::new(ScriptedBackend::default());
        let cache = memory_cache();
        let range = DateRange::month(2020, 1).unwrap();
        cache.put(ResultType::Views, range, &views_2020()).await.unwrap();
        let client = client(backend.clone(), cache);

        let views = client.article_views(range, CacheMode::Cached).await.unwrap();

        assert_eq!(views.count("10.7554/eLife.01234", FULL), 1);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_only_cached_miss_is_empty() {
        let backend = Arc::new(ScriptedBackend::default());
        let client = client(backend.clone(), memory_cache());
        let range = DateRange::month(2020, 1).unwrap();

        let views = client.article_views(range, CacheMode::OnlyCached).await.unwrap();

        assert!(views.is_empty());
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_cached_miss_queries_the_backend() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(views_2020())]));
        let client = client(backend.clone(), memory_cache());
        let range = DateRange::month(2020, 1).unwrap();

        let views = client.article_views(range, CacheMode::Cached).await.unwrap();

        assert_eq!(views.len(), 2);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_range_before_inception_is_empty() {
        let backend = Arc::new(ScriptedBackend::default());
        let client = client(backend.clone(), memory_cache());
        let range = DateRange::month(2014, 1).unwrap();

        assert!(client.article_views(range, CacheMode::Live).await.unwrap().is_empty());
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_fatal_backend_error_propagates() {
        let backend = Arc::new(ScriptedBackend::repeating(Err(BackendError::Unauthorized(
            "token revoked".to_string(),
        ))));
        let client = client(backend.clone(), memory_cache());
        let range = DateRange::month(2020, 1).unwrap();

        let err = client.article_views(range, CacheMode::Live).await.unwrap_err();

        assert!(matches!(err, MetricsError::AuthenticationFailed(_)));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_generate_queries_skips_cached_ranges() {
        let backend = Arc::new(ScriptedBackend::default());
        let cache = memory_cache();
        let jan = DateRange::month(2020, 1).unwrap();
        let feb = DateRange::month(2020, 2).unwrap();
        cache.put(ResultType::Views, jan, &views_2020()).await.unwrap();
        let client = client(backend, cache);

        let cached = client
            .generate_queries(MetricKind::Views, &[jan, feb], CacheMode::Cached)
            .await
            .unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].range().unwrap(), feb);

        let live = client
            .generate_queries(MetricKind::Views, &[jan, feb], CacheMode::Live)
            .await
            .unwrap();
        assert_eq!(live.len(), 2);

        let none = client
            .generate_queries(MetricKind::Views, &[jan, feb], CacheMode::OnlyCached)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_generate_queries_uses_each_ranges_era() {
        let client = client(Arc::new(ScriptedBackend::default()), memory_cache());
        let legacy = DateRange::month(2023, 2).unwrap();
        let current = DateRange::month(2023, 4).unwrap();

        let queries = client
            .generate_queries(MetricKind::Downloads, &[legacy, current], CacheMode::Live)
            .await
            .unwrap();

        assert!(matches!(queries[0], Query::Legacy(_)));
        assert!(matches!(queries[1], Query::Current(_)));
    }

    #[tokio::test]
    async fn test_daily_metrics_between() {
        // views and downloads for each of two days, in that order
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok(legacy(json!([["/articles/09560", "3"]]))),
            Ok(legacy(json!([["/articles/09560", "5"]]))),
            Ok(legacy(json!([[
                "https://cdn.elifesciences.org/articles/09560/elife-09560-v1.pdf",
                "1"
            ]]))),
            Ok(legacy(json!([]))),
        ]));
        let cache = memory_cache();
        let client = client(backend.clone(), cache);

        let results = client
            .daily_metrics_between(ymd(2020, 1, 1), ymd(2020, 1, 2), CacheMode::Cached)
            .await
            .unwrap();

        assert_eq!(backend.calls(), 4);
        let day1 = &results[&DateRange::daily(ymd(2020, 1, 1))];
        let day2 = &results[&DateRange::daily(ymd(2020, 1, 2))];
        assert_eq!(day1.views.count("10.7554/eLife.09560", FULL), 3);
        assert_eq!(day2.views.count("10.7554/eLife.09560", FULL), 5);
        assert_eq!(day1.downloads.count("10.7554/eLife.09560", PDF), 1);
        assert!(day2.downloads.is_empty());

        // a second run is served entirely from the cache
        let again = client
            .daily_metrics_between(ymd(2020, 1, 1), ymd(2020, 1, 2), CacheMode::Cached)
            .await
            .unwrap();
        assert_eq!(again, results);
        assert_eq!(backend.calls(), 4);
    }

    #[tokio::test]
    async fn test_daily_metrics_leave_out_recent_days() {
        let backend = Arc::new(ScriptedBackend::repeating(Ok(legacy(json!([])))));
        let client = client(backend.clone(), memory_cache())
            .with_now(ymd(2023, 2, 10).and_hms_opt(0, 0, 0).unwrap());

        let results = client
            .daily_metrics_between(ymd(2023, 2, 7), ymd(2023, 2, 10), CacheMode::Live)
            .await
            .unwrap();

        // the 9th is less than a day old and the 10th is today
        let days: Vec<_> = results.keys().map(DateRange::from_date).collect();
        assert_eq!(days, vec![ymd(2023, 2, 7), ymd(2023, 2, 8)]);
    }

    #[tokio::test]
    async fn test_daily_metrics_leave_out_yesterday_after_midnight() {
        let backend = Arc::new(ScriptedBackend::repeating(Ok(legacy(json!([])))));
        let today = ymd(2023, 2, 10);
        let cache = Arc::new(InMemoryCache::new().with_today(today));
        let client = client(backend.clone(), cache.clone())
            .with_now(today.and_hms_opt(12, 0, 0).unwrap());

        let results = client
            .daily_metrics_between(ymd(2023, 2, 8), today, CacheMode::Cached)
            .await
            .unwrap();

        let days: Vec<_> = results.keys().map(DateRange::from_date).collect();
        assert_eq!(days, vec![ymd(2023, 2, 8)]);
        // one views and one downloads query, both stored and read back
        assert_eq!(backend.calls(), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_monthly_metrics_skip_month_in_progress() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok(views_2020()),
            Ok(downloads_2020()),
        ]));
        let today = ymd(2023, 2, 10);
        let cache = Arc::new(InMemoryCache::new().with_today(today));
        let client = client(backend.clone(), cache)
            .with_now(today.and_hms_opt(12, 0, 0).unwrap());

        let results = client
            .monthly_metrics_between(ymd(2023, 1, 1), today, CacheMode::Cached)
            .await
            .unwrap();

        let jan = DateRange::month(2023, 1).unwrap();
        assert_eq!(results.keys().copied().collect::<Vec<_>>(), vec![jan]);
        assert_eq!(results[&jan].views.count("10.7554/eLife.09560", FULL), 12);
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_monthly_metrics_only_cached() {
        let backend = Arc::new(ScriptedBackend::default());
        let cache = memory_cache();
        let jan = DateRange::month(2020, 1).unwrap();
        cache.put(ResultType::Views, jan, &views_2020()).await.unwrap();
        cache.put(ResultType::Downloads, jan, &downloads_2020()).await.unwrap();
        let client = client(backend.clone(), cache);

        let results = client
            .monthly_metrics_between(ymd(2020, 1, 1), ymd(2020, 2, 29), CacheMode::OnlyCached)
            .await
            .unwrap();

        assert_eq!(backend.calls(), 0);
        assert_eq!(results.len(), 2);
        assert_eq!(results[&jan].views.len(), 2);
        assert!(results[&DateRange::month(2020, 2).unwrap()].views.is_empty());
    }

    #[tokio::test]
    async fn test_query_write_results_to_files() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(views_2020())]));
        let cache = Arc::new(FileCache::new(dir.path()));
        let client = client(backend, cache.clone()).with_page_size(500);
        let range = DateRange::month(2020, 1).unwrap();
        let query = metrics_eras::pick(range).views_query(client.table_id(), range);

        let (report, stored) = client
            .query_write_results(query, ResultType::Views)
            .await
            .unwrap();

        assert!(stored);
        assert_eq!(report.rows().len(), 3);
        let path = cache.path(ResultType::Views, range);
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert!(written.get("profileInfo").is_none());
        assert!(written["query"].get("ids").is_none());
        assert_eq!(written["totalPages"], 1);
    }
}
