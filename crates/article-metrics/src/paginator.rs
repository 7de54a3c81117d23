//! Fetches every page of a query.

use chrono::NaiveDateTime;
use metrics_core::validate::is_queryable_end;
use metrics_core::{AnalyticsBackend, MetricsError, Query, Report, Result};
use tracing::{info, instrument};

use crate::executor::{RetryPolicy, execute_with_backoff};

/// Executes `query` and any further pages, one after the other.
///
/// Pages start at 1, then `page_size + 1`, `2 * page_size + 1` and so on,
/// where `page_size` is the query's own. Fetching stops once
/// `page_size * pages` reaches the reported total, or a page comes back
/// empty. The last page is returned
/// carrying every row in arrival order and the number of pages fetched as
/// `totalPages`.
///
/// # Errors
/// Returns [`MetricsError::UnsafeQuery`] without calling the backend if the
/// query ends today, in the future or less than 24 hours before `now`. Errors
/// from [`execute_with_backoff`] are passed through.
#[instrument(skip_all, fields(query = %query.describe()))]
pub async fn query_all_pages(
    backend: &dyn AnalyticsBackend,
    mut query: Query,
    policy: &RetryPolicy,
    now: NaiveDateTime,
) -> Result<Report> {
    let end_date = query.range()?.to_date();
    if !is_queryable_end(end_date, now) {
        return Err(MetricsError::UnsafeQuery {
            end_date: end_date.to_string(),
        });
    }

    let page_size = query.page_size().max(1);
    let mut rows = Vec::new();
    let mut page: u32 = 1;
    let mut start_index: u32 = 1;
    loop {
        info!(page, "requesting page");
        query.set_page(start_index, page_size);
        let mut report = execute_with_backoff(backend, &query, policy).await?;
        let page_rows = report.take_rows();
        let exhausted = page_rows.is_empty();
        rows.extend(page_rows);

        if exhausted || u64::from(page_size) * u64::from(page) >= report.total_results() {
            report.set_rows(rows);
            report.set_total_pages(u64::from(page));
            return Ok(report);
        }
        start_index = start_index.saturating_add(page_size);
        page += 1;
    }
}
