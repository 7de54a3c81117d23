//! Single query execution with exponential backoff.

use std::time::Duration;

use metrics_core::{AnalyticsBackend, BackendError, MetricsError, Query, Report, Result};
use rand::Rng;
use tracing::{error, info, warn};

/// Default number of attempts per page.
pub const DEFAULT_ATTEMPTS: u32 = 5;

/// How many times to try a request and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Base delay unit. Backoff after attempt `n` (0-based) is
    /// `unit * (2^n + jitter)` with `jitter` in `[0, 1]`.
    pub unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_ATTEMPTS,
            unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// A policy with the given attempt budget and the default delay unit.
    #[must_use]
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Delay after the 0-based `attempt`, given `jitter_millis` in `0..=1000`.
    ///
    /// Doubled when the service reported itself unavailable.
    #[must_use]
    pub fn delay(&self, attempt: u32, jitter_millis: u32, unavailable: bool) -> Duration {
        let thousandths = 2u32
            .saturating_pow(attempt)
            .saturating_mul(1000)
            .saturating_add(jitter_millis.min(1000));
        let delay = self.unit.saturating_mul(thousandths) / 1000;
        if unavailable {
            delay.saturating_mul(2)
        } else {
            delay
        }
    }
}

/// Executes one request, retrying rate limited and unavailable responses.
///
/// Invalid queries, authentication failures and every other provider or
/// network error are returned immediately. There is no wait after the final
/// attempt.
///
/// # Errors
/// Returns [`MetricsError::ExceededRetries`] once the budget is spent, or the
/// first unrecoverable error converted from [`BackendError`].
pub async fn execute_with_backoff(
    backend: &dyn AnalyticsBackend,
    query: &Query,
    policy: &RetryPolicy,
) -> Result<Report> {
    for attempt in 0..policy.max_attempts {
        if attempt > 1 {
            info!(attempt = attempt + 1, "query attempt");
        } else {
            info!(backend = backend.name(), "querying ...");
        }

        match backend.execute(query).await {
            Ok(report) => return Ok(report),
            Err(err) if err.is_recoverable() => {
                if attempt + 1 == policy.max_attempts {
                    warn!(error = %err, "recoverable error on final attempt");
                    break;
                }
                let jitter = rand::rng().random_range(0..=1000);
                let unavailable = matches!(err, BackendError::Unavailable(_));
                let delay = policy.delay(attempt, jitter, unavailable);
                warn!(error = %err, delay = ?delay, "rate limited, backing off");
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                error!(error = %err, "unrecoverable error");
                return Err(MetricsError::from(err));
            }
        }
    }

    Err(MetricsError::ExceededRetries {
        attempts: policy.max_attempts,
    })
}
