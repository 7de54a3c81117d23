//! Error types for metrics operations.
//!
//! This module defines [`MetricsError`], which covers everything that can go
//! wrong while validating date ranges, talking to the analytics backend,
//! parsing responses or reading and writing the result cache, and
//! [`BackendError`], the narrower set of failures a backend reports for a
//! single request.

use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// A date range was constructed with its dates out of order.
    #[error("Invalid date range: from {from} is after to {to}")]
    InvalidRange {
        /// Start of the rejected range.
        from: String,
        /// End of the rejected range.
        to: String,
    },

    /// A result type name that the cache does not know about.
    #[error("Unknown results type {0:?}")]
    UnknownResultType(String),

    /// A query whose end date cannot return complete data.
    #[error("Refusing to query, end date {end_date} will generate partial or empty results")]
    UnsafeQuery {
        /// The offending end date.
        end_date: String,
    },

    /// The backend could not construct or accept the query.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Credentials were rejected, revoked or expired.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Every attempt was rate limited or the service stayed unavailable.
    #[error("Failed to execute query after {attempts} attempts")]
    ExceededRetries {
        /// The number of attempts made.
        attempts: u32,
    },

    /// The backend answered with an error status that cannot be retried.
    #[error("Provider error (HTTP {status}): {message}")]
    Provider {
        /// HTTP status code.
        status: u16,
        /// Error body or reason.
        message: String,
    },

    /// Network-related errors (connection failures, timeouts, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Error parsing data from the backend or the cache.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error interacting with the cache.
    #[error("Cache error: {0}")]
    Cache(String),

    /// A required setting is missing or malformed.
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using [`MetricsError`].
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Failures reported by an [`AnalyticsBackend`](crate::AnalyticsBackend) for a single request.
///
/// The executor decides which of these are worth another attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Quota or per-user rate limit exceeded.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The service is temporarily unavailable.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The query could not be built or was rejected as malformed.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The credentials were rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Any other non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error body or reason.
        message: String,
    },

    /// The request never produced a response.
    #[error("network: {0}")]
    Network(String),

    /// The response body could not be decoded.
    #[error("parse: {0}")]
    Parse(String),
}

impl BackendError {
    /// Returns true if the request may succeed when repeated after a delay.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Unavailable(_))
    }
}

impl From<BackendError> for MetricsError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::RateLimited(message) => Self::Provider {
                status: 429,
                message,
            },
            BackendError::Unavailable(message) => Self::Provider {
                status: 503,
                message,
            },
            BackendError::InvalidQuery(message) => Self::InvalidQuery(message),
            BackendError::Unauthorized(message) => Self::AuthenticationFailed(message),
            BackendError::Http { status, message } => Self::Provider { status, message },
            BackendError::Network(message) => Self::Network(message),
            BackendError::Parse(message) => Self::Parse(message),
        }
    }
}

impl From<serde_json::Error> for MetricsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(BackendError::RateLimited("quota".into()).is_recoverable());
        assert!(BackendError::Unavailable("down".into()).is_recoverable());
        assert!(!BackendError::InvalidQuery("bad".into()).is_recoverable());
        assert!(!BackendError::Unauthorized("revoked".into()).is_recoverable());
        assert!(
            !BackendError::Http {
                status: 500,
                message: "boom".into()
            }
            .is_recoverable()
        );
    }

    #[test]
    fn test_backend_error_conversion() {
        let err: MetricsError = BackendError::Unauthorized("token expired".into()).into();
        assert!(matches!(err, MetricsError::AuthenticationFailed(_)));

        let err: MetricsError = BackendError::InvalidQuery("no ids".into()).into();
        assert!(matches!(err, MetricsError::InvalidQuery(_)));
    }
}
