#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/article-metrics/article-metrics/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Google Analytics backend.
//!
//! This crate implements the metrics-core [`AnalyticsBackend`] trait for both
//! the legacy core reporting API and the current data API.
//!
//! # Usage
//!
//! ```rust,ignore
//! use metrics_ga::GoogleAnalytics;
//! use metrics_core::AnalyticsBackend;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = GoogleAnalytics::from_credentials_file("client-secrets.json")
//!         .await?
//!         .with_property("123456789");
//!
//!     let report = backend.execute(&query).await?;
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use metrics_core::{
    AnalyticsBackend, BackendError, LegacyQuery, MetricsError, Query, Report, ReportRequest,
    Result,
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Core reporting API endpoint.
const LEGACY_URL: &str = "https://www.googleapis.com/analytics/v3/data/ga";

/// Data API base URL.
const DATA_API_URL: &str = "https://analyticsdata.googleapis.com/v1beta";

/// Environment variable holding an access token.
pub const ACCESS_TOKEN_ENV: &str = "GA_ACCESS_TOKEN";

/// Google Analytics backend.
///
/// Holds one HTTP client and one bearer token. Clone it freely; clones share
/// the connection pool.
#[derive(Clone)]
pub struct GoogleAnalytics {
    client: Client,
    access_token: String,
    property_id: Option<String>,
    legacy_url: String,
    data_api_url: String,
}

impl fmt::Debug for GoogleAnalytics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleAnalytics")
            .field("access_token", &"[REDACTED]")
            .field("property_id", &self.property_id)
            .finish()
    }
}

/// Contents of a credentials file.
#[derive(Debug, Deserialize)]
struct Credentials {
    access_token: String,
    #[serde(default)]
    property_id: Option<String>,
}

impl GoogleAnalytics {
    /// Create a backend authenticating with the given access token.
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_client(Client::new(), access_token)
    }

    /// Create a backend with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: Client, access_token: impl Into<String>) -> Self {
        Self {
            client,
            access_token: access_token.into(),
            property_id: None,
            legacy_url: LEGACY_URL.to_string(),
            data_api_url: DATA_API_URL.to_string(),
        }
    }

    /// Set the data API property that current queries run against.
    ///
    /// Accepts either `123` or `properties/123`.
    #[must_use]
    pub fn with_property(mut self, property_id: impl Into<String>) -> Self {
        let property_id = property_id.into();
        let bare = property_id
            .strip_prefix("properties/")
            .unwrap_or(&property_id)
            .to_string();
        self.property_id = Some(bare);
        self
    }

    /// Point the backend at different endpoints, e.g. a local proxy.
    #[must_use]
    pub fn with_base_urls(
        mut self,
        legacy_url: impl Into<String>,
        data_api_url: impl Into<String>,
    ) -> Self {
        self.legacy_url = legacy_url.into();
        self.data_api_url = data_api_url.into();
        self
    }

    /// Create a backend from the access token in [`ACCESS_TOKEN_ENV`].
    ///
    /// # Errors
    /// Returns [`MetricsError::NotConfigured`] if the variable is unset or empty.
    pub fn from_env() -> Result<Self> {
        match std::env::var(ACCESS_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => Ok(Self::new(token.trim())),
            _ => Err(MetricsError::NotConfigured(format!(
                "{ACCESS_TOKEN_ENV} is not set"
            ))),
        }
    }

    /// Create a backend from a JSON credentials file with an `access_token`
    /// and an optional `property_id`.
    ///
    /// # Errors
    /// Returns [`MetricsError::NotConfigured`] if the file can't be read and
    /// [`MetricsError::Parse`] if it isn't valid.
    pub async fn from_credentials_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            MetricsError::NotConfigured(format!(
                "failed to read credentials {}: {e}",
                path.display()
            ))
        })?;
        let credentials: Credentials = serde_json::from_str(&text)?;
        let backend = Self::new(credentials.access_token);
        Ok(match credentials.property_id {
            Some(property_id) => backend.with_property(property_id),
            None => backend,
        })
    }

    /// The configured data API property, if any.
    #[must_use]
    pub fn property_id(&self) -> Option<&str> {
        self.property_id.as_deref()
    }

    fn run_report_url(&self) -> std::result::Result<String, BackendError> {
        let property_id = self.property_id.as_deref().ok_or_else(|| {
            BackendError::InvalidQuery("no data API property configured".to_string())
        })?;
        Ok(format!(
            "{}/properties/{property_id}:runReport",
            self.data_api_url
        ))
    }

    async fn execute_legacy(
        &self,
        query: &LegacyQuery,
    ) -> std::result::Result<Report, BackendError> {
        tracing::debug!(
            start_date = %query.start_date,
            end_date = %query.end_date,
            start_index = query.start_index,
            "core reporting request"
        );
        let response = self
            .client
            .get(&self.legacy_url)
            .bearer_auth(&self.access_token)
            .query(&query.params())
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        Self::read_report(response).await
    }

    async fn execute_current(
        &self,
        request: &ReportRequest,
    ) -> std::result::Result<Report, BackendError> {
        let url = self.run_report_url()?;
        tracing::debug!(offset = request.offset, limit = request.limit, "data API request");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        Self::read_report(response).await
    }

    async fn read_report(response: reqwest::Response) -> std::result::Result<Report, BackendError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(classify(status, text));
        }

        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| BackendError::Parse(format!("{e}: {text}")))?;
        Report::from_value(value).map_err(|e| BackendError::Parse(e.to_string()))
    }
}

/// Maps a non-success status and its body to a [`BackendError`].
#[must_use]
pub fn classify(status: StatusCode, body: String) -> BackendError {
    let message = error_message(&body).unwrap_or(body);
    match status {
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => BackendError::RateLimited(message),
        StatusCode::SERVICE_UNAVAILABLE => BackendError::Unavailable(message),
        StatusCode::BAD_REQUEST => BackendError::InvalidQuery(message),
        StatusCode::UNAUTHORIZED => BackendError::Unauthorized(message),
        other => BackendError::Http {
            status: other.as_u16(),
            message,
        },
    }
}

/// Pulls `error.message` out of a Google API error body.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl AnalyticsBackend for GoogleAnalytics {
    fn name(&self) -> &str {
        "Google Analytics"
    }

    async fn execute(&self, query: &Query) -> std::result::Result<Report, BackendError> {
        match query {
            Query::Legacy(q) => self.execute_legacy(q).await,
            Query::Current(q) => self.execute_current(q).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_core::DateRange;

    #[test]
    fn test_status_classification() {
        let body = r#"{"error": {"code": 403, "message": "User Rate Limit Exceeded"}}"#;
        assert_eq!(
            classify(StatusCode::FORBIDDEN, body.to_string()),
            BackendError::RateLimited("User Rate Limit Exceeded".to_string())
        );
        assert!(matches!(
            classify(StatusCode::TOO_MANY_REQUESTS, String::new()),
            BackendError::RateLimited(_)
        ));
        assert!(matches!(
            classify(StatusCode::SERVICE_UNAVAILABLE, String::new()),
            BackendError::Unavailable(_)
        ));
        assert!(matches!(
            classify(StatusCode::BAD_REQUEST, String::new()),
            BackendError::InvalidQuery(_)
        ));
        assert!(matches!(
            classify(StatusCode::UNAUTHORIZED, String::new()),
            BackendError::Unauthorized(_)
        ));
        assert_eq!(
            classify(StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string()),
            BackendError::Http {
                status: 500,
                message: "boom".to_string()
            }
        );
    }

    #[test]
    fn test_debug_redacts_access_token() {
        let backend = GoogleAnalytics::new("ya29.secret_token");
        let debug_str = format!("{backend:?}");
        assert!(!debug_str.contains("ya29.secret_token"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_property_prefix_is_stripped() {
        let backend = GoogleAnalytics::new("t").with_property("properties/123");
        assert_eq!(backend.property_id(), Some("123"));
        assert_eq!(
            backend.run_report_url().unwrap(),
            "https://analyticsdata.googleapis.com/v1beta/properties/123:runReport"
        );
    }

    #[tokio::test]
    async fn test_current_query_without_property_is_invalid() {
        let backend = GoogleAnalytics::new("t");
        let range = DateRange::month(2023, 4).unwrap();
        let query = Query::Current(ReportRequest::new(range, &["linkUrl"], &["eventCount"]));
        let err = backend.execute(&query).await.unwrap_err();
        assert!(matches!(err, BackendError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client-secrets.json");
        std::fs::write(&path, r#"{"access_token": "abc", "property_id": "42"}"#).unwrap();

        let backend = GoogleAnalytics::from_credentials_file(&path).await.unwrap();
        assert_eq!(backend.property_id(), Some("42"));

        let missing = GoogleAnalytics::from_credentials_file(dir.path().join("nope.json")).await;
        assert!(matches!(missing, Err(MetricsError::NotConfigured(_))));
    }
}
