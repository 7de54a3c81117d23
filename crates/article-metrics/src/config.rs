//! Settings for talking to the analytics provider and caching its answers.

use std::path::{Path, PathBuf};

use metrics_core::query::MAX_RESULTS;
use metrics_core::{MetricsError, Result};
use serde::{Deserialize, Serialize};

use crate::executor::{DEFAULT_ATTEMPTS, RetryPolicy};

/// Legacy reporting table id, with or without the `ga:` prefix.
pub const TABLE_ID_ENV: &str = "GA_TABLE_ID";
/// Data API property id.
pub const PROPERTY_ID_ENV: &str = "GA_PROPERTY_ID";
/// Cache root directory.
pub const OUTPUT_PATH_ENV: &str = "GA_OUTPUT_PATH";
/// Credentials file.
pub const SECRETS_LOCATION_ENV: &str = "GA_SECRETS_LOCATION";
/// Attempts per page.
pub const NUM_ATTEMPTS_ENV: &str = "GA_NUM_ATTEMPTS";
/// Rows per page.
pub const PAGE_SIZE_ENV: &str = "GA_PAGE_SIZE";

/// Runtime settings.
///
/// Missing fields take their [`Default`] values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Legacy reporting table id.
    pub table_id: String,
    /// Data API property id.
    pub property_id: Option<String>,
    /// Cache root directory.
    pub output_path: PathBuf,
    /// Credentials file for the backend.
    pub credentials_path: Option<PathBuf>,
    /// Attempts per page before giving up.
    pub num_attempts: u32,
    /// Rows requested per page.
    pub page_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            table_id: String::new(),
            property_id: None,
            output_path: PathBuf::from("output"),
            credentials_path: None,
            num_attempts: DEFAULT_ATTEMPTS,
            page_size: MAX_RESULTS,
        }
    }
}

impl Settings {
    /// Loads settings from `GA_*` environment variables.
    ///
    /// # Errors
    /// Returns [`MetricsError::NotConfigured`] if a numeric variable doesn't parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads settings through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    /// Returns [`MetricsError::NotConfigured`] if a numeric variable doesn't parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Ok(Self {
            table_id: var(TABLE_ID_ENV).unwrap_or(defaults.table_id),
            property_id: var(PROPERTY_ID_ENV),
            output_path: var(OUTPUT_PATH_ENV).map_or(defaults.output_path, PathBuf::from),
            credentials_path: var(SECRETS_LOCATION_ENV).map(PathBuf::from),
            num_attempts: parse_u32(NUM_ATTEMPTS_ENV, var(NUM_ATTEMPTS_ENV), defaults.num_attempts)?,
            page_size: parse_u32(PAGE_SIZE_ENV, var(PAGE_SIZE_ENV), defaults.page_size)?,
        })
    }

    /// Loads settings from a JSON file.
    ///
    /// # Errors
    /// Returns [`MetricsError::NotConfigured`] if the file can't be read and
    /// [`MetricsError::Parse`] if it isn't valid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            MetricsError::NotConfigured(format!("failed to read {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Checks the settings can drive a client.
    ///
    /// # Errors
    /// Returns [`MetricsError::NotConfigured`] naming the first bad setting.
    pub fn validate(&self) -> Result<()> {
        if self.table_id.trim().is_empty() {
            return Err(MetricsError::NotConfigured(format!(
                "{TABLE_ID_ENV} is required"
            )));
        }
        if self.num_attempts == 0 {
            return Err(MetricsError::NotConfigured(
                "num_attempts must be at least 1".to_string(),
            ));
        }
        if self.page_size == 0 || self.page_size > MAX_RESULTS {
            return Err(MetricsError::NotConfigured(format!(
                "page_size must be between 1 and {MAX_RESULTS}"
            )));
        }
        Ok(())
    }

    /// The retry policy these settings describe.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_attempts(self.num_attempts)
    }

    /// Builds the Google Analytics backend, from the credentials file if one
    /// is set and otherwise from the environment.
    ///
    /// # Errors
    /// Returns [`MetricsError::NotConfigured`] if no credentials can be found.
    #[cfg(feature = "ga")]
    pub async fn backend(&self) -> Result<metrics_ga::GoogleAnalytics> {
        let backend = match &self.credentials_path {
            Some(path) => metrics_ga::GoogleAnalytics::from_credentials_file(path).await?,
            None => metrics_ga::GoogleAnalytics::from_env()?,
        };
        Ok(match &self.property_id {
            Some(property_id) => backend.with_property(property_id.clone()),
            None => backend,
        })
    }
}

fn parse_u32(name: &str, raw: Option<String>, default: u32) -> Result<u32> {
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| MetricsError::NotConfigured(format!("{name}={raw:?}: {e}"))),
    }
}
