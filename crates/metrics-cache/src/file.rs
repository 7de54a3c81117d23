//! JSON file cache implementation.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use metrics_core::validate::is_cacheable_end;
use metrics_core::{DateRange, MetricsError, Report, Result, ResultCache, ResultType};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// Cache that keeps one JSON file per result type and date range.
///
/// Files live at `<root>/<result type>/<range>.json`, where a single day range
/// is written as `YYYY-MM-DD` and anything longer as `YYYY-MM-DD_YYYY-MM-DD`.
/// Reports are sanitized and written with sorted keys and a four space indent,
/// so identical reports produce identical files.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    /// Create a cache rooted at `root`.
    ///
    /// Directories are created lazily on the first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the report for a result type and range is stored.
    #[must_use]
    pub fn path(&self, result_type: ResultType, range: DateRange) -> PathBuf {
        self.root
            .join(result_type.as_str())
            .join(format!("{range}.json"))
    }

    /// Writes a report to `path` without any freshness check, creating parent
    /// directories as needed.
    ///
    /// # Errors
    /// Returns [`MetricsError::Cache`] if a directory or the file can't be written.
    pub async fn write_report(path: &Path, report: &Report) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                MetricsError::Cache(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let body = to_pretty_json(report.clone().sanitized())?;
        tokio::fs::write(path, body)
            .await
            .map_err(|e| MetricsError::Cache(format!("failed to write {}: {e}", path.display())))
    }

    /// Reads a report from `path`, `None` if there is no such file.
    ///
    /// # Errors
    /// Returns [`MetricsError::Cache`] if the file can't be read and
    /// [`MetricsError::Parse`] if it isn't a JSON object.
    pub async fn read_report(path: &Path) -> Result<Option<Report>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(MetricsError::Cache(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };
        let value: Value = serde_json::from_slice(&bytes)?;
        Report::from_value(value).map(Some)
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sort_keys(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

fn to_pretty_json(report: Report) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    sort_keys(report.into_value()).serialize(&mut ser)?;
    Ok(buf)
}

#[async_trait]
impl ResultCache for FileCache {
    #[instrument(skip(self, range), fields(range = %range))]
    async fn get(&self, result_type: ResultType, range: DateRange) -> Result<Option<Report>> {
        let path = self.path(result_type, range);
        let report = Self::read_report(&path).await?;
        if report.is_some() {
            debug!(path = %path.display(), "cache hit");
        } else {
            debug!(path = %path.display(), "cache miss");
        }
        Ok(report)
    }

    #[instrument(skip(self, range, report), fields(range = %range))]
    async fn put(&self, result_type: ResultType, range: DateRange, report: &Report) -> Result<bool> {
        if !is_cacheable_end(range.to_date(), Self::today()) {
            warn!("refusing to cache potentially partial or empty results");
            return Ok(false);
        }
        let path = self.path(result_type, range);
        Self::write_report(&path, report).await?;
        debug!(path = %path.display(), rows = report.rows().len(), "cached report");
        Ok(true)
    }

    async fn contains(&self, result_type: ResultType, range: DateRange) -> Result<bool> {
        let path = self.path(result_type, range);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| MetricsError::Cache(format!("failed to stat {}: {e}", path.display())))
    }
}
