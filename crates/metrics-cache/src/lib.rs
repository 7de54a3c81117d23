#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/article-metrics/article-metrics/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Caching implementations for raw analytics reports.
//!
//! This crate provides implementations of the [`ResultCache`] trait from `metrics-core`:
//!
//! - [`FileCache`] - Persistent JSON files, one per result type and range (default)
//! - [`InMemoryCache`] - Simple in-memory cache for testing
//! - [`NoopCache`] - No-op cache that doesn't store anything

/// JSON file cache implementation.
pub mod file;
/// In-memory cache implementation.
pub mod memory;
/// No-op cache implementation.
pub mod noop;

// Re-export the trait for convenience
pub use metrics_core::ResultCache;

// Re-export implementations
pub use file::FileCache;
pub use memory::InMemoryCache;
pub use noop::NoopCache;
