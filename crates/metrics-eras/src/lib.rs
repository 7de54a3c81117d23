#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/article-metrics/article-metrics/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Era strategies for article metrics queries.
//!
//! - [`pick`] - Chooses the [`Strategy`] for a date range
//! - [`Strategy`] - Builds queries and parses rows for one era
//! - [`RULES`] - The ordered dispatch table behind [`pick`]

/// Era thresholds and dispatch.
pub mod dispatch;
/// The era strategy enum.
pub mod strategy;

mod parse;
mod v1;
mod v2;
mod v3;
mod v4;
mod v5;
mod v6;
mod v7;

pub use dispatch::{
    API_SWITCH, EXECUTABLE_ADDITION, RULES, Rule, SITE_SWITCH, SITE_SWITCH_V2, URL_PARAMS,
    VERSIONLESS_URLS, matching_rule, pick,
};
pub use strategy::Strategy;
