//! In-process backend stub for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use metrics_core::{AnalyticsBackend, BackendError, Query, Report};

type Reply = Result<Report, BackendError>;

/// Replays scripted replies in order, then repeats a fallback if one is set.
#[derive(Debug, Default)]
pub(crate) struct ScriptedBackend {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Option<Reply>,
    queries: Mutex<Vec<Query>>,
}

impl ScriptedBackend {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    pub(crate) fn repeating(reply: Reply) -> Self {
        Self {
            fallback: Some(reply),
            ..Self::default()
        }
    }

    /// Repeats `reply` once the scripted replies run out.
    pub(crate) fn with_fallback(mut self, reply: Reply) -> Self {
        self.fallback = Some(reply);
        self
    }

    /// Replies with each page in turn.
    pub(crate) fn paged(pages: Vec<Report>) -> Self {
        Self::new(pages.into_iter().map(Ok).collect())
    }

    pub(crate) fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub(crate) fn queries(&self) -> Vec<Query> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalyticsBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn execute(&self, query: &Query) -> Result<Report, BackendError> {
        self.queries.lock().unwrap().push(query.clone());
        let next = self.replies.lock().unwrap().pop_front();
        next.or_else(|| self.fallback.clone())
            .unwrap_or_else(|| Err(BackendError::Network("no scripted reply left".to_string())))
    }
}
