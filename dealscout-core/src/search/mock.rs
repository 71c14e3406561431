//! Deterministic `SearchClient` for tests and offline (`--mock`) runs.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{SearchClient, SearchResult};
use crate::error::SearchError;

pub struct StaticSearchClient {
    queue: Mutex<VecDeque<Result<Vec<SearchResult>, SearchError>>>,
    calls: AtomicUsize,
}

impl Default for StaticSearchClient {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticSearchClient {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue a result set, served FIFO.
    pub fn with_results(self, results: Vec<SearchResult>) -> Self {
        self.queue
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push_back(Ok(results));
        self
    }

    /// Queue an error, served FIFO alongside result sets.
    pub fn with_error(self, error: SearchError) -> Self {
        self.queue
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push_back(Err(error));
        self
    }

    /// Number of `search` invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn canned(query: &str) -> Vec<SearchResult> {
        vec![SearchResult {
            location: "https://example.com/result".to_string(),
            title: "Example result".to_string(),
            content: format!("Canned search content for query: {query}"),
        }]
    }
}

#[async_trait]
impl SearchClient for StaticSearchClient {
    async fn search(
        &self,
        query: &str,
        _include_domains: &[String],
    ) -> Result<Vec<SearchResult>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let queued = self
            .queue
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front();
        match queued {
            Some(result) => result,
            None => Ok(Self::canned(query)),
        }
    }
}
