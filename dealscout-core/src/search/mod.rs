//! Search client abstraction: a query plus an optional domain allow-list in,
//! ranked result records out. The wire protocol lives behind the trait.

mod mock;
mod tavily;

pub use mock::StaticSearchClient;
pub use tavily::TavilySearchClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// One ranked search hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    /// Where the content was found, usually a URL.
    pub location: String,
    #[serde(default)]
    pub title: String,
    pub content: String,
}

#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Run the query. An empty `include_domains` slice means no restriction.
    async fn search(
        &self,
        query: &str,
        include_domains: &[String],
    ) -> Result<Vec<SearchResult>, SearchError>;
}
