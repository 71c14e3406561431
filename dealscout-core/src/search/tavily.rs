use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::info;

use super::{SearchClient, SearchResult};
use crate::config::constants::{defaults, env_vars, urls};
use crate::error::{ConfigError, SearchError};

/// Tavily search backend. Basic depth, raw page content included so the
/// analysis prompt can quote from the page rather than the snippet.
pub struct TavilySearchClient {
    api_key: String,
    http_client: HttpClient,
    base_url: String,
    max_results: u32,
}

impl TavilySearchClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            http_client: HttpClient::new(),
            base_url: urls::TAVILY_API_BASE.to_string(),
            max_results: defaults::MAX_SEARCH_RESULTS,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var(env_vars::TAVILY_API_KEY)
            .map_err(|_| ConfigError::MissingCredential(env_vars::TAVILY_API_KEY))?;
        Ok(Self::new(api_key))
    }

    fn request_body(&self, query: &str, include_domains: &[String]) -> Value {
        let mut body = Map::new();
        body.insert("api_key".to_string(), json!(self.api_key));
        body.insert("query".to_string(), json!(query));
        body.insert("search_depth".to_string(), json!("basic"));
        body.insert("max_results".to_string(), json!(self.max_results));
        body.insert("include_raw_content".to_string(), json!(true));
        if !include_domains.is_empty() {
            body.insert("include_domains".to_string(), json!(include_domains));
        }
        Value::Object(body)
    }
}

#[async_trait]
impl SearchClient for TavilySearchClient {
    async fn search(
        &self,
        query: &str,
        include_domains: &[String],
    ) -> Result<Vec<SearchResult>, SearchError> {
        info!(
            query,
            domains = include_domains.len(),
            max_results = self.max_results,
            "sending search request"
        );

        let response = self
            .http_client
            .post(format!("{}/search", self.base_url))
            .json(&self.request_body(query, include_domains))
            .send()
            .await
            .map_err(|err| SearchError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|err| SearchError::InvalidResponse(err.to_string()))?;

        Ok(parsed
            .results
            .into_iter()
            .map(|hit| SearchResult {
                location: hit.url,
                title: hit.title,
                // Prefer the full page text when Tavily returned it.
                content: match hit.raw_content {
                    Some(raw) if !raw.is_empty() => raw,
                    _ => hit.content,
                },
            })
            .collect())
    }
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyHit>,
}

#[derive(Deserialize)]
struct TavilyHit {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    raw_content: Option<String>,
}
