//! Explicitly constructed client bundle handed to the coordinator.
//!
//! Clients are built once, up front, and passed down; missing credentials
//! fail here, before any unit of work can be dispatched.

use std::sync::Arc;

use crate::config::ModelConfig;
use crate::error::ConfigError;
use crate::llm::{ModelClient, OpenAiCompatClient, StaticModelClient};
use crate::search::{SearchClient, StaticSearchClient, TavilySearchClient};

#[derive(Clone)]
pub struct ResearchClients {
    pub search: Arc<dyn SearchClient>,
    pub model: Arc<dyn ModelClient>,
}

impl ResearchClients {
    pub fn new(search: Arc<dyn SearchClient>, model: Arc<dyn ModelClient>) -> Self {
        Self { search, model }
    }

    /// Real backends, credentials from the environment.
    pub fn from_env(model_config: &ModelConfig) -> Result<Self, ConfigError> {
        let search = TavilySearchClient::from_env()?;
        let model = OpenAiCompatClient::from_env(model_config)?;
        Ok(Self::new(Arc::new(search), Arc::new(model)))
    }

    /// Canned offline clients; no credentials, no network.
    pub fn mock() -> Self {
        Self::new(
            Arc::new(StaticSearchClient::new()),
            Arc::new(StaticModelClient::new("mock-model")),
        )
    }
}
