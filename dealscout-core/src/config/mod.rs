//! Configuration: model settings, credential names, and storage locations.
//!
//! Everything here is resolved once at startup. Missing credentials surface
//! as [`ConfigError`](crate::error::ConfigError) when a client is built, never
//! later inside a dispatched unit of work.

mod workflow_file;

pub use workflow_file::load_workflow_file;

use std::path::PathBuf;

/// Centralized names so callers and docs agree on spelling.
pub mod constants {
    pub mod env_vars {
        pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
        pub const TAVILY_API_KEY: &str = "TAVILY_API_KEY";
        pub const MODEL: &str = "DEALSCOUT_MODEL";
        pub const MODEL_BASE_URL: &str = "DEALSCOUT_MODEL_BASE_URL";
        pub const CACHE_DIR: &str = "DEALSCOUT_CACHE_DIR";
    }

    pub mod urls {
        pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
        pub const TAVILY_API_BASE: &str = "https://api.tavily.com";
    }

    pub mod defaults {
        pub const MODEL: &str = "gpt-4o-mini";
        pub const TEMPERATURE: f32 = 0.5;
        pub const MAX_SEARCH_RESULTS: u32 = 5;
    }
}

/// Completion backend settings.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model: String,
    /// Override for OpenAI-compatible gateways; `None` means the default API.
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: constants::defaults::MODEL.to_string(),
            base_url: None,
            temperature: Some(constants::defaults::TEMPERATURE),
            max_tokens: crate::llm::DEFAULT_MAX_TOKENS,
        }
    }
}

impl ModelConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(model) = std::env::var(constants::env_vars::MODEL) {
            if !model.trim().is_empty() {
                config.model = model;
            }
        }
        if let Ok(base_url) = std::env::var(constants::env_vars::MODEL_BASE_URL) {
            if !base_url.trim().is_empty() {
                config.base_url = Some(base_url.trim_end_matches('/').to_string());
            }
        }
        config
    }
}

/// Where cached results live. `DEALSCOUT_CACHE_DIR` wins, then the platform
/// cache directory, then a dot directory in the working tree.
pub fn cache_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(constants::env_vars::CACHE_DIR) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::cache_dir()
        .map(|base| base.join("dealscout"))
        .unwrap_or_else(|| PathBuf::from(".dealscout-cache"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_config_matches_constants() {
        let config = ModelConfig::default();
        assert_eq!(config.model, constants::defaults::MODEL);
        assert_eq!(config.temperature, Some(constants::defaults::TEMPERATURE));
        assert_eq!(config.max_tokens, 1024);
    }
}
