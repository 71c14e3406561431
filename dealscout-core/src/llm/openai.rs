use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use super::{Completion, CompletionRequest, ModelClient, Usage, pricing};
use crate::config::constants::{env_vars, urls};
use crate::config::ModelConfig;
use crate::error::{ConfigError, ModelError};

/// Client for any OpenAI-compatible chat-completions endpoint. Which hosted
/// model it talks to is configuration, not part of the pipeline contract.
pub struct OpenAiCompatClient {
    api_key: String,
    http_client: HttpClient,
    base_url: String,
    model: String,
    temperature: Option<f32>,
}

impl OpenAiCompatClient {
    pub fn new(api_key: String, config: &ModelConfig) -> Self {
        Self {
            api_key,
            http_client: HttpClient::new(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| urls::OPENAI_API_BASE.to_string()),
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    /// Build a client from the environment. A missing API key is a
    /// construction failure, surfaced before anything can be dispatched.
    pub fn from_env(config: &ModelConfig) -> Result<Self, ConfigError> {
        let api_key = std::env::var(env_vars::OPENAI_API_KEY)
            .map_err(|_| ConfigError::MissingCredential(env_vars::OPENAI_API_KEY))?;
        Ok(Self::new(api_key, config))
    }

    fn request_body(&self, request: &CompletionRequest) -> Value {
        let mut body = Map::new();
        body.insert("model".to_string(), json!(self.model));
        body.insert("max_tokens".to_string(), json!(request.max_tokens));
        body.insert(
            "messages".to_string(),
            json!([{ "role": request.role, "content": request.prompt }]),
        );
        if let Some(temperature) = self.temperature {
            body.insert("temperature".to_string(), json!(temperature));
        }
        Value::Object(body)
    }

    fn log_cost_estimate(&self, usage: Option<&Usage>) {
        let Some(usage) = usage else {
            debug!(model = %self.model, "backend reported no token usage");
            return;
        };
        match pricing::estimate_cost(&self.model, usage) {
            Some(cost) => info!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                estimated_cost_usd = %format!("{cost:.6}"),
                "completion usage"
            ),
            None => warn!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "no pricing entry for model; cost estimate unavailable"
            ),
        }
    }
}

#[async_trait]
impl ModelClient for OpenAiCompatClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ModelError> {
        info!(
            model = %self.model,
            max_tokens = request.max_tokens,
            role = %request.role,
            prompt_chars = request.prompt.len(),
            "sending completion request"
        );

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(&request))
            .send()
            .await
            .map_err(|err| ModelError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(ModelError::Authentication(message));
            }
            return Err(ModelError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| ModelError::InvalidResponse(err.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ModelError::InvalidResponse("response carried no choices".into()))?;

        let usage = parsed.usage.map(|raw| Usage {
            prompt_tokens: raw.prompt_tokens,
            completion_tokens: raw.completion_tokens,
            total_tokens: raw.total_tokens,
        });
        self.log_cost_estimate(usage.as_ref());

        Ok(Completion {
            text,
            model: self.model.clone(),
            usage,
        })
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<RawUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Deserialize)]
struct RawUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}
