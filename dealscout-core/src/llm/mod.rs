//! Model client abstraction.
//!
//! A [`ModelClient`] turns a prompt into completion text. The trait hides the
//! backend wire protocol; the pipeline only depends on the contract here.
//! Providers log their request parameters and a best-effort cost estimate as
//! structured tracing records.

mod mock;
mod openai;
pub mod pricing;

pub use mock::StaticModelClient;
pub use openai::OpenAiCompatClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Default completion budget when the caller does not specify one.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// One completion request. `role` is almost always `"user"`.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub role: String,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            role: "user".to_string(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Token usage reported by the backend.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Completion text plus whatever accounting the backend returned.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub usage: Option<Usage>,
}

/// Memoized completion: identical (model, prompt) pairs reuse the cached
/// text without re-hitting the backend.
pub async fn complete_cached(
    model: &dyn ModelClient,
    cache: &crate::cache::ResultCache,
    request: CompletionRequest,
) -> Result<String, ModelError> {
    let model_id = model.model_id().to_string();
    let prompt = request.prompt.clone();
    let max_tokens = request.max_tokens.to_string();
    let role = request.role.clone();
    cache
        .get_or_compute(
            "model_complete",
            &[model_id.as_str(), prompt.as_str(), max_tokens.as_str(), role.as_str()],
            || async move { model.complete(request).await.map(|completion| completion.text) },
        )
        .await
}

/// Backend-agnostic completion client.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send the prompt and return the completion. Backend errors propagate
    /// unmodified; cost-estimation failures never fail the call.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ModelError>;

    /// Identifier of the underlying model, for logging and cache keys.
    fn model_id(&self) -> &str;
}
