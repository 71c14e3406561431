//! Deterministic `ModelClient` for tests and offline (`--mock`) runs. Queued
//! responses are served FIFO; once the queue drains, a canned completion
//! derived from the prompt keeps offline sessions usable.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use super::{Completion, CompletionRequest, ModelClient, Usage};
use crate::error::ModelError;

pub struct StaticModelClient {
    model: String,
    queue: Mutex<VecDeque<Result<String, ModelError>>>,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl StaticModelClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            queue: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Queue a successful completion and return the client for chaining.
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.queue.lock().unwrap_or_else(|p| p.into_inner()).push_back(Ok(text.into()));
        self
    }

    /// Queue an error result alongside responses, FIFO.
    pub fn with_error(self, error: ModelError) -> Self {
        self.queue.lock().unwrap_or_else(|p| p.into_inner()).push_back(Err(error));
        self
    }

    /// Block every `complete` call on the semaphore until the test releases
    /// permits, keeping the calling unit of work in flight deterministically.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Number of `complete` invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn canned(prompt: &str) -> String {
        let head: String = prompt.chars().take(48).collect();
        format!("[mock completion] {head}")
    }
}

#[async_trait]
impl ModelClient for StaticModelClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| ModelError::Network("mock gate closed".into()))?;
            permit.forget();
        }
        let queued = self.queue.lock().unwrap_or_else(|p| p.into_inner()).pop_front();
        let text = match queued {
            Some(result) => result?,
            None => Self::canned(&request.prompt),
        };
        Ok(Completion {
            text,
            model: self.model.clone(),
            usage: Some(Usage {
                prompt_tokens: (request.prompt.len() / 4) as u64,
                completion_tokens: 32,
                total_tokens: (request.prompt.len() / 4) as u64 + 32,
            }),
        })
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
