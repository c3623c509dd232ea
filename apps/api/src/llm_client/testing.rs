//! Scripted in-memory provider for exercising agents without network access.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{Completion, CompletionRequest, LlmClient, LlmError, LlmProvider, RetryPolicy};

#[derive(Default)]
struct Script {
    responses: VecDeque<Result<String, LlmError>>,
    prompts: Vec<String>,
}

/// Replays queued responses in order and records every prompt it receives.
/// An exhausted script answers with a non-retryable 400.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    script: Arc<Mutex<Script>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// An `LlmClient` over `provider` that retries without sleeping.
    pub fn client(provider: ScriptedProvider) -> LlmClient {
        LlmClient::new(Arc::new(provider)).with_retry_policy(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
        })
    }

    pub fn then_ok(self, text: &str) -> Self {
        self.push_ok(text);
        self
    }

    pub fn then_err(self, error: LlmError) -> Self {
        self.push_err(error);
        self
    }

    pub fn then_json(self, value: serde_json::Value) -> Self {
        self.push_ok(&value.to_string());
        self
    }

    pub fn push_ok(&self, text: &str) {
        self.lock().responses.push_back(Ok(text.to_string()));
    }

    pub fn push_err(&self, error: LlmError) {
        self.lock().responses.push_back(Err(error));
    }

    pub fn call_count(&self) -> usize {
        self.lock().prompts.len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.lock().prompts.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion, LlmError> {
        let mut script = self.lock();
        script.prompts.push(request.prompt.to_string());
        match script.responses.pop_front() {
            Some(Ok(text)) => Ok(Completion {
                text,
                input_tokens: 0,
                output_tokens: 0,
            }),
            Some(Err(e)) => Err(e),
            None => Err(LlmError::Api {
                status: 400,
                message: "script exhausted".to_string(),
            }),
        }
    }
}
