/// LLM Client: the single point of entry for all hosted-model calls.
///
/// No other module may talk to a provider API directly. Agents hold an
/// `LlmClient`, which owns the retry policy and JSON extraction; the wire
/// format of each vendor lives behind the `LlmProvider` trait.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{Config, LlmProviderKind};

pub mod anthropic;
pub mod gemini;
pub mod prompts;
#[cfg(test)]
pub mod testing;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content (API may be overloaded)")]
    EmptyContent,

    #[error("LLM unavailable after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<LlmError> },
}

impl LlmError {
    /// Rate limits, 5xx, transport failures and empty bodies are worth another try.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmError::EmptyContent => true,
            LlmError::Parse(_) | LlmError::RetriesExhausted { .. } => false,
        }
    }
}

/// One completion request, independent of vendor.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub prompt: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Text returned by a provider plus token accounting.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A hosted LLM backend. Implementations make exactly one HTTP call per
/// `complete` and never retry; `LlmClient` owns that policy.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn model(&self) -> &str;
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion, LlmError>;
}

/// Linear backoff: waits `base_delay * attempt` between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

/// The single LLM client used by every tailoring agent.
#[derive(Clone)]
pub struct LlmClient {
    provider: Arc<dyn LlmProvider>,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            retry: RetryPolicy::default(),
        }
    }

    /// Builds the configured provider with a shared HTTP client.
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        let provider: Arc<dyn LlmProvider> = match config.llm_provider {
            LlmProviderKind::Gemini => {
                Arc::new(GeminiProvider::new(http, config.llm_api_key.clone()))
            }
            LlmProviderKind::Anthropic => {
                Arc::new(AnthropicProvider::new(http, config.llm_api_key.clone()))
            }
        };
        Ok(Self::new(provider))
    }

    #[cfg(test)]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Calls the provider, retrying retryable failures with linear backoff.
    pub async fn call(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<Completion, LlmError> {
        let request = CompletionRequest {
            prompt,
            max_tokens,
            temperature,
        };
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.provider.complete(&request).await {
                Ok(completion) if completion.text.trim().is_empty() => {
                    self.note_failure(LlmError::EmptyContent, attempt, max_attempts)
                        .await?;
                }
                Ok(completion) => {
                    debug!(
                        "LLM call succeeded ({}): input_tokens={}, output_tokens={}",
                        self.provider.name(),
                        completion.input_tokens,
                        completion.output_tokens
                    );
                    return Ok(completion);
                }
                Err(e) => self.note_failure(e, attempt, max_attempts).await?,
            }
        }
    }

    /// Returns `Ok` after sleeping when another attempt should be made.
    async fn note_failure(
        &self,
        error: LlmError,
        attempt: u32,
        max_attempts: u32,
    ) -> Result<(), LlmError> {
        if !error.is_retryable() {
            return Err(error);
        }
        if attempt >= max_attempts {
            return Err(LlmError::RetriesExhausted {
                attempts: attempt,
                last: Box::new(error),
            });
        }

        let delay = self.retry.base_delay * attempt;
        warn!(
            "LLM call attempt {}/{} failed ({}), retrying after {}ms...",
            attempt,
            max_attempts,
            error,
            delay.as_millis()
        );
        tokio::time::sleep(delay).await;
        Ok(())
    }

    /// Calls the LLM at temperature 0 and deserializes the response as JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<T, LlmError> {
        let prompt = format!("{prompt}\n\n{}", prompts::json_only_suffix(max_tokens));
        let completion = self.call(&prompt, max_tokens, 0.0).await?;

        let text = strip_json_fences(&completion.text);
        if text.is_empty() {
            return Err(LlmError::EmptyContent);
        }

        serde_json::from_str(text).map_err(LlmError::Parse)
    }

    /// Single un-retried call used by the health endpoint.
    pub async fn ping(&self) -> bool {
        let request = CompletionRequest {
            prompt: "test",
            max_tokens: 100,
            temperature: 0.7,
        };
        matches!(
            self.provider.complete(&request).await,
            Ok(completion) if !completion.text.trim().is_empty()
        )
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::testing::ScriptedProvider;
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Sample {
        key: String,
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_unterminated() {
        assert_eq!(strip_json_fences("```json\n{\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn test_retryable_classification() {
        let api = |status| LlmError::Api {
            status,
            message: String::new(),
        };
        assert!(api(503).is_retryable());
        assert!(api(429).is_retryable());
        assert!(!api(400).is_retryable());
        assert!(LlmError::EmptyContent.is_retryable());
    }

    #[tokio::test]
    async fn test_call_retries_server_errors_then_succeeds() {
        let provider = ScriptedProvider::new()
            .then_err(LlmError::Api {
                status: 503,
                message: "overloaded".into(),
            })
            .then_ok("")
            .then_ok("hello");
        let client = ScriptedProvider::client(provider.clone());

        let completion = client.call("prompt", 100, 0.5).await.unwrap();
        assert_eq!(completion.text, "hello");
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_call_does_not_retry_client_errors() {
        let provider = ScriptedProvider::new()
            .then_err(LlmError::Api {
                status: 400,
                message: "bad request".into(),
            })
            .then_ok("never reached");
        let client = ScriptedProvider::client(provider.clone());

        let err = client.call("prompt", 100, 0.5).await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 400, .. }));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_call_gives_up_after_max_attempts() {
        let provider = ScriptedProvider::new();
        for _ in 0..5 {
            provider.push_err(LlmError::Api {
                status: 500,
                message: "down".into(),
            });
        }
        let client = ScriptedProvider::client(provider.clone());

        let err = client.call("prompt", 100, 0.5).await.unwrap_err();
        assert!(matches!(err, LlmError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_call_json_strips_fences_and_appends_instruction() {
        let provider = ScriptedProvider::new().then_ok("```json\n{\"key\": \"v\"}\n```");
        let client = ScriptedProvider::client(provider.clone());

        let sample: Sample = client.call_json("Give me JSON", 6000).await.unwrap();
        assert_eq!(sample.key, "v");

        let prompts = provider.prompts();
        assert!(prompts[0].starts_with("Give me JSON"));
        assert!(prompts[0].contains("Return ONLY valid JSON"));
        assert!(prompts[0].contains("6000 tokens"));
    }

    #[tokio::test]
    async fn test_call_json_rejects_empty_fenced_body() {
        let provider = ScriptedProvider::new().then_ok("```json\n```");
        let client = ScriptedProvider::client(provider);

        let err = client.call_json::<Sample>("p", 10).await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }

    #[tokio::test]
    async fn test_call_json_reports_parse_errors() {
        let provider = ScriptedProvider::new().then_ok("not json at all");
        let client = ScriptedProvider::client(provider);

        let err = client.call_json::<Sample>("p", 10).await.unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
    }

    #[tokio::test]
    async fn test_ping_does_not_retry() {
        let provider = ScriptedProvider::new().then_err(LlmError::Api {
            status: 503,
            message: "down".into(),
        });
        let client = ScriptedProvider::client(provider.clone());

        assert!(!client.ping().await);
        assert_eq!(provider.call_count(), 1);
    }
}
