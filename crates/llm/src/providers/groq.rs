//! Groq LLM provider implementation.
//!
//! Groq exposes an OpenAI-compatible chat completions API. The client sends
//! the system instruction and the assembled prompt as separate messages and
//! reads the first choice back.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use lexrag_core::{AppError, AppResult, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_GROQ_URL: &str = "https://api.groq.com/openai/v1";

/// Groq chat completions request format.
#[derive(Debug, Serialize)]
struct GroqRequest {
    model: String,
    messages: Vec<GroqMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct GroqMessage {
    role: &'static str,
    content: String,
}

/// Groq chat completions response format.
#[derive(Debug, Deserialize)]
struct GroqResponse {
    model: String,
    choices: Vec<GroqChoice>,
    #[serde(default)]
    usage: Option<GroqUsage>,
}

#[derive(Debug, Deserialize)]
struct GroqChoice {
    message: GroqChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct GroqChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct GroqUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Groq LLM client.
pub struct GroqClient {
    /// Base URL for the Groq API
    base_url: String,

    /// Bearer API key
    api_key: String,

    /// HTTP client with per-request timeout applied
    client: reqwest::Client,

    /// Retry policy for transient failures
    retry: RetryPolicy,
}

impl GroqClient {
    /// Create a new Groq client with the default endpoint.
    pub fn new(api_key: impl Into<String>, retry: RetryPolicy) -> AppResult<Self> {
        Self::with_base_url(DEFAULT_GROQ_URL, api_key, retry)
    }

    /// Create a new Groq client with a custom base URL.
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        retry: RetryPolicy,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(retry.timeout_secs))
            .build()
            .map_err(|e| AppError::Generation(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client,
            retry,
        })
    }

    /// Convert LlmRequest to Groq chat format.
    fn to_groq_request(&self, request: &LlmRequest) -> GroqRequest {
        let mut messages = Vec::new();

        if let Some(system) = &request.system {
            messages.push(GroqMessage {
                role: "system",
                content: system.clone(),
            });
        }

        messages.push(GroqMessage {
            role: "user",
            content: request.prompt.clone(),
        });

        GroqRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }

    /// Single completion attempt (no retries).
    async fn complete_once(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let groq_request = self.to_groq_request(request);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&groq_request)
            .send()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to send request to Groq: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Generation(format!(
                "Groq API error ({}): {}",
                status, error_text
            )));
        }

        let groq_response: GroqResponse = response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to parse Groq response: {}", e)))?;

        let content = groq_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::Generation("Groq returned no choices".to_string()))?;

        let usage = groq_response
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: groq_response.model,
            usage,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for GroqClient {
    fn provider_name(&self) -> &str {
        "groq"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending completion request to Groq (model: {})", request.model);

        let mut attempt = 0;
        let mut last_error = None;

        while attempt < self.retry.max_attempts {
            match self.complete_once(request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    attempt += 1;
                    last_error = Some(e);

                    if attempt < self.retry.max_attempts {
                        let backoff_ms = self.retry.initial_backoff_ms * 2_u64.pow(attempt);
                        tracing::warn!(
                            "Groq completion failed (attempt {}/{}), retrying in {}ms",
                            attempt,
                            self.retry.max_attempts,
                            backoff_ms
                        );
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AppError::Generation("Unknown completion error".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groq_request_conversion() {
        let client = GroqClient::new("test-key", RetryPolicy::default()).unwrap();
        let request = LlmRequest::new("Hello", "llama-3.3-70b-versatile")
            .with_temperature(0.1)
            .with_system("Be brief.");

        let groq_req = client.to_groq_request(&request);
        assert_eq!(groq_req.model, "llama-3.3-70b-versatile");
        assert_eq!(groq_req.messages.len(), 2);
        assert_eq!(groq_req.messages[0].role, "system");
        assert_eq!(groq_req.messages[1].role, "user");
        assert_eq!(groq_req.messages[1].content, "Hello");
        assert_eq!(groq_req.temperature, Some(0.1));
    }

    #[test]
    fn test_groq_request_without_system() {
        let client = GroqClient::new("test-key", RetryPolicy::default()).unwrap();
        let request = LlmRequest::new("Hello", "llama-3.3-70b-versatile");

        let groq_req = client.to_groq_request(&request);
        assert_eq!(groq_req.messages.len(), 1);
        assert_eq!(groq_req.messages[0].role, "user");
    }

    #[test]
    fn test_provider_name() {
        let client = GroqClient::new("test-key", RetryPolicy::default()).unwrap();
        assert_eq!(client.provider_name(), "groq");
    }
}
