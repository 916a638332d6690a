/// LLM Client — the single point of entry for all Claude API calls.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// All generation goes through the `TextGenerator` trait so tests can swap in
/// a deterministic stub.
///
/// Model: claude-sonnet-4-5 (hardcoded — do not make configurable to prevent drift)
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::errors::ResumeError;
use crate::generation::tone::Tone;
use crate::llm_client::prompts::PLAIN_TEXT_SYSTEM;

pub mod prompts;
pub mod retry;

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 1024;
const TEMPERATURE: f32 = 0.7;

/// The AI generation collaborator: one prompt in, generated text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, tone: Tone) -> Result<String, ResumeError>;
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl From<LlmError> for ResumeError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Http(e) if e.is_timeout() => {
                ResumeError::ServiceUnavailable(format!("request timed out: {e}"))
            }
            LlmError::Http(e) if e.is_decode() => ResumeError::InvalidResponse(e.to_string()),
            LlmError::Http(e) => ResumeError::ServiceUnavailable(e.to_string()),
            LlmError::Api { status: 429, message } => ResumeError::RateLimited(message),
            LlmError::Api { status, message } if status >= 500 => {
                ResumeError::ServiceUnavailable(format!("status {status}: {message}"))
            }
            e @ LlmError::Api { .. } => ResumeError::InvalidResponse(e.to_string()),
            e @ (LlmError::Parse(_) | LlmError::EmptyContent) => {
                ResumeError::InvalidResponse(e.to_string())
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Anthropic Messages API client. Makes exactly one attempt per call;
/// wrap it in [`retry::Retrying`] for backoff on transient failures.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
}

impl LlmClient {
    pub fn new(api_key: String, api_url: String, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            api_url,
        })
    }

    /// Makes a raw call to the Claude API, returning the full response object.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            system: system.to_string(),
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Try to parse error message
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let llm_response: LlmResponse = serde_json::from_str(&body)?;

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            llm_response.usage.input_tokens, llm_response.usage.output_tokens
        );

        Ok(llm_response)
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str, tone: Tone) -> Result<String, ResumeError> {
        let system = format!("{PLAIN_TEXT_SYSTEM} Write in a {tone} register.");
        let response = self.call(prompt, &system).await?;
        let text = response
            .text()
            .filter(|t| !t.trim().is_empty())
            .ok_or(LlmError::EmptyContent)?;
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::ServerGuard) -> LlmClient {
        LlmClient::new(
            "sk-test".to_string(),
            format!("{}/v1/messages", server.url()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_returns_first_text_block() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "sk-test")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"content":[{"type":"text","text":"OBJECTIVE:\nShip it."}],
                    "usage":{"input_tokens":12,"output_tokens":5}}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let text = client_for(&server)
            .generate("prompt", Tone::Professional)
            .await
            .unwrap();
        assert_eq!(text, "OBJECTIVE:\nShip it.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_429_maps_to_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/messages")
            .with_status(429)
            .with_body(r#"{"error":{"type":"rate_limit_error","message":"slow down"}}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .generate("prompt", Tone::Professional)
            .await
            .unwrap_err();
        assert!(matches!(err, ResumeError::RateLimited(ref m) if m == "slow down"));
    }

    #[tokio::test]
    async fn test_5xx_maps_to_service_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/messages")
            .with_status(529)
            .with_body("overloaded")
            .create_async()
            .await;

        let err = client_for(&server)
            .generate("prompt", Tone::Formal)
            .await
            .unwrap_err();
        assert!(matches!(err, ResumeError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_bad_body_maps_to_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let err = client_for(&server)
            .generate("prompt", Tone::Professional)
            .await
            .unwrap_err();
        assert!(matches!(err, ResumeError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_empty_text_maps_to_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"  "}],"usage":{"input_tokens":1,"output_tokens":0}}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .generate("prompt", Tone::Professional)
            .await
            .unwrap_err();
        assert!(matches!(err, ResumeError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_400_is_not_transient() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/messages")
            .with_status(400)
            .with_body(r#"{"error":{"type":"invalid_request_error","message":"prompt too long"}}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .generate("prompt", Tone::Professional)
            .await
            .unwrap_err();
        assert!(!err.is_transient());
        assert!(err.to_string().contains("prompt too long"));
    }
}
