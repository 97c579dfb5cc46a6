//! OpenAI-compatible chat-completion backend.
//!
//! Posts to `{base_url}/chat/completions` and returns the content of the
//! first choice. The API key is held as a [`SecretString`] and is only
//! exposed while building the `Authorization` header.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use voxquery_core::config::CompletionConfig;
use voxquery_core::types::PromptMessage;

use crate::{CompletionBackend, LlmError};

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// =============================================================================
// Backend
// =============================================================================

/// Read an API key from the named environment variable.
pub fn api_key_from_env(var: &str) -> Result<SecretString, LlmError> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(SecretString::from(key)),
        _ => Err(LlmError::MissingApiKey(var.to_string())),
    }
}

/// Chat-completion client for OpenAI and compatible servers.
pub struct OpenAiCompatibleBackend {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    temperature: Option<f32>,
}

// No Debug derive: keeps the client configuration and key holder out of logs.

impl OpenAiCompatibleBackend {
    /// Build a backend from configuration and an already-resolved key.
    pub fn from_config(config: &CompletionConfig, api_key: SecretString) -> Result<Self, LlmError> {
        // The engine enforces its own deadline; this one only guards a hung socket.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1).saturating_mul(2)))
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn to_request<'a>(&'a self, messages: &'a [PromptMessage]) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: self.temperature,
        }
    }
}

impl CompletionBackend for OpenAiCompatibleBackend {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String, LlmError> {
        let body = self.to_request(messages);
        tracing::debug!(
            model = %self.model,
            messages = messages.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(self.url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => LlmError::AuthenticationFailed,
                429 => LlmError::RateLimited,
                _ => LlmError::Provider {
                    message: format!("HTTP {status}: {error_body}"),
                },
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(LlmError::EmptyResponse)?;

        tracing::debug!(reply_len = content.len(), "Completion received");
        Ok(content)
    }
}
