//! HTTP adapter for the hosted chat-completion API.
//!
//! Speaks the common `/v1/chat/completions` request shape; the configured
//! base URL selects the provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use severatee_application::{ChatCompletionClient, CompletionMessage};
use severatee_core::{AppError, AppResult};

/// Configuration for the completion endpoint.
#[derive(Clone)]
pub struct HttpChatCompletionConfig {
    /// API base URL, without a trailing slash.
    pub base_url: String,
    /// Bearer token for the API.
    pub api_key: String,
    /// Model identifier sent with every request.
    pub model: String,
}

/// Chat-completion adapter backed by the provider's REST API.
#[derive(Clone)]
pub struct HttpChatCompletionClient {
    client: reqwest::Client,
    config: HttpChatCompletionConfig,
}

impl HttpChatCompletionClient {
    /// Creates a completion client with its own connection pool.
    #[must_use]
    pub fn new(config: HttpChatCompletionConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[async_trait]
impl ChatCompletionClient for HttpChatCompletionClient {
    async fn complete(&self, messages: &[CompletionMessage]) -> AppResult<String> {
        let request = CompletionRequest {
            model: &self.config.model,
            messages: messages
                .iter()
                .map(|message| RequestMessage {
                    role: message.role.as_str(),
                    content: &message.content,
                })
                .collect(),
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("completion request failed: {error}")))?;

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "completion API returned status {}",
                response.status()
            )));
        }

        let completion: CompletionResponse = response.json().await.map_err(|error| {
            AppError::Internal(format!("failed to decode completion response: {error}"))
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::Internal("completion API returned no choices".to_owned()))
    }
}
