//! Groq LLM client implementation.
//!
//! Implements the LlmClient trait for Groq's OpenAI-compatible
//! chat-completions API. Any other service speaking the same protocol can be
//! targeted by overriding the base URL.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{AgentError, Result};
use crate::llm::types::CompletionRequest;
use crate::llm::LlmClient;
use crate::retry::RetryPolicy;

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Groq OpenAI-compatible API base URL.
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

/// Model used for both synthesis and summarization.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Groq client configuration.
#[derive(Clone)]
pub struct GroqConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Model to use (e.g., "llama-3.3-70b-versatile").
    pub model: String,
    /// API base URL, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Retry policy for transport failures.
    pub retry: RetryPolicy,
}

impl GroqConfig {
    /// Creates a new config with the given API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: GROQ_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry: RetryPolicy::none(),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl fmt::Debug for GroqConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroqConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Groq LLM client.
#[derive(Debug, Clone)]
pub struct GroqClient {
    config: GroqConfig,
    client: Client,
    endpoint: String,
}

impl GroqClient {
    /// Creates a new Groq client with the given configuration.
    pub fn new(config: GroqConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::llm(format!("Failed to create HTTP client: {}", e)))?;

        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        Ok(Self {
            config,
            client,
            endpoint,
        })
    }

    /// Returns the chat-completions URL this client posts to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Extracts the first choice's content from a successful response body.
    fn parse_completion(body: &str) -> Result<Option<String>> {
        let response: ChatResponse = serde_json::from_str(body)
            .map_err(|e| AgentError::llm(format!("Failed to parse response: {}", e)))?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content))
    }

    /// Parses an API error response and returns (error, is_retryable).
    fn parse_error(status: reqwest::StatusCode, body: &str) -> (AgentError, bool) {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return (
                AgentError::llm("Authentication failed. Check your GROQ_API_KEY."),
                false,
            );
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return (
                AgentError::llm("Rate limited. Please wait and try again."),
                true,
            );
        }

        let is_retryable = status.is_server_error();

        if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(body) {
            return (
                AgentError::llm(format!("Groq API error: {}", error_response.error.message)),
                is_retryable,
            );
        }

        (
            AgentError::llm(format!("Groq API error ({}): {}", status, body)),
            is_retryable,
        )
    }

    fn describe_request_error(error: &reqwest::Error) -> AgentError {
        if error.is_timeout() {
            AgentError::llm("Request timed out. Try again.")
        } else if error.is_connect() {
            AgentError::llm("Failed to connect to the completion API. Check your network.")
        } else {
            AgentError::llm(format!("Request failed: {}", error))
        }
    }

    /// Determines if a request error is retryable.
    fn is_retryable_request_error(error: &reqwest::Error) -> bool {
        error.is_timeout() || error.is_connect()
    }
}

#[async_trait]
impl LlmClient for GroqClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: request
                .messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        let policy = self.config.retry;

        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!(
                attempt,
                max_attempts = policy.attempts(),
                model = %self.config.model,
                max_tokens = request.max_tokens,
                "Groq completion request"
            );

            let result = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.config.api_key)
                .json(&body)
                .send()
                .await;

            let (error, is_retryable) = match result {
                Ok(response) => {
                    let status = response.status();
                    let text = response
                        .text()
                        .await
                        .map_err(|e| AgentError::llm(format!("Failed to read response: {}", e)))?;

                    if status.is_success() {
                        return Self::parse_completion(&text);
                    }
                    Self::parse_error(status, &text)
                }
                Err(e) => (
                    Self::describe_request_error(&e),
                    Self::is_retryable_request_error(&e),
                ),
            };

            if !is_retryable || !policy.allows_retry_after(attempt) {
                return Err(error);
            }

            let delay = policy.delay_after(attempt);
            warn!(attempt, ?delay, %error, "Groq request failed, retrying");
            tokio::time::sleep(delay).await;
        }
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

// Chat-completions wire types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
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
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
