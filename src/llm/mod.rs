//! LLM integration for db-agent.
//!
//! Provides the completion-service seam used by both pipeline stages that
//! talk to a model, plus the Groq implementation and an in-process mock.

pub mod factory;
pub mod groq;
pub mod mock;
pub mod parser;
pub mod prompt;
pub mod types;

pub use factory::create_client;
pub use groq::{GroqClient, GroqConfig};
pub use mock::{CallLog, MockLlmClient, MockReply};
pub use parser::normalize_sql;
pub use prompt::{build_sql_prompt, build_summary_prompt};
pub use types::{CompletionRequest, Message, Role};

use async_trait::async_trait;
use std::str::FromStr;

use crate::error::Result;

/// Trait for LLM clients that can generate completions.
///
/// Implementations must be thread-safe (Send + Sync) so one client can serve
/// concurrent requests.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates a completion for the given request.
    ///
    /// `Ok(None)` means the service answered but produced no content; callers
    /// decide whether that is fatal. Transport and API failures are `Err`.
    async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>>;

    /// Returns the model name sent with each request.
    fn model(&self) -> &str;
}

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    /// Groq chat completions (or any OpenAI-compatible endpoint)
    #[default]
    Groq,
    /// Mock client for testing (no API key required)
    Mock,
}

impl LlmProvider {
    /// Returns the provider as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::Mock => "mock",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown LLM provider: {}", s)),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
