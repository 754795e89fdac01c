//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::Result;
use crate::llm::{GroqClient, GroqConfig, LlmClient, LlmProvider, MockLlmClient};
use crate::retry::RetryPolicy;

/// Creates the completion client described by `config`.
///
/// Groq requires an API key; a missing key is a configuration error raised
/// here rather than on the first request.
pub fn create_client(config: &LlmConfig, retry: RetryPolicy) -> Result<Arc<dyn LlmClient>> {
    match config.provider()? {
        LlmProvider::Groq => {
            let key = config.require_api_key()?;
            let mut groq = GroqConfig::new(key, config.model.clone())
                .with_timeout(config.timeout_secs)
                .with_retry(retry);
            if let Some(base_url) = &config.base_url {
                groq = groq.with_base_url(base_url.clone());
            }
            Ok(Arc::new(GroqClient::new(groq)?))
        }
        LlmProvider::Mock => Ok(Arc::new(MockLlmClient::new())),
    }
}
