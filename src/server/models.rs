//! Request and response bodies for the chat API.

use serde::{Deserialize, Serialize};

use crate::agent::AgentResponse;
use crate::query::ResultSet;

/// Error text for a missing, non-string or blank `message`.
pub const INVALID_MESSAGE: &str = "Missing or invalid 'message' in body.";

/// Error text while the agent is unavailable.
pub const AGENT_NOT_READY: &str = "Agent not ready yet. Try again in a moment.";

/// Successful chat reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    /// Natural-language answer.
    pub response: String,
    /// Result rows.
    pub data: ResultSet,
    /// The SQL that was executed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

impl From<AgentResponse> for ChatResponse {
    fn from(response: AgentResponse) -> Self {
        Self {
            response: response.answer,
            data: response.data,
            sql: response.sql,
        }
    }
}

/// Error reply for every non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Health probe reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
}

/// Extracts a usable question from a raw request body.
///
/// Returns `None` if the body is not JSON, `message` is missing or not a
/// string, or it is blank after trimming.
pub fn extract_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let message = value.get("message")?.as_str()?.trim();
    (!message.is_empty()).then(|| message.to_string())
}
