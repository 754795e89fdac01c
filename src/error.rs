//! Error types for db-agent.
//!
//! Every stage of the pipeline reports failures through [`AgentError`]. The
//! `Display` output of a variant is the message shown to HTTP callers, so
//! database execution errors are rendered verbatim.

use std::time::Duration;

use thiserror::Error;

/// Main error type for agent operations.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Malformed caller input (empty or whitespace-only question).
    #[error("{0}")]
    Validation(String),

    /// The completion service produced no SQL.
    #[error("{0}")]
    Synthesis(String),

    /// The database rejected the synthesized SQL (syntax error, permission
    /// denied, unknown column, ...). Carries the database message unmodified.
    #[error("{0}")]
    Execution(String),

    /// The read-only guard refused to forward the statement.
    #[error("Refusing to execute non-read-only SQL: {0}")]
    UnsafeSql(String),

    /// Completion service errors (rate limits, auth, timeouts, etc.)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Database transport errors (endpoint unreachable, timeouts, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration errors (invalid config file, missing required values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Startup failures that leave the agent unusable.
    #[error("Agent initialization failed: {0}")]
    Initialization(String),

    /// The request exceeded its deadline.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The caller abandoned the request.
    #[error("Request was cancelled")]
    Cancelled,

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Creates a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a synthesis error with the given message.
    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::Synthesis(msg.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates a guard rejection with the given reason.
    pub fn unsafe_sql(msg: impl Into<String>) -> Self {
        Self::UnsafeSql(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an initialization error with the given message.
    pub fn initialization(msg: impl Into<String>) -> Self {
        Self::Initialization(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Validation Error",
            Self::Synthesis(_) => "Synthesis Error",
            Self::Execution(_) => "Execution Error",
            Self::UnsafeSql(_) => "Unsafe SQL",
            Self::Llm(_) => "LLM Error",
            Self::Connection(_) => "Connection Error",
            Self::Config(_) => "Configuration Error",
            Self::Initialization(_) => "Initialization Error",
            Self::Timeout(_) => "Timeout",
            Self::Cancelled => "Cancelled",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns true for errors caused by the caller's input rather than the agent.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias using AgentError.
pub type Result<T> = std::result::Result<T, AgentError>;
