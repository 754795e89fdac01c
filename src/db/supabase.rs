//! Supabase RPC client.
//!
//! Calls `POST {url}/rest/v1/rpc/{function}` with `{"query": sql}`. The
//! stored function executes the statement under a read-only role and returns
//! the rows as a JSON array.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::DatabaseClient;
use crate::config::DatabaseConfig;
use crate::error::{AgentError, Result};
use crate::retry::RetryPolicy;

/// Supabase (PostgREST) RPC client.
#[derive(Clone)]
pub struct SupabaseRpcClient {
    client: Client,
    endpoint: Url,
    key: String,
    retry: RetryPolicy,
}

impl fmt::Debug for SupabaseRpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseRpcClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("key", &"<redacted>")
            .field("retry", &self.retry)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    query: &'a str,
}

/// PostgREST error body.
#[derive(Debug, Deserialize)]
struct RpcError {
    message: String,
}

impl SupabaseRpcClient {
    /// Creates a client for the given project URL, key and function name.
    pub fn new(
        base_url: &Url,
        key: impl Into<String>,
        function: &str,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let endpoint = Self::rpc_endpoint(base_url, function)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AgentError::connection(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            key: key.into(),
            retry,
        })
    }

    /// Creates a client from configuration, failing fast on missing credentials.
    pub fn from_config(config: &DatabaseConfig, retry: RetryPolicy) -> Result<Self> {
        let url = config.require_url()?;
        let key = config.require_key()?;
        let function = config.require_rpc_function()?;
        Self::new(&url, key, function, config.timeout_secs, retry)
    }

    /// Returns the RPC URL this client posts to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn rpc_endpoint(base_url: &Url, function: &str) -> Result<Url> {
        let base = base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/rest/v1/rpc/{function}"))
            .map_err(|e| AgentError::config(format!("Invalid RPC endpoint: {e}")))
    }

    /// Maps an error response to (error, is_retryable).
    ///
    /// A body with a `message` came from the database and is final. Bare
    /// gateway errors are transport trouble and may be retried.
    fn parse_error(status: StatusCode, body: &str) -> (AgentError, bool) {
        if let Ok(error) = serde_json::from_str::<RpcError>(body) {
            return (AgentError::execution(error.message), false);
        }

        let is_retryable = matches!(
            status,
            StatusCode::TOO_MANY_REQUESTS
                | StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
        );

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return (
                AgentError::connection(format!(
                    "Database rejected credentials ({status}). Check SUPABASE_SERVICE_ROLE_KEY."
                )),
                false,
            );
        }

        let body = body.trim();
        let message = if body.is_empty() {
            format!("Database request failed ({status})")
        } else {
            format!("Database request failed ({status}): {body}")
        };
        (AgentError::connection(message), is_retryable)
    }

    /// Parses a success body; an empty body is JSON null.
    fn parse_payload(body: &str) -> Result<serde_json::Value> {
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(body)
            .map_err(|e| AgentError::connection(format!("Invalid JSON from database: {e}")))
    }

    fn describe_request_error(&self, error: &reqwest::Error) -> AgentError {
        let host = self.endpoint.host_str().unwrap_or("database");
        if error.is_timeout() {
            AgentError::connection(format!("Request to {host} timed out."))
        } else if error.is_connect() {
            AgentError::connection(format!("Cannot connect to {host}. Check SUPABASE_URL."))
        } else {
            AgentError::connection(format!("Database request failed: {error}"))
        }
    }
}

#[async_trait]
impl DatabaseClient for SupabaseRpcClient {
    async fn execute_sql(&self, sql: &str) -> Result<serde_json::Value> {
        let body = RpcRequest { query: sql };

        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!(
                attempt,
                max_attempts = self.retry.attempts(),
                sql_len = sql.len(),
                "Database RPC request"
            );

            let result = self
                .client
                .post(self.endpoint.clone())
                .header("apikey", &self.key)
                .bearer_auth(&self.key)
                .json(&body)
                .send()
                .await;

            let (error, is_retryable) = match result {
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.map_err(|e| {
                        AgentError::connection(format!("Failed to read database response: {e}"))
                    })?;

                    if status.is_success() {
                        return Self::parse_payload(&text);
                    }
                    Self::parse_error(status, &text)
                }
                Err(e) => (
                    self.describe_request_error(&e),
                    e.is_timeout() || e.is_connect(),
                ),
            };

            if !is_retryable || !self.retry.allows_retry_after(attempt) {
                return Err(error);
            }

            let delay = self.retry.delay_after(attempt);
            warn!(attempt, ?delay, %error, "Database request failed, retrying");
            tokio::time::sleep(delay).await;
        }
    }
}
