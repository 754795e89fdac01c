//! Database access for db-agent.
//!
//! The agent never opens a SQL session. Every statement travels through one
//! remote procedure that runs it under a read-only role and returns JSON, so
//! [`DatabaseClient`] has exactly one method.

mod mock;
mod supabase;

pub use mock::{MockDatabaseClient, MockDbReply, DB_CALL};
pub use supabase::SupabaseRpcClient;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::retry::RetryPolicy;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    /// Supabase (PostgREST) RPC endpoint.
    #[default]
    Supabase,
    /// In-process mock returning canned rows.
    Mock,
}

impl DatabaseBackend {
    /// Returns the backend as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Supabase => "supabase",
            Self::Mock => "mock",
        }
    }

    /// Parses a backend from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "supabase" | "postgrest" => Some(Self::Supabase),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }
}

/// Creates a database client for the given configuration.
///
/// Credentials are checked here so a misconfigured process fails at startup,
/// not on its first request.
pub fn connect(config: &DatabaseConfig, retry: RetryPolicy) -> Result<Arc<dyn DatabaseClient>> {
    match config.backend {
        DatabaseBackend::Supabase => {
            let client = SupabaseRpcClient::from_config(config, retry)?;
            Ok(Arc::new(client))
        }
        DatabaseBackend::Mock => Ok(Arc::new(MockDatabaseClient::new())),
    }
}

/// Trait defining the constrained execution channel.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Runs `sql` through the read-only procedure and returns its raw JSON result.
    ///
    /// A procedure-side rejection is an `Execution` error carrying the
    /// database's message verbatim; a transport failure is a `Connection` error.
    async fn execute_sql(&self, sql: &str) -> Result<serde_json::Value>;
}
