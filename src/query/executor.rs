//! Query execution through the read-only procedure.
//!
//! The executor owns the only path to the database. It optionally runs the
//! syntactic guard first, then forwards the SQL unchanged.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::ResultSet;
use crate::db::DatabaseClient;
use crate::error::{AgentError, Result};
use crate::safety::ReadOnlyGuard;

/// Runs synthesized SQL and normalizes the payload.
#[derive(Clone)]
pub struct QueryExecutor {
    db: Arc<dyn DatabaseClient>,
    guard: Option<ReadOnlyGuard>,
}

impl QueryExecutor {
    /// Creates an executor with the read-only guard enabled.
    pub fn new(db: Arc<dyn DatabaseClient>) -> Self {
        Self {
            db,
            guard: Some(ReadOnlyGuard::new()),
        }
    }

    /// Enables or disables the read-only guard.
    pub fn with_guard(mut self, enabled: bool) -> Self {
        self.guard = enabled.then(ReadOnlyGuard::new);
        self
    }

    /// Returns true if the guard runs before each call.
    pub fn guard_enabled(&self) -> bool {
        self.guard.is_some()
    }

    /// Executes `sql` and returns its rows.
    ///
    /// A guard rejection fails closed: the procedure is never called.
    pub async fn run(&self, sql: &str) -> Result<ResultSet> {
        if let Some(guard) = &self.guard {
            if let Err(e) = guard.check(sql) {
                warn!(error = %e, "Read-only guard rejected SQL");
                return Err(e);
            }
        }

        let start = Instant::now();
        let payload = self.db.execute_sql(sql).await?;
        let elapsed = start.elapsed();

        if !payload.is_array() {
            debug!(payload_kind = json_kind(&payload), "Non-array payload; treating as no rows");
        }

        let rows = ResultSet::from_payload(payload);
        info!(rows = rows.len(), ?elapsed, "Query executed");
        Ok(rows)
    }

    /// Runs `SELECT 1` through the procedure to confirm the channel works.
    pub async fn probe(&self) -> Result<()> {
        self.db
            .execute_sql("SELECT 1")
            .await
            .map(|_| ())
            .map_err(|e| AgentError::initialization(format!("database probe failed: {e}")))
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
