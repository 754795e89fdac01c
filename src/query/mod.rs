//! Query execution for db-agent.
//!
//! Isolates the database round trip and result normalization from the agent
//! orchestrator.

pub mod executor;

pub use executor::QueryExecutor;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered rows returned by the read-only procedure.
///
/// Rows are opaque JSON; objects are expected but other values are kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet(Vec<Value>);

impl ResultSet {
    /// Creates a result set from rows.
    pub fn new(rows: Vec<Value>) -> Self {
        Self(rows)
    }

    /// Normalizes a raw procedure payload; anything but an array is empty.
    pub fn from_payload(payload: Value) -> Self {
        match payload {
            Value::Array(rows) => Self(rows),
            _ => Self::default(),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrows the rows.
    pub fn rows(&self) -> &[Value] {
        &self.0
    }

    /// Column names of the first object row, in payload order.
    pub fn columns(&self) -> Vec<String> {
        self.0
            .first()
            .and_then(Value::as_object)
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default()
    }
}
