//! Mock database client for testing and `--mock` runs.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use super::DatabaseClient;
use crate::error::{AgentError, Result};
use crate::llm::CallLog;

/// Entry recorded for every mock procedure call.
pub const DB_CALL: &str = "db.execute_sql";

/// A scripted reply for the next procedure call.
#[derive(Debug, Clone)]
pub enum MockDbReply {
    /// The procedure returns this JSON payload.
    Rows(Value),
    /// The procedure rejects the SQL with this message.
    Fail(String),
}

/// A mock database client that returns scripted or canned results.
#[derive(Debug, Default)]
pub struct MockDatabaseClient {
    script: Mutex<VecDeque<MockDbReply>>,
    executed: Mutex<Vec<String>>,
    call_log: CallLog,
}

impl MockDatabaseClient {
    /// Creates a new mock database client with canned results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records calls into the given shared log.
    pub fn with_call_log(mut self, call_log: CallLog) -> Self {
        self.call_log = call_log;
        self
    }

    /// Queues a reply; queued replies are consumed in order before canned ones.
    pub fn with_reply(self, reply: MockDbReply) -> Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
        self
    }

    /// Queues a payload reply.
    pub fn with_rows(self, rows: Value) -> Self {
        self.with_reply(MockDbReply::Rows(rows))
    }

    /// Returns every SQL string received so far.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn canned_rows(sql: &str) -> Value {
        let upper = sql.to_uppercase();
        if upper.contains("COUNT(") {
            json!([{ "count": 3 }])
        } else if upper.contains("FROM CUSTOMERS") {
            json!([
                { "name": "Asha Traders", "email": "accounts@asha.example" },
                { "name": "Blue Lotus Foods", "email": "billing@bluelotus.example" }
            ])
        } else if upper.contains("FROM INVOICES") {
            json!([
                { "invoice_number": "INV-0042", "status": "unpaid", "total_amount": "18450.00" },
                { "invoice_number": "INV-0041", "status": "paid", "total_amount": "9200.00" }
            ])
        } else {
            json!([{ "result": 1 }])
        }
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute_sql(&self, sql: &str) -> Result<Value> {
        self.call_log.record(DB_CALL);
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sql.to_string());

        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match next {
            Some(MockDbReply::Rows(rows)) => Ok(rows),
            Some(MockDbReply::Fail(message)) => Err(AgentError::execution(message)),
            None => Ok(Self::canned_rows(sql)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_canned_count() {
        let db = MockDatabaseClient::new();
        let rows = db
            .execute_sql("SELECT COUNT(*) FROM invoices WHERE status = 'unpaid'")
            .await
            .unwrap();
        assert_eq!(rows, json!([{ "count": 3 }]));
    }

    #[tokio::test]
    async fn test_scripted_replies_in_order() {
        let db = MockDatabaseClient::new()
            .with_rows(Value::Null)
            .with_reply(MockDbReply::Fail("permission denied".into()));

        assert_eq!(db.execute_sql("SELECT 1").await.unwrap(), Value::Null);
        let err = db.execute_sql("SELECT 2").await.unwrap_err();
        assert_eq!(err.to_string(), "permission denied");
        assert_eq!(db.executed(), vec!["SELECT 1", "SELECT 2"]);
    }

    #[tokio::test]
    async fn test_records_into_shared_log() {
        let log = CallLog::new();
        let db = MockDatabaseClient::new().with_call_log(log.clone());
        db.execute_sql("SELECT 1").await.unwrap();
        assert_eq!(log.entries(), vec![DB_CALL]);
    }
}
