//! Pipeline integration tests.
//!
//! Runs the agent end to end against the mock completion service and mock
//! database, sharing one call log to observe stage order.

use std::sync::Arc;

use db_agent::agent::{Agent, FALLBACK_SUMMARY};
use db_agent::db::{MockDatabaseClient, MockDbReply, DB_CALL};
use db_agent::error::AgentError;
use db_agent::llm::mock::LLM_CALL;
use db_agent::llm::{CallLog, MockLlmClient, MockReply};
use db_agent::schema::SchemaDescriptor;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const UNPAID_SQL: &str = "SELECT COUNT(*) FROM invoices WHERE status = 'unpaid'";

struct Harness {
    log: CallLog,
    llm: Arc<MockLlmClient>,
    db: Arc<MockDatabaseClient>,
    agent: Agent,
}

fn harness(llm: MockLlmClient, db: MockDatabaseClient) -> Harness {
    let log = CallLog::new();
    let llm = Arc::new(llm.with_call_log(log.clone()));
    let db = Arc::new(db.with_call_log(log.clone()));
    let agent = Agent::new(llm.clone(), db.clone(), SchemaDescriptor::builtin().clone());
    Harness { log, llm, db, agent }
}

#[tokio::test]
async fn test_unpaid_invoices_end_to_end() {
    let h = harness(
        MockLlmClient::new()
            .with_content(UNPAID_SQL)
            .with_content("There are 3 unpaid invoices."),
        MockDatabaseClient::new().with_rows(json!([{ "count": 3 }])),
    );

    let response = h.agent.ask("How many invoices are unpaid?").await.unwrap();

    assert_eq!(response.answer, "There are 3 unpaid invoices.");
    assert_eq!(response.data.rows(), &[json!({ "count": 3 })]);
    assert_eq!(response.sql.as_deref(), Some(UNPAID_SQL));
    assert_eq!(h.log.entries(), vec![LLM_CALL, DB_CALL, LLM_CALL]);

    let requests = h.llm.requests();
    assert!(requests[0].last_user_content().contains("- invoices ("));
    assert!(requests[0]
        .last_user_content()
        .ends_with("User question: How many invoices are unpaid?"));
    assert!(requests[1].last_user_content().contains("returned 1 row(s)"));
    assert_eq!(h.db.executed(), vec![UNPAID_SQL]);
}

#[tokio::test]
async fn test_empty_question_end_to_end() {
    let h = harness(MockLlmClient::new(), MockDatabaseClient::new());

    let err = h.agent.ask("").await.unwrap_err();

    assert!(matches!(err, AgentError::Validation(_)));
    assert!(h.log.is_empty());
}

#[tokio::test]
async fn test_whitespace_questions_make_no_calls() {
    let h = harness(MockLlmClient::new(), MockDatabaseClient::new());

    for question in [" ", "\t", "\n\n", "   \r\n  "] {
        let err = h.agent.ask(question).await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)), "question: {:?}", question);
    }
    assert!(h.log.is_empty());
    assert!(h.llm.requests().is_empty());
}

#[tokio::test]
async fn test_stage_order_for_canned_replies() {
    let h = harness(MockLlmClient::new(), MockDatabaseClient::new());

    for question in ["list customers", "products in stock", "recent invoices"] {
        h.agent.ask(question).await.unwrap();
    }

    let expected: Vec<&str> = [LLM_CALL, DB_CALL, LLM_CALL].repeat(3);
    assert_eq!(h.log.entries(), expected);
}

#[tokio::test]
async fn test_fenced_sql_reaches_database_clean() {
    let h = harness(
        MockLlmClient::new().with_content("```sql\nSELECT 1\n```"),
        MockDatabaseClient::new(),
    );

    let response = h.agent.ask("anything").await.unwrap();

    assert_eq!(response.sql.as_deref(), Some("SELECT 1"));
    assert_eq!(h.db.executed(), vec!["SELECT 1"]);
}

#[tokio::test]
async fn test_null_payload_is_empty_result() {
    let h = harness(MockLlmClient::new(), MockDatabaseClient::new().with_rows(Value::Null));

    let response = h.agent.ask("How many invoices are unpaid?").await.unwrap();

    assert!(response.data.is_empty());
    assert_eq!(response.answer, "No data was found for that question.");
    assert!(h.llm.requests()[1]
        .last_user_content()
        .contains("returned 0 row(s)"));
}

#[tokio::test]
async fn test_execution_error_short_circuits() {
    let h = harness(
        MockLlmClient::new(),
        MockDatabaseClient::new().with_reply(MockDbReply::Fail("permission denied".into())),
    );

    let err = h.agent.ask("How many invoices are unpaid?").await.unwrap_err();

    assert_eq!(err.to_string(), "permission denied");
    assert_eq!(h.log.entries(), vec![LLM_CALL, DB_CALL]);
    assert_eq!(h.llm.requests().len(), 1);
}

#[tokio::test]
async fn test_empty_summary_falls_back_and_keeps_rows() {
    let rows = json!([{ "name": "Asha Traders" }, { "name": "Blue Lotus Foods" }]);
    let h = harness(
        MockLlmClient::new()
            .with_content("SELECT name FROM customers")
            .with_reply(MockReply::Empty),
        MockDatabaseClient::new().with_rows(rows.clone()),
    );

    let response = h.agent.ask("customer names").await.unwrap();

    assert_eq!(response.answer, FALLBACK_SUMMARY);
    assert_eq!(serde_json::to_value(&response.data).unwrap(), rows);
}

#[tokio::test]
async fn test_summary_transport_failure_fails_request() {
    let h = harness(
        MockLlmClient::new()
            .with_content("SELECT 1")
            .with_reply(MockReply::Fail("Rate limited. Please wait and try again.".into())),
        MockDatabaseClient::new(),
    );

    let err = h.agent.ask("anything").await.unwrap_err();

    assert_eq!(err.category(), "LLM Error");
    assert_eq!(h.log.entries(), vec![LLM_CALL, DB_CALL, LLM_CALL]);
}

#[tokio::test]
async fn test_mutating_sql_never_reaches_database() {
    let h = harness(
        MockLlmClient::new().with_content("```sql\nUPDATE invoices SET status = 'paid';\n```"),
        MockDatabaseClient::new(),
    );

    let err = h.agent.ask("mark everything paid").await.unwrap_err();

    assert!(matches!(err, AgentError::UnsafeSql(_)));
    assert!(h.db.executed().is_empty());
}

#[tokio::test]
async fn test_concurrent_requests_share_agent() {
    let h = harness(MockLlmClient::new(), MockDatabaseClient::new());
    let agent = Arc::new(h.agent);

    let handles: Vec<_> = ["unpaid invoices", "customers", "organizations"]
        .into_iter()
        .map(|question| {
            let agent = agent.clone();
            tokio::spawn(async move { agent.ask(question).await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
    assert_eq!(h.db.executed().len(), 3);
}

#[tokio::test]
async fn test_custom_schema_reaches_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema.toml");
    std::fs::write(
        &path,
        r#"
version = 2
currency = "EUR"

[[tables]]
name = "orders"
columns = ["id", "total"]
"#,
    )
    .unwrap();
    let schema = SchemaDescriptor::load_from_file(&path).unwrap();
    let llm = Arc::new(MockLlmClient::new());
    let agent = Agent::new(llm.clone(), Arc::new(MockDatabaseClient::new()), schema);

    agent.ask("total of orders").await.unwrap();

    let prompt = llm.requests()[0].last_user_content().to_string();
    assert!(prompt.contains("- orders (id, total)"));
    assert!(prompt.contains("EUR"));
    assert!(!prompt.contains("invoices"));
}
