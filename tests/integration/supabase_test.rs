//! Live RPC integration tests.
//!
//! These tests require a Supabase project with the `execute_sql` function
//! installed. Set SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY to run them.

use db_agent::config::DatabaseConfig;
use db_agent::db::{DatabaseClient, SupabaseRpcClient};
use db_agent::query::QueryExecutor;
use db_agent::retry::RetryPolicy;
use std::sync::Arc;

/// Helper to create a client from the environment.
fn get_test_client() -> Option<SupabaseRpcClient> {
    let config = DatabaseConfig {
        url: std::env::var("SUPABASE_URL").ok(),
        key: std::env::var("SUPABASE_SERVICE_ROLE_KEY").ok(),
        ..Default::default()
    };
    SupabaseRpcClient::from_config(&config, RetryPolicy::none()).ok()
}

#[tokio::test]
async fn test_select_one() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: SUPABASE_URL not set");
        return;
    };

    let payload = client.execute_sql("SELECT 1 AS one").await.unwrap();
    assert!(payload.is_array());
}

#[tokio::test]
async fn test_invalid_sql_message_is_surfaced() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: SUPABASE_URL not set");
        return;
    };

    let err = client
        .execute_sql("SELECT * FROM table_that_does_not_exist")
        .await
        .unwrap_err();
    assert_eq!(err.category(), "Execution Error");
    assert!(err.to_string().contains("table_that_does_not_exist"));
}

#[tokio::test]
async fn test_probe_through_executor() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: SUPABASE_URL not set");
        return;
    };

    QueryExecutor::new(Arc::new(client)).probe().await.unwrap();
}
