//! HTTP API integration tests.
//!
//! Drives the actix-web app through its public routes with mock clients.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use db_agent::agent::Agent;
use db_agent::config::Config;
use db_agent::db::{MockDatabaseClient, MockDbReply};
use db_agent::llm::{MockLlmClient, MockReply};
use db_agent::schema::SchemaDescriptor;
use db_agent::server::models::{ChatResponse, ErrorResponse};
use db_agent::server::{configure_routes, initialize_state, AppState};
use pretty_assertions::assert_eq;
use serde_json::json;

fn agent(llm: MockLlmClient, db: MockDatabaseClient) -> Agent {
    Agent::new(Arc::new(llm), Arc::new(db), SchemaDescriptor::builtin().clone())
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .configure(configure_routes),
        )
        .await
    };
}

#[actix_web::test]
async fn test_chat_returns_answer_rows_and_sql() {
    let app = app!(AppState::ready(agent(
        MockLlmClient::new()
            .with_content("SELECT COUNT(*) FROM invoices WHERE status = 'unpaid'")
            .with_content("Three invoices are unpaid."),
        MockDatabaseClient::new().with_rows(json!([{ "count": 3 }])),
    )));

    let req = test::TestRequest::post()
        .uri("/api/db-agent/chat")
        .set_json(json!({ "message": "How many invoices are unpaid?" }))
        .to_request();
    let resp: ChatResponse = test::call_and_read_body_json(&app, req).await;

    assert_eq!(resp.response, "Three invoices are unpaid.");
    assert_eq!(resp.data.rows(), &[json!({ "count": 3 })]);
    assert_eq!(
        resp.sql.as_deref(),
        Some("SELECT COUNT(*) FROM invoices WHERE status = 'unpaid'")
    );
}

#[actix_web::test]
async fn test_chat_rejects_bad_bodies_with_400() {
    let app = app!(AppState::ready(agent(
        MockLlmClient::new(),
        MockDatabaseClient::new()
    )));

    let bodies: [&[u8]; 4] = [
        b"not json",
        br#"{"msg":"hi"}"#,
        br#"{"message":["hi"]}"#,
        br#"{"message":"   "}"#,
    ];
    for body in bodies {
        let req = test::TestRequest::post()
            .uri("/chat")
            .insert_header(("content-type", "application/json"))
            .set_payload(body.to_vec())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.error, "Missing or invalid 'message' in body.");
    }
}

#[actix_web::test]
async fn test_chat_surfaces_execution_error_as_500() {
    let app = app!(AppState::ready(agent(
        MockLlmClient::new(),
        MockDatabaseClient::new().with_reply(MockDbReply::Fail(
            "column \"amount_due\" does not exist".into()
        )),
    )));

    let req = test::TestRequest::post()
        .uri("/chat")
        .set_json(json!({ "message": "total amount due" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body.error, "column \"amount_due\" does not exist");
}

#[actix_web::test]
async fn test_chat_synthesis_failure_is_500() {
    let app = app!(AppState::ready(agent(
        MockLlmClient::new().with_reply(MockReply::Empty),
        MockDatabaseClient::new(),
    )));

    let req = test::TestRequest::post()
        .uri("/chat")
        .set_json(json!({ "message": "anything" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body.error, "No SQL generated");
}

#[actix_web::test]
async fn test_uninitialized_agent_returns_503() {
    // No credentials: the agent cannot be built but the server still routes.
    let state = initialize_state(&Config::default()).await;
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/chat")
        .set_json(json!({ "message": "How many invoices are unpaid?" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body.error, "Agent not ready yet. Try again in a moment.");

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn test_mock_config_serves_requests() {
    let mut config = Config::default();
    config.use_mocks();
    let app = app!(initialize_state(&config).await);

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/chat")
        .set_json(json!({ "message": "How many invoices are unpaid?" }))
        .to_request();
    let resp: ChatResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp.data.rows(), &[json!({ "count": 3 })]);
}

#[actix_web::test]
async fn test_unknown_route_is_404() {
    let app = app!(AppState::unavailable());
    let req = test::TestRequest::post().uri("/api/chat").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
