//! HTTP handlers for the chat API.

use actix_web::{web, HttpResponse};
use tracing::{error, warn};

use super::models::{
    extract_message, ChatResponse, ErrorResponse, HealthResponse, AGENT_NOT_READY,
    INVALID_MESSAGE,
};
use super::AppState;

/// POST /chat
///
/// Body `{"message": string}`. The body is read raw so that non-JSON input
/// gets the same 400 reply as a missing field.
pub async fn chat(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    let Some(message) = extract_message(&body) else {
        return HttpResponse::BadRequest().json(ErrorResponse::new(INVALID_MESSAGE));
    };

    let Some(agent) = state.agent() else {
        return HttpResponse::ServiceUnavailable().json(ErrorResponse::new(AGENT_NOT_READY));
    };

    match agent.ask(&message).await {
        Ok(response) => HttpResponse::Ok().json(ChatResponse::from(response)),
        Err(e) if e.is_client_error() => {
            warn!(error = %e, "Rejected chat request");
            HttpResponse::BadRequest().json(ErrorResponse::new(INVALID_MESSAGE))
        }
        Err(e) => {
            error!(category = e.category(), error = %e, "Chat request failed");
            HttpResponse::InternalServerError().json(ErrorResponse::new(e.to_string()))
        }
    }
}

/// GET /health
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    if state.agent().is_some() {
        HttpResponse::Ok().json(HealthResponse {
            status: "ok".to_string(),
        })
    } else {
        HttpResponse::ServiceUnavailable().json(HealthResponse {
            status: "unavailable".to_string(),
        })
    }
}
