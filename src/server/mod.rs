//! Standalone HTTP server for the chat API.
//!
//! Routes:
//! - POST /chat and POST /api/db-agent/chat: answer a question
//! - GET /health: readiness probe
//!
//! The server starts even when the agent cannot be built; chat requests are
//! then answered with 503 until the process is restarted.

pub mod handlers;
pub mod models;

use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use tracing::{error, info};

use crate::agent::Agent;
use crate::config::Config;
use crate::error::{AgentError, Result};

/// Shared handler state.
#[derive(Clone, Default)]
pub struct AppState {
    agent: Option<Arc<Agent>>,
}

impl AppState {
    /// State with a working agent.
    pub fn ready(agent: Agent) -> Self {
        Self {
            agent: Some(Arc::new(agent)),
        }
    }

    /// State for an agent that failed to initialize.
    pub fn unavailable() -> Self {
        Self { agent: None }
    }

    /// Returns the agent, if initialization succeeded.
    pub fn agent(&self) -> Option<&Agent> {
        self.agent.as_deref()
    }
}

/// Registers the API routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/chat", web::post().to(handlers::chat))
        .route("/api/db-agent/chat", web::post().to(handlers::chat))
        .route("/health", web::get().to(handlers::health));
}

/// Builds the agent for serving, logging instead of failing on error.
pub async fn initialize_state(config: &Config) -> AppState {
    let agent = match Agent::from_config(config) {
        Ok(agent) => agent,
        Err(e) => {
            error!(category = e.category(), error = %e, "Failed to create agent");
            return AppState::unavailable();
        }
    };

    if config.server.verify_on_startup {
        if let Err(e) = agent.verify().await {
            error!(error = %e, "Startup verification failed");
            return AppState::unavailable();
        }
    }

    info!("SQL agent ready");
    AppState::ready(agent)
}

/// Runs the HTTP server until shutdown.
pub async fn run_server(config: &Config, state: AppState) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let data = web::Data::new(state);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(data.clone())
            .configure(configure_routes)
    })
    .bind((host.as_str(), port))
    .map_err(|e| AgentError::config(format!("Failed to bind {host}:{port}: {e}")))?;

    info!(%host, port, "Chat server listening");

    server
        .run()
        .await
        .map_err(|e| AgentError::internal(format!("Server error: {e}")))
}
