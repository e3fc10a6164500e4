//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the REST feed endpoints, the websocket component
//! session, and the health check under a single Axum router.

pub mod auth;
pub mod questions;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{delete, get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/users/{id}/questions", get(questions::render_feed))
        .route("/api/questions/{id}", delete(questions::destroy_question_rest))
        .route("/api/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
