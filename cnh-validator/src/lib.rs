pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pages;
pub mod services;

pub use crate::config::Configuration;
pub use crate::error::{ServerError, ValidationError};

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use services::Orchestrator;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Overrides the request-derived base of liveness callback URLs.
    pub public_url: Option<String>,
}

/// Routes of the validation relay. Uploads larger than `max_upload_bytes`
/// are refused before they reach a handler.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/", get(handlers::index_page))
        .route(
            "/validation/cnh/",
            get(handlers::upload_page).post(handlers::begin_validation),
        )
        .route("/validation/cnh/{session_id}", get(handlers::complete_validation))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(max_upload_bytes)),
        )
        .with_state(state)
}
