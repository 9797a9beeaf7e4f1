//! Stride Server - per-account document service.
//!
//! Each account owns a single JSON document holding its collections. Clients
//! read it whole and write it with a top-level merge; the server stamps
//! `updatedAt` on every write.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod routes;

use crate::config::Config;
use crate::db::DocumentRepository;
use axum::Router;
use std::sync::Arc;
use stride_engine::Clock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub documents: Arc<dyn DocumentRepository>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        documents: Arc<dyn DocumentRepository>,
        clock: Arc<dyn Clock>,
        config: Config,
    ) -> Self {
        Self {
            documents,
            clock,
            config: Arc::new(config),
        }
    }
}

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
