pub mod api;
pub mod config;
pub mod error;
pub mod git;
pub mod logging;
pub mod repository;
pub mod sync;
pub mod utils;
pub mod webhook;

use axum::{Router, routing};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;

use crate::config::{Settings, SharedConfig};
use crate::git::Updater;
use crate::repository::RepositoryResolver;

/// Everything a request needs. Built once at startup, never mutated.
pub struct AppState {
    pub settings: Settings,
    pub resolver: RepositoryResolver,
    pub updater: Arc<dyn Updater>,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(settings: Settings, config: SharedConfig, updater: Arc<dyn Updater>) -> Self {
        Self {
            settings,
            resolver: RepositoryResolver::new(config),
            updater,
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<AppState>;

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route(
            "/health",
            routing::get(api::health).fallback(api::handle_webhook),
        )
        // Webhooks may be delivered to any path; requests without webhook
        // headers fall through to the 404 handler.
        .fallback(api::handle_webhook)
        .with_state(state)
}
