//! Health check and default handlers

use axum::{
    Json,
    extract::{Query, Request},
    extract::State as AxumState,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::collections::HashMap;

use crate::SharedState;
use crate::api::webhook::{handle_webhook, is_webhook_delivery};

/// Health check endpoint
/// Supports ?format=json for detailed JSON response.
/// Webhook deliveries sent to this path are dispatched like anywhere else.
pub async fn health(
    AxumState(state): AxumState<SharedState>,
    Query(params): Query<HashMap<String, String>>,
    request: Request,
) -> Response {
    if is_webhook_delivery(request.headers()) {
        return handle_webhook(AxumState(state), request).await;
    }

    let format = params.get("format").map(|s| s.as_str());

    if format == Some("json") {
        Json(json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "started_at": state.started_at,
            "uptime_seconds": state.start_time.elapsed().as_secs(),
            "default_branch": state.settings.default_branch,
            "status": "healthy"
        }))
        .into_response()
    } else {
        "hub_sync - healthy".into_response()
    }
}

/// Default handler for anything that is not a webhook delivery
pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
