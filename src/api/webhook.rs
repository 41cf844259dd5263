//! Webhook dispatcher for GitHub ping and push events
//!
//! Every delivery goes through the same steps: both webhook headers must be
//! present, the body is read, the `X-Hub-Signature` HMAC is checked, and only
//! then is the body decoded and routed. Unauthenticated bodies are never parsed.

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State as AxumState},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::api::handlers::not_found;
use crate::sync::sync_repository;
use crate::utils::verify_github_signature;
use crate::webhook::{DecodeError, PushEvent, WebhookEvent, decode};
use crate::{AppState, SharedState};

pub const HEADER_SIGNATURE: &str = "X-Hub-Signature";
pub const HEADER_EVENT: &str = "X-Hub-Event";
/// GitHub's own name for the event header, accepted when `X-Hub-Event` is absent
pub const HEADER_GITHUB_EVENT: &str = "X-GitHub-Event";
pub const HEADER_DELIVERY: &str = "X-GitHub-Delivery";

/// Terminal failures surfaced to the sender as a status code
#[derive(Debug, thiserror::Error)]
pub enum Rejection {
    #[error("Cannot read the request body: {0}")]
    Transport(String),

    #[error("Signature validation failed")]
    Authentication,

    #[error(transparent)]
    MalformedPayload(#[from] DecodeError),
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        match self {
            Rejection::Transport(_) => {
                warn!("{}", self);
                StatusCode::BAD_REQUEST.into_response()
            }
            Rejection::Authentication => {
                warn!("{}", self);
                StatusCode::FORBIDDEN.into_response()
            }
            Rejection::MalformedPayload(_) => {
                error!("{}", self);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

struct WebhookHeaders {
    signature: String,
    event: String,
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Both headers present and non-empty, otherwise this is not a webhook delivery.
fn webhook_headers(headers: &HeaderMap) -> Option<WebhookHeaders> {
    let signature = header_value(headers, HEADER_SIGNATURE)?;
    let event = header_value(headers, HEADER_EVENT)
        .or_else(|| header_value(headers, HEADER_GITHUB_EVENT))?;
    Some(WebhookHeaders {
        signature: signature.to_string(),
        event: event.to_string(),
    })
}

/// True when a request carries both webhook headers.
pub fn is_webhook_delivery(headers: &HeaderMap) -> bool {
    webhook_headers(headers).is_some()
}

/// Handles a webhook delivery.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    request: Request,
) -> Response {
    let Some(hook) = webhook_headers(request.headers()) else {
        return not_found().await.into_response();
    };

    let delivery = header_value(request.headers(), HEADER_DELIVERY)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::now_v7().to_string());
    let span = info_span!("webhook", delivery = %delivery, event = %hook.event);

    dispatch(state, hook, request.into_body())
        .instrument(span)
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

async fn dispatch(
    state: SharedState,
    hook: WebhookHeaders,
    body: Body,
) -> Result<Response, Rejection> {
    let body = to_bytes(body, state.settings.max_body_bytes)
        .await
        .map_err(|e| Rejection::Transport(e.to_string()))?;

    if !verify_github_signature(state.settings.secret.as_bytes(), &hook.signature, &body) {
        return Err(Rejection::Authentication);
    }

    match decode(&hook.event, &body)? {
        WebhookEvent::Ping => {
            info!("Received ping");
            Ok((StatusCode::OK, "pong").into_response())
        }
        WebhookEvent::Push(push) => Ok(handle_push(&state, push).await),
        WebhookEvent::Unrecognized(event) => {
            info!("Unknown event: {}", event);
            Ok((StatusCode::OK, format!("Unknown event: {}", event)).into_response())
        }
    }
}

/// Syncs pushes to the default branch. Always answers `ok`: the sender cannot fix
/// a local sync problem, so failures are only logged.
async fn handle_push(state: &AppState, push: PushEvent) -> Response {
    info!(
        "Push event for repository '{}' ref '{}' (commit {}, pusher {}, message {:?})",
        push.repository_full_name,
        push.git_ref.as_str(),
        push.commit_sha.as_deref().unwrap_or("(none)"),
        push.pusher_name.as_deref().unwrap_or("(none)"),
        push.commit_message.as_deref().unwrap_or("(none)"),
    );

    match push.git_ref.branch() {
        Some(branch) if branch == state.settings.default_branch => {
            sync_repository(
                &state.resolver,
                state.updater.as_ref(),
                &push.repository_full_name,
            )
            .await;
        }
        _ => info!(
            "Ignoring push to '{}': only refs/heads/{} is synced",
            push.git_ref.as_str(),
            state.settings.default_branch
        ),
    }

    (StatusCode::OK, "ok").into_response()
}
