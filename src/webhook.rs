//! Webhook related structures and the event decoder

use serde::Deserialize;

pub const EVENT_PING: &str = "ping";
pub const EVENT_PUSH: &str = "push";

/// Payload decoded from an authenticated webhook body
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    Ping,
    Push(PushEvent),
    /// Any event we have no handler for; carries the event type header
    Unrecognized(String),
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DecodeError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

/// The fields of a push event we route on, plus a few for logging
#[derive(Debug, Clone, PartialEq)]
pub struct PushEvent {
    pub git_ref: GitRef,
    pub repository_full_name: String,
    pub commit_sha: Option<String>,
    pub commit_message: Option<String>,
    pub pusher_name: Option<String>,
}

/// A fully qualified ref such as `refs/heads/feature/x`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRef {
    full: String,
    category: String,
    name: String,
}

impl GitRef {
    /// Parses `refs/<category>/<name>`; the name keeps any further slashes.
    /// An empty name (`refs/heads/`) is accepted and matches no branch.
    pub fn parse(full: &str) -> Result<Self, DecodeError> {
        let mut parts = full.splitn(3, '/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(category), Some(name)) => Ok(Self {
                full: full.to_string(),
                category: category.to_string(),
                name: name.to_string(),
            }),
            _ => Err(DecodeError::MalformedPayload(format!(
                "ref {:?} does not have at least 3 segments",
                full
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.full
    }

    /// The branch or tag name: third segment onward
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_branch(&self) -> bool {
        self.category == "heads"
    }

    /// Returns the branch name when this ref points at a branch.
    pub fn branch(&self) -> Option<&str> {
        self.is_branch().then_some(self.name.as_str())
    }
}

// Wire shape of a push payload. Only `ref` and `repository.full_name` are required.
#[derive(Debug, Deserialize)]
struct PushPayload {
    #[serde(rename = "ref")]
    git_ref: String,
    repository: RepositoryPayload,
    #[serde(default)]
    after: Option<String>,
    #[serde(default)]
    head_commit: Option<CommitPayload>,
    #[serde(default)]
    pusher: Option<PusherPayload>,
}

#[derive(Debug, Deserialize)]
struct RepositoryPayload {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct CommitPayload {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PusherPayload {
    #[serde(default)]
    name: Option<String>,
}

/// Truncate commit messages, they can be very long for squashed commits
const MAX_COMMIT_MSG_LEN: usize = 500;

fn truncate_message(message: String) -> String {
    if message.len() <= MAX_COMMIT_MSG_LEN {
        return message;
    }
    let mut cut = MAX_COMMIT_MSG_LEN;
    while !message.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... (truncated)", &message[..cut])
}

/// Decodes an authenticated webhook body according to its event type header.
pub fn decode(event_type: &str, body: &[u8]) -> Result<WebhookEvent, DecodeError> {
    match event_type {
        EVENT_PING => Ok(WebhookEvent::Ping),
        EVENT_PUSH => decode_push(body).map(WebhookEvent::Push),
        other => Ok(WebhookEvent::Unrecognized(other.to_string())),
    }
}

fn decode_push(body: &[u8]) -> Result<PushEvent, DecodeError> {
    let payload: PushPayload = serde_json::from_slice(body)
        .map_err(|e| DecodeError::MalformedPayload(format!("invalid push payload: {}", e)))?;

    Ok(PushEvent {
        git_ref: GitRef::parse(&payload.git_ref)?,
        repository_full_name: payload.repository.full_name,
        commit_sha: payload.after,
        commit_message: payload
            .head_commit
            .and_then(|c| c.message)
            .map(truncate_message),
        pusher_name: payload.pusher.and_then(|p| p.name),
    })
}
