//! Sync trigger: resolve a pushed repository and pull it

use std::path::Path;
use tracing::{error, info};

use crate::git::Updater;
use crate::repository::RepositoryResolver;

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Success,
    /// The repository has no `repository.<full_name>` entry
    NotConfigured,
    CommandFailed(String),
}

/// Runs the updater against `path`. All outcomes are values.
pub async fn sync(updater: &dyn Updater, path: &Path) -> SyncOutcome {
    match updater.pull(path).await {
        Ok(()) => SyncOutcome::Success,
        Err(e) => SyncOutcome::CommandFailed(e.to_string()),
    }
}

/// Resolves `full_name` to its working copy and syncs it, logging the outcome.
pub async fn sync_repository(
    resolver: &RepositoryResolver,
    updater: &dyn Updater,
    full_name: &str,
) -> SyncOutcome {
    let Some(path) = resolver.resolve(full_name) else {
        info!(
            "New commits were pushed to repository '{}' but it is not configured",
            full_name
        );
        return SyncOutcome::NotConfigured;
    };

    let outcome = sync(updater, &path).await;
    match &outcome {
        SyncOutcome::Success => {
            info!("Repository '{}' successfully updated at {:?}", full_name, path)
        }
        SyncOutcome::CommandFailed(detail) => {
            error!("Sync of repository '{}' failed: {}", full_name, detail)
        }
        SyncOutcome::NotConfigured => {}
    }
    outcome
}
