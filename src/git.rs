//! Version-control updater: fast-forwards a working copy with `git pull`

use async_trait::async_trait;
use std::path::Path;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::Command;
use tracing::{error, info};

/// Log target for updater output
pub const PULL_TARGET: &str = "hub_sync::git::pull";

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("{program} failed to start: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} pull exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{program} pull did not finish within {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
}

/// Updates a local working copy from its remote.
#[async_trait]
pub trait Updater: Send + Sync {
    async fn pull(&self, directory: &Path) -> Result<(), SyncError>;
}

/// Runs `git pull --no-edit` inside the working copy, bounded by a deadline.
#[derive(Debug, Clone)]
pub struct GitUpdater {
    program: String,
    timeout: Duration,
}

impl GitUpdater {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: "git".to_string(),
            timeout,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

#[async_trait]
impl Updater for GitUpdater {
    async fn pull(&self, directory: &Path) -> Result<(), SyncError> {
        info!(
            target: PULL_TARGET,
            "Running (cwd = {:?}): {} pull --no-edit", directory, self.program
        );

        // kill_on_drop reaps the child if the deadline drops the future
        let child = Command::new(&self.program)
            .current_dir(directory)
            .args(["pull", "--no-edit"])
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| {
                error!(target: PULL_TARGET, "{} pull timed out after {:?}", self.program, self.timeout);
                SyncError::TimedOut {
                    program: self.program.clone(),
                    timeout: self.timeout,
                }
            })?
            .map_err(|e| {
                error!(target: PULL_TARGET, "{} pull failed to start: {}", self.program, e);
                SyncError::Spawn {
                    program: self.program.clone(),
                    source: e,
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(target: PULL_TARGET, "{} pull failed: {}", self.program, stderr);
            return Err(SyncError::CommandFailed {
                program: self.program.clone(),
                status: output.status,
                stderr,
            });
        }

        info!(
            target: PULL_TARGET,
            "{} pull output:\n{}",
            self.program,
            String::from_utf8_lossy(&output.stdout)
        );
        Ok(())
    }
}
