//! Maps repository full names to local working copies

use std::path::PathBuf;
use tracing::debug;

use crate::config::SharedConfig;

/// Looks repositories up under the `repository.<full_name>` config key.
#[derive(Clone)]
pub struct RepositoryResolver {
    config: SharedConfig,
}

impl RepositoryResolver {
    pub fn new(config: SharedConfig) -> Self {
        Self { config }
    }

    /// Exact-match lookup. `None` means the repository is not tracked.
    pub fn resolve(&self, full_name: &str) -> Option<PathBuf> {
        let key = format!("repository.{}", full_name);
        let path = self.config.get(&key).filter(|p| !p.trim().is_empty());
        debug!("Resolved {:?} to {:?}", key, path);
        path.map(PathBuf::from)
    }
}
