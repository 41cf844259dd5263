//! Configuration store and typed startup settings
//!
//! The store is a read-only key-path lookup (`repository.owner/name`,
//! `log.directory`, ...) backed by a JSON or TOML document, or by a snapshot of
//! the process environment where dots become underscores. It is built once at
//! startup and shared immutably.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{HubSyncError, Result};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_BRANCH: &str = "master";
pub const DEFAULT_SYNC_TIMEOUT_SECS: u64 = 300;
/// GitHub caps webhook payloads at 25 MB
pub const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Key-path lookup over a loaded configuration source.
pub trait ConfigReader: Send + Sync {
    /// Returns the value at a dotted path, or `None` when nothing is configured there.
    fn get(&self, path: &str) -> Option<String>;
}

pub type SharedConfig = Arc<dyn ConfigReader>;

/// Config backed by a parsed JSON or TOML document.
#[derive(Debug, Clone)]
pub struct DocumentConfigReader {
    document: Value,
}

impl DocumentConfigReader {
    pub fn from_value(document: Value) -> Self {
        Self { document }
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(input)?;
        Ok(Self::from_value(document))
    }

    pub fn from_toml_str(input: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(input)?;
        let document = serde_json::to_value(table)?;
        Ok(Self::from_value(document))
    }
}

impl ConfigReader for DocumentConfigReader {
    fn get(&self, path: &str) -> Option<String> {
        let segments: Vec<&str> = path.split('.').collect();
        lookup(&self.document, &segments).and_then(scalar_to_string)
    }
}

/// Walks `segments` down the document. At each level the longest run of
/// segments that names an existing key wins, so keys that contain dots
/// (`owner/site.io`) can still be addressed.
fn lookup<'a>(node: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    if segments.is_empty() {
        return Some(node);
    }
    let map = node.as_object()?;
    for take in (1..=segments.len()).rev() {
        let key = segments[..take].join(".");
        if let Some(child) = map.get(&key) {
            if let Some(found) = lookup(child, &segments[take..]) {
                return Some(found);
            }
        }
    }
    None
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Config backed by environment variables, captured once.
#[derive(Debug, Clone, Default)]
pub struct EnvConfigReader {
    vars: HashMap<String, String>,
}

impl EnvConfigReader {
    /// Snapshot the current process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            vars: vars.into_iter().collect(),
        }
    }

    /// Load an env file (if present) into the process environment, then snapshot it.
    pub fn load(path: &Path) -> Result<Self> {
        if path.is_file() {
            dotenv::from_path(path).map_err(|e| {
                HubSyncError::ConfigError(format!(
                    "Failed to load env file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        } else {
            debug!("Env file {:?} not found, using process environment only", path);
        }
        Ok(Self::from_env())
    }
}

impl ConfigReader for EnvConfigReader {
    fn get(&self, path: &str) -> Option<String> {
        self.vars.get(&path.replace('.', "_")).cloned()
    }
}

/// Load the configuration store, picking the reader from the file extension.
pub fn load_config(path: &Path) -> Result<SharedConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match extension {
        "json" => {
            let content = read_config_file(path)?;
            Ok(Arc::new(DocumentConfigReader::from_json_str(&content)?))
        }
        "toml" => {
            let content = read_config_file(path)?;
            Ok(Arc::new(DocumentConfigReader::from_toml_str(&content)?))
        }
        _ => Ok(Arc::new(EnvConfigReader::load(path)?)),
    }
}

fn read_config_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        HubSyncError::ConfigError(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogSettings {
    pub directory: Option<PathBuf>,
    pub level: Option<String>,
}

/// Typed server settings extracted from the store at startup.
#[derive(Clone)]
pub struct Settings {
    pub secret: String,
    pub host: String,
    pub port: u16,
    pub default_branch: String,
    pub sync_timeout: Duration,
    pub max_body_bytes: usize,
    pub log: LogSettings,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("secret", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("default_branch", &self.default_branch)
            .field("sync_timeout", &self.sync_timeout)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("log", &self.log)
            .finish()
    }
}

impl Settings {
    pub fn from_reader(reader: &dyn ConfigReader) -> Result<Self> {
        let secret = non_empty(reader, "secret")
            .ok_or_else(|| HubSyncError::MissingConfigKey("secret".to_string()))?;

        Ok(Self {
            secret,
            host: non_empty(reader, "host").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(reader, "port", DEFAULT_PORT)?,
            default_branch: non_empty(reader, "default_branch")
                .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            sync_timeout: Duration::from_secs(parse_or(
                reader,
                "sync_timeout_secs",
                DEFAULT_SYNC_TIMEOUT_SECS,
            )?),
            max_body_bytes: parse_or(reader, "max_body_bytes", DEFAULT_MAX_BODY_BYTES)?,
            log: LogSettings {
                directory: non_empty(reader, "log.directory").map(PathBuf::from),
                level: non_empty(reader, "log.level"),
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn non_empty(reader: &dyn ConfigReader, key: &str) -> Option<String> {
    reader.get(key).filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(reader: &dyn ConfigReader, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match non_empty(reader, key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| HubSyncError::InvalidConfigValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const JSON_CONFIG: &str = r#"{
        "port": 9000,
        "secret": "s3cret",
        "repository": {
            "acme/api": "/srv/api",
            "acme/site.io": "/srv/site"
        },
        "log": { "level": "debug" }
    }"#;

    #[test]
    fn json_lookup_walks_nested_keys() {
        let reader = DocumentConfigReader::from_json_str(JSON_CONFIG).unwrap();
        assert_eq!(reader.get("repository.acme/api").as_deref(), Some("/srv/api"));
        assert_eq!(reader.get("log.level").as_deref(), Some("debug"));
        assert_eq!(reader.get("port").as_deref(), Some("9000"));
    }

    #[test]
    fn json_lookup_handles_keys_with_dots() {
        let reader = DocumentConfigReader::from_json_str(JSON_CONFIG).unwrap();
        assert_eq!(
            reader.get("repository.acme/site.io").as_deref(),
            Some("/srv/site")
        );
    }

    #[test]
    fn json_lookup_misses_return_none() {
        let reader = DocumentConfigReader::from_json_str(JSON_CONFIG).unwrap();
        assert_eq!(reader.get("repository.acme/unknown"), None);
        assert_eq!(reader.get("secret.nested"), None);
        // objects are not scalar values
        assert_eq!(reader.get("repository"), None);
    }

    #[test]
    fn toml_documents_share_the_lookup() {
        let reader = DocumentConfigReader::from_toml_str(
            r#"
            secret = "abc"
            port = 8123

            [repository]
            "acme/api" = "/srv/api"
            "#,
        )
        .unwrap();
        assert_eq!(reader.get("repository.acme/api").as_deref(), Some("/srv/api"));
        assert_eq!(reader.get("port").as_deref(), Some("8123"));
    }

    #[test]
    fn env_lookup_replaces_dots_with_underscores() {
        let reader = EnvConfigReader::from_vars([
            ("secret".to_string(), "abc".to_string()),
            ("repository_acme/api".to_string(), "/srv/api".to_string()),
        ]);
        assert_eq!(reader.get("repository.acme/api").as_deref(), Some("/srv/api"));
        assert_eq!(reader.get("secret").as_deref(), Some("abc"));
        assert_eq!(reader.get("port"), None);
    }

    #[test]
    fn settings_apply_defaults() {
        let reader = EnvConfigReader::from_vars([("secret".to_string(), "abc".to_string())]);
        let settings = Settings::from_reader(&reader).unwrap();
        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(settings.default_branch, "master");
        assert_eq!(
            settings.sync_timeout,
            Duration::from_secs(DEFAULT_SYNC_TIMEOUT_SECS)
        );
        assert_eq!(settings.bind_address(), "0.0.0.0:8080");
        assert_eq!(settings.log, LogSettings::default());
    }

    #[test]
    fn settings_read_json_values() {
        let reader = DocumentConfigReader::from_json_str(JSON_CONFIG).unwrap();
        let settings = Settings::from_reader(&reader).unwrap();
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.secret, "s3cret");
        assert_eq!(settings.log.level.as_deref(), Some("debug"));
    }

    #[test]
    fn settings_require_a_secret() {
        let reader = EnvConfigReader::from_vars([("secret".to_string(), "  ".to_string())]);
        let err = Settings::from_reader(&reader).unwrap_err();
        assert!(matches!(err, HubSyncError::MissingConfigKey(key) if key == "secret"));
    }

    #[test]
    fn settings_reject_bad_port() {
        let reader = EnvConfigReader::from_vars([
            ("secret".to_string(), "abc".to_string()),
            ("port".to_string(), "eighty".to_string()),
        ]);
        let err = Settings::from_reader(&reader).unwrap_err();
        assert!(matches!(err, HubSyncError::InvalidConfigValue { key, .. } if key == "port"));
    }

    #[test]
    fn settings_debug_hides_secret() {
        let reader = EnvConfigReader::from_vars([("secret".to_string(), "hunter2".to_string())]);
        let settings = Settings::from_reader(&reader).unwrap();
        assert!(!format!("{:?}", settings).contains("hunter2"));
    }

    #[test]
    fn load_config_picks_reader_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(JSON_CONFIG.as_bytes()).unwrap();

        let reader = load_config(file.path()).unwrap();
        assert_eq!(reader.get("repository.acme/api").as_deref(), Some("/srv/api"));
    }

    #[test]
    fn load_config_reports_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("missing.json")).err().unwrap();
        assert!(matches!(err, HubSyncError::ConfigError(_)));
    }

    #[test]
    fn load_config_reports_parse_errors() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(b"secret = ").unwrap();
        let err = load_config(file.path()).err().unwrap();
        assert!(matches!(err, HubSyncError::TomlParseError(_)));
    }
}
