use crate::api::DEFAULT_API_BASE;
use crate::fetch::TriggerPolicy;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const CONFIG_FILE: &str = "config.json";
pub const STORE_FILE: &str = "store.json";
pub const LOG_FILE: &str = "hn-search.log";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    SerializationError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid api_base {base:?}: {source}")]
    InvalidApiBase {
        base: String,
        #[source]
        source: url::ParseError,
    },
}

/// Runtime configuration. Every field has a default, so a config file only
/// needs the keys it wants to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base: String,
    pub default_search_term: String,
    pub trigger: TriggerPolicy,
    pub ignore_stale_responses: bool,
    pub request_timeout_secs: u64,
    pub store_path: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            default_search_term: "React".to_string(),
            trigger: TriggerPolicy::Automatic,
            ignore_stale_responses: true,
            request_timeout_secs: 10,
            store_path: None,
            log_file: None,
        }
    }
}

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "hn-search", "hn-search")
}

impl Config {
    /// Load from `path`, or from the platform config directory when no path
    /// is given. Only an explicitly named file has to exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match project_dirs().map(|d| d.config_dir().join(CONFIG_FILE)) {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config =
            serde_json::from_str(&text).map_err(|source| ConfigError::SerializationError {
                path: path.to_path_buf(),
                source,
            })?;
        config.api_base_url()?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn api_base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.api_base).map_err(|source| ConfigError::InvalidApiBase {
            base: self.api_base.clone(),
            source,
        })
    }

    /// Where the search term is persisted.
    pub fn store_path(&self) -> Option<PathBuf> {
        self.store_path
            .clone()
            .or_else(|| project_dirs().map(|d| d.data_dir().join(STORE_FILE)))
    }

    /// Where the interactive UI writes its log.
    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file
            .clone()
            .or_else(|| project_dirs().map(|d| d.cache_dir().join(LOG_FILE)))
    }
}
