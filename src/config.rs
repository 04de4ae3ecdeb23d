use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::connectors::ConnectionType;

/// Environment variable naming the config file to load
pub const CONFIG_ENV: &str = "FLOWMAP_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Config parse error at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings for the mapping editor and its local state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowmapConfig {
    /// Directory for persisted session and preference files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory for workflow exports; `<data_dir>/exports` when unset
    #[serde(default)]
    pub exports_dir: Option<PathBuf>,
    /// Default log filter when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Connection type assumed when a node's connection cannot be resolved
    #[serde(default)]
    pub default_connection_type: ConnectionType,
    /// How many transform/filter hops to walk back when looking for a source
    #[serde(default = "default_upstream_search_depth")]
    pub upstream_search_depth: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".flowmap")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_upstream_search_depth() -> usize {
    10
}

impl Default for FlowmapConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            exports_dir: None,
            log_level: default_log_level(),
            default_connection_type: ConnectionType::default(),
            upstream_search_depth: default_upstream_search_depth(),
        }
    }
}

impl FlowmapConfig {
    /// Load config from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from the file named by `FLOWMAP_CONFIG`, or defaults when unset.
    pub fn from_env_or_default() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.exports_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("exports"))
    }
}
