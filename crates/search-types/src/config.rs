//! Configuration loading for graph-search.
//!
//! Layered config: defaults -> config file -> env vars. The config file
//! lives at the platform config dir for `graph-search` (for example
//! `~/.config/graph-search/config.toml`); environment variables use the
//! `GRAPH_SEARCH_` prefix.

use std::path::PathBuf;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Which execution backend variant the query coordinator uses.
///
/// Selected once at startup based on host capability; it does not change
/// mid-session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Shared background execution context, asynchronous message passing.
    #[default]
    Offloaded,
    /// Synchronous in-process evaluation against the index store.
    Local,
}

/// Configuration for the search/indexing subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum simultaneous fetch+index operations.
    #[serde(default = "default_concurrency_ceiling")]
    pub concurrency_ceiling: usize,

    /// Result cap applied when a caller does not pass one.
    #[serde(default = "default_max_results")]
    pub default_max_results: usize,

    /// Execution backend variant.
    #[serde(default)]
    pub backend: BackendMode,
}

fn default_concurrency_ceiling() -> usize {
    100
}

fn default_max_results() -> usize {
    100
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            concurrency_ceiling: default_concurrency_ceiling(),
            default_max_results: default_max_results(),
            backend: BackendMode::default(),
        }
    }
}

impl SearchConfig {
    /// Load configuration with layered precedence:
    ///
    /// 1. Built-in defaults
    /// 2. Default config file (platform config dir)
    /// 3. Explicit config file, when given
    /// 4. Environment variables (GRAPH_SEARCH_*)
    pub fn load(config_path: Option<&str>) -> Result<Self, CoreError> {
        let config_dir = ProjectDirs::from("", "", "graph-search")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("concurrency_ceiling", default_concurrency_ceiling() as i64)
            .map_err(|e| CoreError::Config(e.to_string()))?
            .set_default("default_max_results", default_max_results() as i64)
            .map_err(|e| CoreError::Config(e.to_string()))?
            .set_default("backend", "offloaded")
            .map_err(|e| CoreError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("GRAPH_SEARCH")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| CoreError::Config(e.to_string()))?;

        let settings: Self = config
            .try_deserialize()
            .map_err(|e| CoreError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.concurrency_ceiling == 0 {
            return Err(CoreError::Config(
                "concurrency_ceiling must be > 0".to_string(),
            ));
        }
        if self.default_max_results == 0 {
            return Err(CoreError::Config(
                "default_max_results must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
