//! Layered image configuration.
//!
//! Sources are merged in priority order:
//!
//! 1. Built-in defaults
//! 2. JSON config file (explicit path, or `config.json` in the user config
//!    directory)
//! 3. Environment variables (`TAPIR_*`)
//! 4. Command line overrides, applied by the caller
//!
//! ## Environment Variables
//!
//! - `TAPIR_MAX_CONCURRENT_QUERIES` - Parallel repository queries
//! - `TAPIR_QUERY_TIMEOUT` - Per-repository timeout in seconds
//! - `TAPIR_RESOLVE_TIMEOUT` - Whole-resolution timeout in seconds (`0` disables)
//! - `TAPIR_LOOKAHEAD_DEPTH` - Candidate pruning depth
//! - `TAPIR_EAGER_PRERELEASES` - Load pre-releases up front (`true`/`false`)

use crate::error::ConfigError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tapir_resolver::{DEFAULT_LOOKAHEAD_DEPTH, ResolverConfig};
use tracing::debug;

/// Image layer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Maximum repository queries in flight.
    pub max_concurrent_queries: usize,
    /// Per-repository query timeout in seconds.
    pub query_timeout_secs: u64,
    /// Overall resolution timeout in seconds.
    pub resolve_timeout_secs: Option<u64>,
    /// Depth bound for candidate pruning.
    pub max_lookahead_depth: usize,
    /// Query all pre-releases up front instead of on demand.
    pub eager_prereleases: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_concurrent_queries: 8,
            query_timeout_secs: 30,
            resolve_timeout_secs: None,
            max_lookahead_depth: DEFAULT_LOOKAHEAD_DEPTH,
            eager_prereleases: false,
        }
    }
}

impl ImageConfig {
    /// Default config file location, if the platform has one.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "tapir").map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load defaults, then the config file, then the environment.
    ///
    /// An explicit `path` must exist. The default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Read one JSON config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config = Self::from_json(&json).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Parse a JSON config document.
    pub fn from_json(json: &str) -> Result<Self, sonic_rs::Error> {
        sonic_rs::from_str(json)
    }

    /// Apply `TAPIR_*` variables from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply `TAPIR_*` variables from an arbitrary lookup.
    pub fn apply_env_with(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = env_value(&lookup, "TAPIR_MAX_CONCURRENT_QUERIES")? {
            self.max_concurrent_queries = value;
        }
        if let Some(value) = env_value(&lookup, "TAPIR_QUERY_TIMEOUT")? {
            self.query_timeout_secs = value;
        }
        if let Some(value) = env_value::<u64>(&lookup, "TAPIR_RESOLVE_TIMEOUT")? {
            self.resolve_timeout_secs = (value > 0).then_some(value);
        }
        if let Some(value) = env_value(&lookup, "TAPIR_LOOKAHEAD_DEPTH")? {
            self.max_lookahead_depth = value;
        }
        if let Some(raw) = lookup("TAPIR_EAGER_PRERELEASES") {
            self.eager_prereleases = parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: "TAPIR_EAGER_PRERELEASES".into(),
                value: raw.clone(),
            })?;
        }
        Ok(())
    }

    /// Reject values the image layer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_queries == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_concurrent_queries".into(),
                value: "0".into(),
            });
        }
        if self.query_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "query_timeout_secs".into(),
                value: "0".into(),
            });
        }
        Ok(())
    }

    /// Per-repository query timeout.
    #[must_use]
    pub const fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Overall resolution timeout.
    #[must_use]
    pub fn resolve_timeout(&self) -> Option<Duration> {
        self.resolve_timeout_secs.map(Duration::from_secs)
    }

    /// Resolver settings derived from this config.
    #[must_use]
    pub const fn to_resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            max_lookahead_depth: self.max_lookahead_depth,
        }
    }
}

fn env_value<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.clone(),
            })
        })
        .transpose()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
