//! Config resolution: CLI → env → XDG → defaults.
//!
//! The first location that names a file wins; later locations are not
//! merged in. An explicitly named file that is missing is an error, while a
//! missing XDG file silently falls back to the built-in defaults.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::ConsolidatorConfig;
use crate::validate::{validate, ValidationError};

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "PQC_CONFIG";

/// Application directory under the user config dir.
pub const APP_DIR_NAME: &str = "parquet_consolidator";

/// File name looked up in the application config dir.
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse JSON config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum ConfigSource {
    Explicit(PathBuf),
    Environment(PathBuf),
    Xdg(PathBuf),
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Explicit(p) => write!(f, "--config {}", p.display()),
            ConfigSource::Environment(p) => write!(f, "${} {}", CONFIG_ENV_VAR, p.display()),
            ConfigSource::Xdg(p) => write!(f, "{}", p.display()),
            ConfigSource::Defaults => write!(f, "built-in defaults"),
        }
    }
}

/// Candidate config locations, in priority order.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    pub explicit: Option<PathBuf>,
    pub env: Option<PathBuf>,
    pub xdg: Option<PathBuf>,
}

impl ConfigPaths {
    /// Candidates for the running process: `explicit`, then the
    /// [`CONFIG_ENV_VAR`] variable, then the user config directory.
    pub fn discover(explicit: Option<PathBuf>) -> Self {
        Self {
            explicit,
            env: std::env::var_os(CONFIG_ENV_VAR)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            xdg: dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME)),
        }
    }
}

/// A validated configuration and its provenance.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: ConsolidatorConfig,
    pub source: ConfigSource,
}

/// Resolve, parse and validate the effective configuration.
pub fn resolve_config(paths: &ConfigPaths) -> Result<ResolvedConfig, ConfigError> {
    let (config, source) = if let Some(path) = &paths.explicit {
        (load_file(path)?, ConfigSource::Explicit(path.clone()))
    } else if let Some(path) = &paths.env {
        (load_file(path)?, ConfigSource::Environment(path.clone()))
    } else if let Some(path) = paths.xdg.as_ref().filter(|p| p.is_file()) {
        (load_file(path)?, ConfigSource::Xdg(path.clone()))
    } else {
        (ConsolidatorConfig::default(), ConfigSource::Defaults)
    };

    validate(&config)?;
    debug!(source = %source, "resolved configuration");
    Ok(ResolvedConfig { config, source })
}

/// Parse one config file; `.json` files are JSON, everything else TOML.
pub fn load_file(path: &Path) -> Result<ConsolidatorConfig, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    } else {
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let paths = ConfigPaths {
            xdg: Some(dir.path().join("missing.toml")),
            ..Default::default()
        };
        let resolved = resolve_config(&paths).unwrap();
        assert_eq!(resolved.source, ConfigSource::Defaults);
        assert_eq!(resolved.config, ConsolidatorConfig::default());
    }

    #[test]
    fn explicit_beats_env_and_xdg() {
        let dir = tempdir().unwrap();
        let explicit = dir.path().join("explicit.toml");
        let env = dir.path().join("env.toml");
        fs::write(&explicit, "[planner]\nmin_files = 7\n").unwrap();
        fs::write(&env, "[planner]\nmin_files = 9\n").unwrap();

        let resolved = resolve_config(&ConfigPaths {
            explicit: Some(explicit.clone()),
            env: Some(env.clone()),
            xdg: None,
        })
        .unwrap();
        assert_eq!(resolved.config.planner.min_files, 7);
        assert_eq!(resolved.source, ConfigSource::Explicit(explicit));

        let resolved = resolve_config(&ConfigPaths {
            explicit: None,
            env: Some(env.clone()),
            xdg: None,
        })
        .unwrap();
        assert_eq!(resolved.config.planner.min_files, 9);
        assert_eq!(resolved.source, ConfigSource::Environment(env));
    }

    #[test]
    fn xdg_file_used_when_present() {
        let dir = tempdir().unwrap();
        let xdg = dir.path().join("config.toml");
        fs::write(&xdg, "[store]\nroot = \"/mnt/hdfs\"\n").unwrap();
        let resolved = resolve_config(&ConfigPaths {
            xdg: Some(xdg.clone()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(resolved.config.store.root, "/mnt/hdfs");
        assert_eq!(resolved.source, ConfigSource::Xdg(xdg));
    }

    #[test]
    fn json_config_supported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"planner": {"target_output_size_bytes": "1MB"}}"#).unwrap();
        let config = load_file(&path).unwrap();
        assert_eq!(config.planner.target_output_size_bytes, 1024 * 1024);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = resolve_config(&ConfigPaths {
            explicit: Some(dir.path().join("nope.toml")),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn parse_and_validation_errors_surface() {
        let dir = tempdir().unwrap();
        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "[planner\n").unwrap();
        assert!(matches!(load_file(&bad), Err(ConfigError::Toml { .. })));

        let invalid = dir.path().join("invalid.toml");
        fs::write(&invalid, "[planner]\nmin_files = 0\n").unwrap();
        let err = resolve_config(&ConfigPaths {
            explicit: Some(invalid),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
