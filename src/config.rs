//! Pool configuration, persisted as TOML.
//!
//! A config file is optional: every field has a default, and the CLI flags
//! override whatever the file says.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from config operations.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(codepool::config::read),
        help("Ensure the config file exists and is readable, or omit `--config` to use defaults.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}")]
    #[diagnostic(
        code(codepool::config::parse),
        help("Check the TOML syntax. Recognized keys are `path`, `total` and `bind`. {message}")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(codepool::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Settings shared by the CLI and the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Location of the pool file.
    #[serde(default = "default_path")]
    pub path: PathBuf,
    /// Number of codes to issue when the pool is first created.
    #[serde(default = "default_total")]
    pub total: usize,
    /// Address the HTTP server listens on.
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_path() -> PathBuf {
    PathBuf::from("codes.json")
}
fn default_total() -> usize {
    40
}
fn default_bind() -> String {
    "0.0.0.0:8100".into()
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            total: default_total(),
            bind: default_bind(),
        }
    }
}

impl PoolConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load from `path` if given, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_single_pool_deployment() {
        let config = PoolConfig::default();
        assert_eq!(config.path, PathBuf::from("codes.json"));
        assert_eq!(config.total, 40);
        assert_eq!(config.bind, "0.0.0.0:8100");
    }

    #[test]
    fn missing_keys_take_defaults() {
        let config: PoolConfig = toml::from_str("total = 55\n").unwrap();
        assert_eq!(config.total, 55);
        assert_eq!(config.path, PathBuf::from("codes.json"));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("codepool.toml");
        let config = PoolConfig {
            path: PathBuf::from("finetuned.json"),
            total: 55,
            bind: "127.0.0.1:9000".into(),
        };
        config.save(&path).unwrap();
        assert_eq!(PoolConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn bad_toml_is_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("codepool.toml");
        std::fs::write(&path, "total = \"many\"").unwrap();
        assert!(matches!(
            PoolConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn no_path_means_defaults() {
        assert_eq!(PoolConfig::load_or_default(None).unwrap(), PoolConfig::default());
    }
}
