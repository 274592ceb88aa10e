//! Global configuration file (`config.toml`).

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from configuration loading.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file: {path}")]
    #[diagnostic(
        code(pensum::config::read),
        help("Check that the file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {path}")]
    #[diagnostic(
        code(pensum::config::parse),
        help("The file must be valid TOML. Known keys: data_file, extractor_endpoint, [server].")
    )]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Daemon bind settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind (default `127.0.0.1`).
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port to listen on (default `7151`).
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7151
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

/// Global pensum configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Override for the obligation collection file.
    #[serde(default)]
    pub data_file: Option<PathBuf>,
    /// Endpoint of the remote text-understanding service. When unset, the
    /// built-in phrase extractor is used.
    #[serde(default)]
    pub extractor_endpoint: Option<String>,
    /// Daemon settings.
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load from a TOML file; a missing file yields the defaults.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e,
        })
    }
}
