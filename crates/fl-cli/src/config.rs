//! Configuration loading for the FleetLens CLI.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use fl_graph::GraphConfig;

/// Application configuration, loaded from YAML.
///
/// Every section has defaults, so a missing or empty config file yields a
/// working setup against the public Graph endpoint with a capture-file
/// credential next to the state store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Graph connector settings (base URL, timeout, TLS, rate limit).
    pub graph: GraphConfig,

    /// Where the bearer credential comes from.
    pub credential: CredentialConfig,

    /// Path of the JSON state store (view state plus cached results).
    pub state_file: PathBuf,

    /// Logging settings.
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            graph: GraphConfig::default(),
            credential: CredentialConfig::default(),
            state_file: PathBuf::from("fleetlens-state.json"),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Creates a copy with secrets redacted.
    pub fn redact_secrets(&self) -> Self {
        let mut config = self.clone();
        if config.credential.token.is_some() {
            config.credential.token = Some("***REDACTED***".to_string());
        }
        config
    }
}

/// Credential sourcing. A static token takes precedence over the capture
/// file when both are set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Fixed bearer token. Prefer `FLEETLENS_TOKEN` over putting this in
    /// the file.
    pub token: Option<String>,

    /// JSON key-value store written by the browser-side capture
    /// collaborator, re-read before every request.
    pub capture_file: PathBuf,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            token: None,
            capture_file: PathBuf::from("fleetlens-capture.json"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Whether to emit JSON-formatted logs.
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Default config path: `FLEETLENS_CONFIG`, else `fleetlens.yaml` in the
/// working directory.
pub fn default_config_path() -> PathBuf {
    std::env::var_os("FLEETLENS_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("fleetlens.yaml"))
}
