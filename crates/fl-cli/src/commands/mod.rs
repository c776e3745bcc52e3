//! Per-command drivers. Each command loads persisted state, talks to the
//! API through [`fl_core::ManagementApi`], renders, and saves state back.

pub mod assignments;
pub mod groups;
pub mod logs;
pub mod scripts;

use anyhow::{Context, Result};

use fl_graph::{CredentialProvider, GraphClient};

use crate::config::AppConfig;

/// Builds the Graph client from config. `FLEETLENS_TOKEN` wins over the
/// config's static token, which wins over the capture file.
pub fn build_client(config: &AppConfig) -> Result<GraphClient> {
    let credentials = if let Ok(token) = std::env::var("FLEETLENS_TOKEN") {
        CredentialProvider::static_token(token)
    } else if let Some(token) = &config.credential.token {
        CredentialProvider::static_token(token.as_str())
    } else {
        CredentialProvider::capture_file(&config.credential.capture_file)
    };
    GraphClient::new(&config.graph, credentials).context("Failed to initialize Graph client")
}
