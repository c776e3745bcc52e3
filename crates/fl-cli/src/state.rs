//! JSON state store: the CLI's stand-in for the popup's browser storage.
//!
//! Holds the `ViewState` plus the last resolved record set per domain.
//! Commands load at start, mutate in memory, and save once at the end;
//! concurrent invocations are last-write-wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fl_core::{AssignmentDomain, AssignmentRecord, ViewState};

/// Everything persisted between invocations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    pub view: ViewState,
    /// Last rendered assignment set per domain.
    pub records: HashMap<AssignmentDomain, Vec<AssignmentRecord>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Explicit load/save boundary over one JSON file.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads persisted state; a missing file is a fresh default, a corrupt
    /// file is an error (it would silently lose selections otherwise).
    pub fn load(&self) -> Result<PersistedState> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(PersistedState::default());
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Failed to read state file: {}", self.path.display())
                });
            }
        };
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse state file: {}", self.path.display()))
    }

    /// Saves state, stamping `updated_at`.
    pub fn save(&self, mut state: PersistedState) -> Result<()> {
        state.updated_at = Some(Utc::now());
        let contents = serde_json::to_string_pretty(&state)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write state file: {}", self.path.display()))
    }
}
