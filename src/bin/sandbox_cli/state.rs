//! Persistence of small CLI preferences across invocations.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PersistedState {
    /// Directory last used by `list` or `new`
    pub last_directory: Option<String>,
    pub created_at: Option<String>,
    pub last_modified: Option<String>,
}

pub struct CliState {
    pub persisted: PersistedState,
    /// Whether state has been modified
    pub dirty: bool,
}

impl CliState {
    /// Load state from file, or start empty if it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self {
                persisted: PersistedState {
                    created_at: Some(chrono::Utc::now().to_rfc3339()),
                    ..Default::default()
                },
                dirty: false,
            });
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file {}", path.display()))?;
        let persisted: PersistedState = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid state file {}", path.display()))?;
        Ok(Self {
            persisted,
            dirty: false,
        })
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        self.persisted.last_modified = Some(chrono::Utc::now().to_rfc3339());
        let json = serde_json::to_string_pretty(&self.persisted)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write state file {}", path.display()))?;
        self.dirty = false;
        Ok(())
    }

    pub fn last_directory(&self) -> Option<PathBuf> {
        self.persisted.last_directory.as_ref().map(PathBuf::from)
    }

    pub fn remember_directory(&mut self, dir: &Path) {
        let dir = dir.display().to_string();
        if self.persisted.last_directory.as_deref() != Some(dir.as_str()) {
            self.persisted.last_directory = Some(dir);
            self.dirty = true;
        }
    }
}
