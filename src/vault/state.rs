use crate::error::VarcError;
use crate::vault::paths::VaultPaths;
use crate::vault::undo::PendingUndo;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultState {
    pub schema_version: u32,
    pub pending_undo: Option<PendingUndo>,
}

impl Default for VaultState {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            pending_undo: None,
        }
    }
}

pub fn load(paths: &VaultPaths) -> Result<VaultState> {
    let file = &paths.state_file;
    if !file.exists() {
        return Ok(VaultState::default());
    }

    let raw =
        fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
    let parsed: VaultState = serde_json::from_str(&raw)
        .map_err(|err| VarcError::StateCorrupt(format!("{}: {err}", file.display())))?;
    if parsed.schema_version > SCHEMA_VERSION {
        return Err(VarcError::StateCorrupt(format!(
            "{} has schema_version {} (this build understands {SCHEMA_VERSION})",
            file.display(),
            parsed.schema_version
        ))
        .into());
    }
    Ok(parsed)
}

pub fn save(paths: &VaultPaths, state: &VaultState) -> Result<PathBuf> {
    let file = paths.state_file.clone();
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let data = serde_json::to_string_pretty(state)?;
    fs::write(&file, format!("{data}\n"))
        .with_context(|| format!("failed to write {}", file.display()))?;
    Ok(file)
}
