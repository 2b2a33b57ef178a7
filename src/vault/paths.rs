use crate::error::VarcError;
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

pub const TRASH_DIR: &str = ".trash";

#[derive(Debug, Clone)]
pub struct VaultPaths {
    pub vault_root: PathBuf,
    pub state_dir: PathBuf,
    pub settings_file: PathBuf,
    pub state_file: PathBuf,
    pub logs_dir: PathBuf,
    pub lock_file: PathBuf,
}

impl VaultPaths {
    pub fn for_vault(vault_root: &Path, state_dir: PathBuf) -> Self {
        Self {
            vault_root: vault_root.to_path_buf(),
            settings_file: state_dir.join("settings.toml"),
            state_file: state_dir.join("state").join("varc_state.json"),
            logs_dir: state_dir.join("logs"),
            lock_file: state_dir.join("varc.lock"),
            state_dir,
        }
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(PathBuf::from(v.trim())),
        _ => None,
    }
}

pub fn resolve_paths(vault_override: Option<&Path>) -> Result<VaultPaths> {
    let vault_root = match vault_override.map(Path::to_path_buf).or_else(|| env_path("VARC_VAULT")) {
        Some(path) => path,
        None => env::current_dir().context("current directory could not be resolved")?,
    };

    if !vault_root.is_dir() {
        return Err(VarcError::VaultMissing(vault_root.display().to_string()).into());
    }
    let vault_root = vault_root
        .canonicalize()
        .with_context(|| format!("failed to canonicalize {}", vault_root.display()))?;

    let state_dir = env_path("VARC_HOME").unwrap_or_else(|| vault_root.join(".varc"));
    Ok(VaultPaths::for_vault(&vault_root, state_dir))
}
