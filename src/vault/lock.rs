use crate::error::VarcError;
use crate::vault::paths::VaultPaths;
use crate::vault::util::now_epoch_secs;
use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockPayload {
    pub pid: u32,
    pub build_uuid: String,
    pub start_time: u64,
    pub command: String,
}

/// Exclusive advisory lock on `<state>/varc.lock`, held for the life of a
/// mutating command.
#[derive(Debug)]
pub struct VaultLock {
    file: File,
}

fn open_lock_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("failed to open lock file {}", path.display()))
}

fn holder_description(path: &Path) -> String {
    match read_payload(path) {
        Some(payload) => format!("pid {} running `{}`", payload.pid, payload.command),
        None => path.display().to_string(),
    }
}

impl VaultLock {
    pub fn acquire(paths: &VaultPaths, command: &str) -> Result<Self> {
        let path = &paths.lock_file;
        let mut file = open_lock_file(path)?;
        if FileExt::try_lock_exclusive(&file).is_err() {
            return Err(VarcError::Locked(holder_description(path)).into());
        }

        let payload = LockPayload {
            pid: std::process::id(),
            build_uuid: env!("BUILD_UUID").to_string(),
            start_time: now_epoch_secs()?,
            command: command.to_string(),
        };
        file.set_len(0)
            .with_context(|| format!("failed to truncate {}", path.display()))?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(serde_json::to_string(&payload)?.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
        file.flush()?;
        Ok(Self { file })
    }
}

impl Drop for VaultLock {
    fn drop(&mut self) {
        let _ = self.file.set_len(0);
        let _ = FileExt::unlock(&self.file);
    }
}

pub fn read_payload(path: &Path) -> Option<LockPayload> {
    let mut raw = String::new();
    File::open(path).ok()?.read_to_string(&mut raw).ok()?;
    serde_json::from_str(raw.trim()).ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    Free,
    Held(Option<LockPayload>),
}

/// Whether another process currently holds the vault lock.
pub fn probe(paths: &VaultPaths) -> LockState {
    let Ok(file) = File::open(&paths.lock_file) else {
        return LockState::Free;
    };
    if FileExt::try_lock_shared(&file).is_ok() {
        let _ = FileExt::unlock(&file);
        return LockState::Free;
    }
    LockState::Held(read_payload(&paths.lock_file))
}
