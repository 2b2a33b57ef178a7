use crate::vault::paths::VaultPaths;
use crate::vault::util::now_epoch_secs;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::Write;

pub const AUDIT_FILE: &str = "audit.log";

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub at_epoch_secs: u64,
    pub phase: String,
    pub status: String,
    pub message: String,
}

/// Append one JSON line to `<state>/logs/audit.log`.
pub fn append_event(paths: &VaultPaths, phase: &str, status: &str, message: &str) -> Result<()> {
    fs::create_dir_all(&paths.logs_dir)
        .with_context(|| format!("failed to create {}", paths.logs_dir.display()))?;
    let event = AuditEvent {
        at_epoch_secs: now_epoch_secs()?,
        phase: phase.to_string(),
        status: status.to_string(),
        message: message.to_string(),
    };

    let line = format!("{}\n", serde_json::to_string(&event)?);
    let path = paths.logs_dir.join(AUDIT_FILE);
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("failed to append to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn appends_one_json_line_per_event() {
        let tmp = tempdir().expect("tempdir");
        let paths = VaultPaths::for_vault(tmp.path(), tmp.path().join(".varc"));
        append_event(&paths, "archive", "ok", "Projects/a.md -> Archive/a.md").expect("append");
        append_event(&paths, "undo", "failed", "nothing to undo").expect("append");

        let raw = fs::read_to_string(paths.logs_dir.join(AUDIT_FILE)).expect("read");
        let lines = raw.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).expect("json");
        assert_eq!(first["phase"], "archive");
        assert_eq!(first["status"], "ok");
    }
}
