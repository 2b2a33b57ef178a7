use anyhow::Result;
use std::env;
use std::path::PathBuf;

use crate::commands::{CommandReport, VaultSession};
use crate::vault::lock::{self, LockState};
use crate::vault::state;
use crate::vault::util::{now_epoch_millis, pid_alive};

include!(concat!(env!("OUT_DIR"), "/varc_env_allowlist.rs"));

#[derive(Debug, Clone, Default)]
pub struct StatusOptions {
    pub vault: Option<PathBuf>,
}

/// `VARC_*` variables this build reads that are set in the environment.
fn env_vars_present() -> Vec<&'static str> {
    GENERATED_VARC_ENV_ALLOWLIST
        .iter()
        .copied()
        .filter(|key| env::var_os(key).is_some())
        .collect()
}

pub fn run(opts: &StatusOptions) -> Result<CommandReport> {
    let session = VaultSession::open(opts.vault.as_deref())?;
    let paths = &session.paths;
    let mut report = CommandReport::new("status");

    report.detail(format!("vault_root={}", paths.vault_root.display()));
    report.detail(format!("state_dir={}", paths.state_dir.display()));
    report.detail(format!(
        "settings_file={} ({})",
        paths.settings_file.display(),
        if paths.settings_file.exists() { "present" } else { "absent" }
    ));
    report.detail(format!("archive_folder={}", session.settings.archive_folder));
    if !paths.vault_root.join(&session.settings.archive_folder).is_dir() {
        report.detail("archive_folder.exists=false (created on first archive)");
    }
    let present = env_vars_present();
    report.detail(format!(
        "env.varc={}",
        if present.is_empty() { "none".to_string() } else { present.join(",") }
    ));
    report.detail(format!("build_uuid={}", env!("BUILD_UUID")));

    match lock::probe(paths) {
        LockState::Free => report.detail("lock=free"),
        LockState::Held(None) => report.detail("lock=held (no payload)"),
        LockState::Held(Some(payload)) => {
            report.detail(format!(
                "lock=held pid={} command={} start_time={}",
                payload.pid, payload.command, payload.start_time
            ));
            if !pid_alive(payload.pid) {
                report.issue(format!("lock holder pid {} is not running (stale lock)", payload.pid));
            }
            if payload.build_uuid != env!("BUILD_UUID") {
                report.detail(format!(
                    "lock.build_mismatch (lock={} current={})",
                    payload.build_uuid,
                    env!("BUILD_UUID")
                ));
            }
        }
    }

    match state::load(paths) {
        Ok(current) => match current.pending_undo {
            Some(pending) => {
                let now_ms = now_epoch_millis()?;
                if now_ms < pending.deadline_epoch_ms {
                    report.detail(format!(
                        "pending_undo={} {} -> {} ({}ms left)",
                        pending.kind.as_str(),
                        pending.original_path,
                        pending.new_path,
                        pending.deadline_epoch_ms - now_ms
                    ));
                } else {
                    report.detail("pending_undo=expired");
                }
            }
            None => report.detail("pending_undo=none"),
        },
        Err(err) => report.issue(format!("{err:#}")),
    }

    Ok(report)
}
