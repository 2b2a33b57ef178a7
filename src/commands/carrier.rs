use anyhow::Result;
use std::path::PathBuf;

use crate::commands::{CommandReport, VaultSession};
use crate::vault::carrier::{check_rename_conflicts, rename_all};
use crate::vault::enumerate::find_carrier_files;
use crate::vault::settings::{load_file_settings, save_settings, validate_carrier_name};

#[derive(Debug, Clone)]
pub enum CarrierAction {
    List,
    Check { name: String },
    Rename { name: String },
}

#[derive(Debug, Clone)]
pub struct CarrierOptions {
    pub vault: Option<PathBuf>,
    pub action: CarrierAction,
}

pub fn run(opts: &CarrierOptions) -> Result<CommandReport> {
    let session = VaultSession::open(opts.vault.as_deref())?;
    match &opts.action {
        CarrierAction::List => list(&session),
        CarrierAction::Check { name } => check(&session, name),
        CarrierAction::Rename { name } => {
            let _lock = session.lock("carrier-rename")?;
            rename(&session, name)
        }
    }
}

fn list(session: &VaultSession) -> Result<CommandReport> {
    let mut report = CommandReport::new("carrier-list");
    let settings = &session.settings;
    let carriers = find_carrier_files(
        &session.store,
        &settings.archive_folder,
        &settings.carrier_file_name,
    )?;
    report.detail(format!("carrier_file_name={}", settings.carrier_file_name));
    report.detail(format!("count={}", carriers.len()));
    for entry in carriers {
        report.detail(entry.path);
    }
    Ok(report)
}

/// Conflicting destinations for a rename to `new_name`, each as an issue.
fn conflicts_into(session: &VaultSession, new_name: &str, report: &mut CommandReport) -> Result<bool> {
    if let Err(err) = validate_carrier_name(new_name) {
        report.issue(format!("{err:#}"));
        return Ok(false);
    }
    let settings = &session.settings;
    let conflicts = check_rename_conflicts(
        &session.store,
        &settings.archive_folder,
        &settings.carrier_file_name,
        new_name,
    )?;
    for path in &conflicts {
        report.issue(format!("conflict: {path} already exists"));
    }
    Ok(conflicts.is_empty())
}

fn check(session: &VaultSession, new_name: &str) -> Result<CommandReport> {
    let mut report = CommandReport::new("carrier-check");
    if conflicts_into(session, new_name, &mut report)? {
        report.detail(format!(
            "no conflicts renaming {} to {new_name}",
            session.settings.carrier_file_name
        ));
    }
    Ok(report)
}

/// Rename every carrier to `new_name` and persist the new name. Refuses when
/// any destination is occupied. Callers hold the vault lock.
pub fn rename(session: &VaultSession, new_name: &str) -> Result<CommandReport> {
    let mut report = CommandReport::new("carrier-rename");
    let old_name = session.settings.carrier_file_name.as_str();
    if new_name == old_name {
        report.detail(format!("carrier file name is already {new_name}"));
        return Ok(report);
    }
    if !conflicts_into(session, new_name, &mut report)? {
        report.issue("rename refused; resolve the conflicts first");
        return Ok(report);
    }

    let summary = rename_all(
        &session.store,
        &session.settings.archive_folder,
        old_name,
        new_name,
    )?;
    let line = format!(
        "renamed {} carrier files from {old_name} to {new_name} ({} failed)",
        summary.renamed, summary.failed
    );
    session.audit("carrier-rename", if summary.failed == 0 { "ok" } else { "partial" }, &line);
    report.detail(line);
    if summary.failed > 0 {
        report.issue(format!("{} carrier files could not be renamed", summary.failed));
    }

    let mut file_settings = load_file_settings(&session.paths.settings_file)?;
    file_settings.carrier_file_name = new_name.to_string();
    save_settings(&session.paths.settings_file, &file_settings)?;
    report.detail(format!("settings_file={}", session.paths.settings_file.display()));
    Ok(report)
}
