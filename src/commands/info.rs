use anyhow::Result;
use std::path::PathBuf;

use crate::commands::{CommandReport, VaultSession};
use crate::vault::engine::is_archived;
use crate::vault::record::{carrier_path, read_record};
use crate::vault::resolver::normalize;
use crate::vault::store::Store;

#[derive(Debug, Clone)]
pub struct InfoOptions {
    pub vault: Option<PathBuf>,
    pub path: String,
}

pub fn run(opts: &InfoOptions) -> Result<CommandReport> {
    let session = VaultSession::open(opts.vault.as_deref())?;
    let mut report = CommandReport::new("info");

    let path = normalize(&opts.path)?;
    let Some(entry) = session.store.resolve(&path) else {
        report.issue(format!("not found: {path}"));
        return Ok(report);
    };

    let archived = is_archived(&path, &session.settings.archive_folder);

    let carrier = &session.settings.carrier_file_name;
    report.detail(format!("path={path}"));
    report.detail(format!("kind={}", entry.unit_kind().as_str()));
    report.detail(format!("archived={archived}"));
    report.detail(format!("record_carrier={}", carrier_path(&entry, carrier)));
    match read_record(&session.store, &entry, carrier)? {
        Some(record) => {
            report.detail(format!("archived_from={}", record.archived_from));
            report.detail(format!(
                "archived_at={}",
                record.archived_at.as_deref().unwrap_or("unknown")
            ));
        }
        None if archived => report.detail("record=missing (cannot be unarchived)"),
        None => report.detail("record=none"),
    }
    Ok(report)
}
