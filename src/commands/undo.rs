use anyhow::Result;
use std::path::PathBuf;

use crate::commands::{CommandReport, VaultSession};
use crate::vault::engine::ArchiveError;
use crate::vault::util::now_epoch_millis;

#[derive(Debug, Clone, Default)]
pub struct UndoOptions {
    pub vault: Option<PathBuf>,
}

pub fn run(opts: &UndoOptions) -> Result<CommandReport> {
    let session = VaultSession::open(opts.vault.as_deref())?;
    let _lock = session.lock("undo")?;
    let mut report = CommandReport::new("undo");

    let mut undo = session.load_undo()?;
    let carrier = &session.settings.carrier_file_name;
    match undo.consume(&session.store, carrier, now_epoch_millis()?) {
        Ok(outcome) => {
            let line = format!(
                "reversed {} of {} (back at {})",
                outcome.reversed.as_str(),
                outcome.subject_name,
                outcome.restored_path
            );
            session.audit("undo", "ok", &line);
            report.detail(line);
        }
        Err(err @ ArchiveError::Precondition(_)) => report.issue(err.describe()),
        Err(err) => {
            let message = format!("undo failed: {}", err.describe());
            session.audit("undo", "failed", &message);
            report.issue(message);
        }
    }
    session.save_undo(&mut undo)?;

    Ok(report)
}
