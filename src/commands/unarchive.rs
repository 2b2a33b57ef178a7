use anyhow::Result;
use std::path::PathBuf;

use crate::commands::{CommandReport, PromptOptions, VaultSession, terminal_prompter};
use crate::vault::engine::Archiver;
use crate::vault::undo::OperationKind;

#[derive(Debug, Clone)]
pub struct UnarchiveOptions {
    pub vault: Option<PathBuf>,
    pub paths: Vec<String>,
    pub prompt: PromptOptions,
}

pub fn run(opts: &UnarchiveOptions) -> Result<CommandReport> {
    let session = VaultSession::open(opts.vault.as_deref())?;
    let _lock = session.lock("unarchive")?;
    let mut report = CommandReport::new("unarchive");

    let engine_opts = session.settings.engine_options();
    let mut undo = session.load_undo()?;
    let mut prompter = terminal_prompter(opts.prompt);
    {
        let mut archiver = Archiver::new(&session.store, &mut prompter, &engine_opts, &mut undo);
        for path in &opts.paths {
            let result = archiver.unarchive(path);
            session.record_move(&mut report, OperationKind::Unarchive, path, result);
        }
    }
    session.save_undo(&mut undo)?;

    Ok(report)
}
