//! Archive and unarchive flows for a single unit.
//!
//! Each flow is linear with prompt suspend points. Entries are re-resolved by
//! path after every prompt and every store mutation; nothing resolved before a
//! suspend point is trusted after it.

use crate::vault::frontmatter::header_is_editable;
use crate::vault::prompt::{ConflictChoice, MissingPathChoice, Prompter};
use crate::vault::record::{
    ArchiveRecord, CodecOptions, clear_record, read_record, sidecar_path, write_record,
};
use crate::vault::resolver::{
    destination_for, is_within, missing_ancestor, normalize, parent_of, unique_alternative,
};
use crate::vault::store::{Entry, Store, UnitKind};
use crate::vault::undo::{OperationKind, UndoController, UndoOutcome};
use crate::vault::util::{archive_timestamp, now_epoch_millis};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// A prompt was declined or cancelled.
    #[error("cancelled")]
    Aborted,
    #[error("{0}")]
    Precondition(String),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl ArchiveError {
    /// Message with the full context chain for store failures.
    pub fn describe(&self) -> String {
        match self {
            Self::Store(err) => format!("{err:#}"),
            other => other.to_string(),
        }
    }
}

/// Knobs the engine reads from settings.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub archive_root: String,
    pub confirm_archive: bool,
    pub confirm_unarchive: bool,
    pub undo_window_secs: u64,
    pub codec: CodecOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveOutcome {
    pub kind: OperationKind,
    pub subject_name: String,
    pub from: String,
    pub to: String,
    pub undo_window_secs: u64,
}

pub struct Archiver<'a, S: Store + ?Sized, P: Prompter + ?Sized> {
    store: &'a S,
    prompter: &'a mut P,
    options: &'a EngineOptions,
    undo: &'a mut UndoController,
}

fn precondition(message: impl Into<String>) -> ArchiveError {
    ArchiveError::Precondition(message.into())
}

fn normalized(path: &str) -> Result<String, ArchiveError> {
    normalize(path).map_err(|err| precondition(err.to_string()))
}

/// `path` lies under `archive_root` (the root itself excluded).
pub fn is_archived(path: &str, archive_root: &str) -> bool {
    let Ok(path) = normalize(path) else {
        return false;
    };
    path != archive_root && is_within(&path, archive_root)
}

impl<'a, S: Store + ?Sized, P: Prompter + ?Sized> Archiver<'a, S, P> {
    pub fn new(
        store: &'a S,
        prompter: &'a mut P,
        options: &'a EngineOptions,
        undo: &'a mut UndoController,
    ) -> Self {
        Self {
            store,
            prompter,
            options,
            undo,
        }
    }

    pub fn is_archived(&self, path: &str) -> bool {
        is_archived(path, &self.options.archive_root)
    }

    pub fn archive(&mut self, path: &str) -> Result<MoveOutcome, ArchiveError> {
        let path = normalized(path)?;
        let root = self.options.archive_root.clone();
        if path.is_empty() {
            return Err(precondition("refusing to archive the vault root"));
        }
        let Some(unit) = self.store.resolve(&path) else {
            return Err(precondition(format!("not found: {path}")));
        };
        if is_within(&path, &root) {
            return Err(precondition(format!("\"{}\" is already archived", unit.name())));
        }
        if unit.is_dir() && is_within(&root, &path) {
            return Err(precondition(format!(
                "\"{}\" contains the archive folder {root}",
                unit.name()
            )));
        }
        if unit.unit_kind() == UnitKind::Document && !header_is_editable(self.store, &unit)? {
            return Err(precondition(format!(
                "cannot archive: header block of {path} is not valid YAML"
            )));
        }

        if self.options.confirm_archive
            && !self.prompter.confirm(OperationKind::Archive, unit.name())?
        {
            return Err(ArchiveError::Aborted);
        }

        if !self.store.exists(&root) {
            self.store.create_directory(&root)?;
        }

        let unit = self.reresolve(&path)?;
        let destination = destination_for(&unit, &root);
        let final_path = self.settle_destination(&destination)?;

        let unit = self.reresolve(&path)?;
        self.store.move_entry(&unit, &final_path)?;

        let moved = self.reresolve(&final_path)?;
        let record = ArchiveRecord::new(path.as_str(), archive_timestamp());
        write_record(self.store, &moved, &record, &self.options.codec)?;

        self.finish(OperationKind::Archive, &path, &moved)
    }

    pub fn unarchive(&mut self, path: &str) -> Result<MoveOutcome, ArchiveError> {
        let path = normalized(path)?;
        if !self.is_archived(&path) {
            return Err(precondition(format!("\"{path}\" is not archived")));
        }
        let Some(unit) = self.store.resolve(&path) else {
            return Err(precondition(format!("not found: {path}")));
        };

        if self.options.confirm_unarchive
            && !self.prompter.confirm(OperationKind::Unarchive, unit.name())?
        {
            return Err(ArchiveError::Aborted);
        }

        let unit = self.reresolve(&path)?;
        let carrier = self.options.codec.carrier_file_name.clone();
        let no_origin = || {
            precondition(format!(
                "cannot determine original location of \"{}\"",
                unit.name()
            ))
        };
        let record = read_record(self.store, &unit, &carrier)?.ok_or_else(no_origin)?;
        let target = normalized(&record.archived_from)?;
        if target.is_empty() {
            return Err(no_origin());
        }
        if is_within(&target, &self.options.archive_root) {
            return Err(precondition(format!(
                "recorded origin {target} lies inside the archive folder"
            )));
        }

        if missing_ancestor(self.store, &target) {
            let parent = parent_of(&target);
            match self.prompter.resolve_missing_path(parent)? {
                MissingPathChoice::Create => self.store.create_directory(parent)?,
                MissingPathChoice::Cancel => return Err(ArchiveError::Aborted),
            }
        }

        let final_path = self.settle_destination(&target)?;

        let unit = self.reresolve(&path)?;
        self.store.move_entry(&unit, &final_path)?;

        let moved = self.reresolve(&final_path)?;
        match moved.unit_kind() {
            // The sidecar does not travel with its owner.
            UnitKind::OpaqueFile => clear_record(self.store, &unit, &carrier)?,
            UnitKind::Document | UnitKind::Directory => {
                clear_record(self.store, &moved, &carrier)?
            }
        }

        self.finish(OperationKind::Unarchive, &path, &moved)
    }

    /// Reverse the pending action, if it has not expired.
    pub fn undo(&mut self) -> Result<UndoOutcome, ArchiveError> {
        let now_ms = now_epoch_millis()?;
        self.undo
            .consume(self.store, &self.options.codec.carrier_file_name, now_ms)
    }

    fn reresolve(&self, path: &str) -> Result<Entry, ArchiveError> {
        self.store
            .resolve(path)
            .ok_or_else(|| precondition(format!("{path} disappeared during the operation")))
    }

    /// Final path for a move into `destination`, prompting on conflict.
    fn settle_destination(&mut self, destination: &str) -> Result<String, ArchiveError> {
        if !self.store.exists(destination) {
            return Ok(destination.to_string());
        }
        match self.prompter.resolve_conflict(destination)? {
            ConflictChoice::Replace => {
                if let Some(occupant) = self.store.resolve(destination) {
                    self.trash_occupant(&occupant)?;
                }
                Ok(destination.to_string())
            }
            ConflictChoice::KeepBoth => Ok(unique_alternative(self.store, destination)),
            ConflictChoice::Cancel => Err(ArchiveError::Aborted),
        }
    }

    fn trash_occupant(&self, occupant: &Entry) -> Result<(), ArchiveError> {
        if occupant.unit_kind() == UnitKind::OpaqueFile {
            let sidecar = sidecar_path(&occupant.path, &self.options.codec.carrier_file_name);
            if let Some(sidecar) = self.store.resolve(&sidecar) {
                self.store.trash(&sidecar)?;
            }
        }
        self.store.trash(occupant)?;
        Ok(())
    }

    fn finish(
        &mut self,
        kind: OperationKind,
        from: &str,
        moved: &Entry,
    ) -> Result<MoveOutcome, ArchiveError> {
        let now_ms = now_epoch_millis()?;
        let window = self.options.undo_window_secs;
        self.undo
            .register(kind, from, &moved.path, moved.name(), now_ms, window);
        Ok(MoveOutcome {
            kind,
            subject_name: moved.name().to_string(),
            from: from.to_string(),
            to: moved.path.clone(),
            undo_window_secs: window,
        })
    }
}
