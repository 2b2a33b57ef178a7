use crate::vault::engine::ArchiveError;
use crate::vault::record::clear_record;
use crate::vault::resolver::missing_ancestor;
use crate::vault::store::Store;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Archive,
    Unarchive,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Unarchive => "unarchive",
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            Self::Archive => "Archive",
            Self::Unarchive => "Unarchive",
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Archive => "archived",
            Self::Unarchive => "unarchived",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUndo {
    pub kind: OperationKind,
    pub original_path: String,
    pub new_path: String,
    pub subject_name: String,
    pub deadline_epoch_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UndoOutcome {
    pub reversed: OperationKind,
    pub subject_name: String,
    pub restored_path: String,
}

/// Single-slot holder for the most recent reversible operation.
#[derive(Debug, Clone, Default)]
pub struct UndoController {
    pending: Option<PendingUndo>,
}

impl UndoController {
    pub fn from_pending(pending: Option<PendingUndo>) -> Self {
        Self { pending }
    }

    /// Raw slot, expired or not; used when persisting.
    pub fn slot(&self) -> Option<&PendingUndo> {
        self.pending.as_ref()
    }

    /// Replace whatever is pending; the previous deadline is dropped silently.
    pub fn register(
        &mut self,
        kind: OperationKind,
        original_path: &str,
        new_path: &str,
        subject_name: &str,
        now_ms: u64,
        window_secs: u64,
    ) -> &PendingUndo {
        self.pending.insert(PendingUndo {
            kind,
            original_path: original_path.to_string(),
            new_path: new_path.to_string(),
            subject_name: subject_name.to_string(),
            deadline_epoch_ms: now_ms.saturating_add(window_secs.saturating_mul(1000)),
        })
    }

    /// Clear the slot when its deadline has passed. Returns true if it did.
    pub fn expire(&mut self, now_ms: u64) -> bool {
        let expired = self
            .pending
            .as_ref()
            .is_some_and(|p| now_ms >= p.deadline_epoch_ms);
        if expired {
            self.pending = None;
        }
        expired
    }

    pub fn pending(&mut self, now_ms: u64) -> Option<&PendingUndo> {
        self.expire(now_ms);
        self.pending.as_ref()
    }

    /// Reverse the pending action: strip the subject's record and move it
    /// back. The slot is consumed whether or not the reversal succeeds.
    pub fn consume<S: Store + ?Sized>(
        &mut self,
        store: &S,
        carrier_file_name: &str,
        now_ms: u64,
    ) -> Result<UndoOutcome, ArchiveError> {
        self.expire(now_ms);
        let Some(action) = self.pending.take() else {
            return Err(ArchiveError::Precondition("nothing to undo".to_string()));
        };

        let Some(subject) = store.resolve(&action.new_path) else {
            return Err(ArchiveError::Precondition(format!(
                "cannot undo: \"{}\" is no longer at {}",
                action.subject_name, action.new_path
            )));
        };
        if store.exists(&action.original_path) {
            return Err(ArchiveError::Precondition(format!(
                "cannot undo: {} is occupied",
                action.original_path
            )));
        }
        if missing_ancestor(store, &action.original_path) {
            return Err(ArchiveError::Precondition(format!(
                "cannot undo: the folder holding {} no longer exists",
                action.original_path
            )));
        }

        clear_record(store, &subject, carrier_file_name)?;
        store.move_entry(&subject, &action.original_path)?;

        Ok(UndoOutcome {
            reversed: action.kind,
            subject_name: action.subject_name,
            restored_path: action.original_path,
        })
    }
}
