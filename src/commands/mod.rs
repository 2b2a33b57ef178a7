pub mod archive;
pub mod carrier;
pub mod info;
pub mod list;
pub mod settings;
pub mod status;
pub mod unarchive;
pub mod undo;

use crate::logging::{self, WarnEvent};
use crate::vault::engine::{ArchiveError, MoveOutcome};
use crate::vault::lock::VaultLock;
use crate::vault::paths::{VaultPaths, resolve_paths};
use crate::vault::prompt::{ConflictChoice, MissingPathChoice, Prompter, TerminalPrompter};
use crate::vault::settings::{Settings, load_settings};
use crate::vault::state::{self, VaultState};
use crate::vault::store::FsStore;
use crate::vault::undo::{OperationKind, UndoController};
use crate::vault::util::now_epoch_millis;
use crate::vault::audit;
use anyhow::Result;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }

    pub fn merge(&mut self, mut other: CommandReport) {
        self.ok &= other.ok;
        self.details.append(&mut other.details);
        self.issues.append(&mut other.issues);
    }
}

/// Resolved vault, effective settings, and the store over it.
pub struct VaultSession {
    pub paths: VaultPaths,
    pub settings: Settings,
    pub store: FsStore,
}

impl VaultSession {
    pub fn open(vault: Option<&Path>) -> Result<Self> {
        let paths = resolve_paths(vault)?;
        let settings = load_settings(&paths.settings_file)?;
        let store = FsStore::new(&paths.vault_root);
        Ok(Self {
            paths,
            settings,
            store,
        })
    }

    pub fn lock(&self, command: &str) -> Result<VaultLock> {
        VaultLock::acquire(&self.paths, command)
    }

    pub fn load_undo(&self) -> Result<UndoController> {
        let state = state::load(&self.paths)?;
        Ok(UndoController::from_pending(state.pending_undo))
    }

    pub fn save_undo(&self, undo: &mut UndoController) -> Result<()> {
        undo.expire(now_epoch_millis()?);
        let mut current = state::load(&self.paths).unwrap_or_else(|_| VaultState::default());
        current.pending_undo = undo.slot().cloned();
        state::save(&self.paths, &current)?;
        Ok(())
    }

    /// Audit failures never fail the command; they surface as a warning line.
    pub fn audit(&self, phase: &str, status: &str, message: &str) {
        if let Err(err) = audit::append_event(&self.paths, phase, status, message) {
            logging::emit(WarnEvent {
                code: "AUDIT_APPEND_FAILED",
                stage: "audit",
                action: phase,
                subject: message,
                target: &self.paths.logs_dir.display().to_string(),
                reason: "ignored",
                err: &format!("{err:#}"),
            });
        }
    }

    /// Fold one archive/unarchive result into `report` and the audit log.
    pub fn record_move(
        &self,
        report: &mut CommandReport,
        kind: OperationKind,
        subject: &str,
        result: Result<MoveOutcome, ArchiveError>,
    ) {
        match result {
            Ok(outcome) => {
                let line = format!("{} -> {}", outcome.from, outcome.to);
                report.detail(format!(
                    "{} {line} (undo with `varc undo` within {}s)",
                    kind.past_tense(),
                    outcome.undo_window_secs
                ));
                self.audit(kind.as_str(), "ok", &line);
            }
            Err(ArchiveError::Aborted) => {
                report.detail(format!("{} of {subject} cancelled", kind.as_str()));
            }
            Err(err @ ArchiveError::Precondition(_)) => {
                report.issue(err.describe());
            }
            Err(err) => {
                let message = format!("{} of {subject} failed: {}", kind.as_str(), err.describe());
                self.audit(kind.as_str(), "failed", &message);
                report.issue(message);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConflictPolicy {
    Ask,
    Replace,
    KeepBoth,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptOptions {
    pub on_conflict: ConflictPolicy,
    pub create_missing: bool,
    pub assume_yes: bool,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            on_conflict: ConflictPolicy::Ask,
            create_missing: false,
            assume_yes: false,
        }
    }
}

/// Answers from command-line flags where given, otherwise from `fallback`.
pub struct FlagPrompter<P: Prompter> {
    flags: PromptOptions,
    fallback: P,
}

impl<P: Prompter> FlagPrompter<P> {
    pub fn new(flags: PromptOptions, fallback: P) -> Self {
        Self { flags, fallback }
    }
}

pub fn terminal_prompter(
    flags: PromptOptions,
) -> FlagPrompter<TerminalPrompter<impl BufRead, impl Write>> {
    FlagPrompter::new(flags, TerminalPrompter::new(io::stdin().lock(), io::stderr()))
}

impl<P: Prompter> Prompter for FlagPrompter<P> {
    fn confirm(&mut self, kind: OperationKind, subject: &str) -> Result<bool> {
        if self.flags.assume_yes {
            return Ok(true);
        }
        self.fallback.confirm(kind, subject)
    }

    fn resolve_conflict(&mut self, destination: &str) -> Result<ConflictChoice> {
        match self.flags.on_conflict {
            ConflictPolicy::Ask => self.fallback.resolve_conflict(destination),
            ConflictPolicy::Replace => Ok(ConflictChoice::Replace),
            ConflictPolicy::KeepBoth => Ok(ConflictChoice::KeepBoth),
            ConflictPolicy::Cancel => Ok(ConflictChoice::Cancel),
        }
    }

    fn resolve_missing_path(&mut self, target: &str) -> Result<MissingPathChoice> {
        if self.flags.create_missing {
            return Ok(MissingPathChoice::Create);
        }
        self.fallback.resolve_missing_path(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(
        flags: PromptOptions,
        input: &'static str,
    ) -> FlagPrompter<TerminalPrompter<Cursor<&'static str>, Vec<u8>>> {
        FlagPrompter::new(flags, TerminalPrompter::new(Cursor::new(input), Vec::new()))
    }

    #[test]
    fn flags_answer_without_touching_the_terminal() {
        let flags = PromptOptions {
            on_conflict: ConflictPolicy::KeepBoth,
            create_missing: true,
            assume_yes: true,
        };
        let mut p = prompter(flags, "");
        assert!(p.confirm(OperationKind::Archive, "a.md").expect("confirm"));
        assert_eq!(p.resolve_conflict("x").expect("conflict"), ConflictChoice::KeepBoth);
        assert_eq!(
            p.resolve_missing_path("x").expect("missing"),
            MissingPathChoice::Create
        );
    }

    #[test]
    fn ask_defers_to_terminal_answers() {
        let mut p = prompter(PromptOptions::default(), "y\nr\nn\n");
        assert!(p.confirm(OperationKind::Unarchive, "a.md").expect("confirm"));
        assert_eq!(p.resolve_conflict("x").expect("conflict"), ConflictChoice::Replace);
        assert_eq!(
            p.resolve_missing_path("x").expect("missing"),
            MissingPathChoice::Cancel
        );
    }

    #[test]
    fn report_merge_keeps_failure() {
        let mut a = CommandReport::new("a");
        a.detail("one");
        let mut b = CommandReport::new("b");
        b.issue("bad");
        a.merge(b);
        assert!(!a.ok);
        assert_eq!(a.details, vec!["one"]);
        assert_eq!(a.issues, vec!["bad"]);
    }
}
