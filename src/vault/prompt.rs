use crate::vault::undo::OperationKind;
use anyhow::{Context, Result};
use std::io::{BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    Replace,
    KeepBoth,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPathChoice {
    Create,
    Cancel,
}

/// The points where an archive or unarchive waits on the user. Each call
/// returns one of a closed set of outcomes; cancelling aborts the operation.
pub trait Prompter {
    fn confirm(&mut self, kind: OperationKind, subject: &str) -> Result<bool>;

    fn resolve_conflict(&mut self, destination: &str) -> Result<ConflictChoice>;

    fn resolve_missing_path(&mut self, target: &str) -> Result<MissingPathChoice>;
}

/// Interactive prompts on stderr, answers read from `input`.
pub struct TerminalPrompter<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{question} ").context("failed to write prompt")?;
        self.output.flush().context("failed to flush prompt")?;
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("failed to read answer")?;
        if read == 0 {
            // EOF answers as cancel.
            return Ok(String::new());
        }
        Ok(line.trim().to_ascii_lowercase())
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn confirm(&mut self, kind: OperationKind, subject: &str) -> Result<bool> {
        let answer = self.ask(&format!("{} \"{subject}\"? [y/N]", kind.verb()))?;
        Ok(matches!(answer.as_str(), "y" | "yes"))
    }

    fn resolve_conflict(&mut self, destination: &str) -> Result<ConflictChoice> {
        loop {
            let answer = self.ask(&format!(
                "\"{destination}\" already exists. [r]eplace (old one goes to trash), [k]eep both, [c]ancel?"
            ))?;
            match answer.as_str() {
                "r" | "replace" => return Ok(ConflictChoice::Replace),
                "k" | "keep" | "keep-both" | "keep both" => return Ok(ConflictChoice::KeepBoth),
                "" | "c" | "cancel" => return Ok(ConflictChoice::Cancel),
                _ => continue,
            }
        }
    }

    fn resolve_missing_path(&mut self, target: &str) -> Result<MissingPathChoice> {
        let answer = self.ask(&format!(
            "Original folder \"{target}\" no longer exists. Recreate it? [y/N]"
        ))?;
        Ok(match answer.as_str() {
            "y" | "yes" | "create" => MissingPathChoice::Create,
            _ => MissingPathChoice::Cancel,
        })
    }
}

/// Answers fixed up front.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct ScriptedPrompter {
    pub assume_yes: bool,
    pub conflicts: std::collections::VecDeque<ConflictChoice>,
    pub on_conflict: ConflictChoice,
    pub create_missing: bool,
}

#[cfg(test)]
impl ScriptedPrompter {
    pub fn new(assume_yes: bool, on_conflict: ConflictChoice, create_missing: bool) -> Self {
        Self {
            assume_yes,
            conflicts: std::collections::VecDeque::new(),
            on_conflict,
            create_missing,
        }
    }
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, _kind: OperationKind, _subject: &str) -> Result<bool> {
        Ok(self.assume_yes)
    }

    fn resolve_conflict(&mut self, _destination: &str) -> Result<ConflictChoice> {
        Ok(self.conflicts.pop_front().unwrap_or(self.on_conflict))
    }

    fn resolve_missing_path(&mut self, _target: &str) -> Result<MissingPathChoice> {
        Ok(if self.create_missing {
            MissingPathChoice::Create
        } else {
            MissingPathChoice::Cancel
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn terminal_prompter_reprompts_until_known_answer() {
        let mut out = Vec::new();
        let mut prompter = TerminalPrompter::new(Cursor::new("what\nk\n"), &mut out);
        assert_eq!(
            prompter.resolve_conflict("Archive/a.md").expect("answer"),
            ConflictChoice::KeepBoth
        );
        let shown = String::from_utf8(out).expect("utf8");
        assert_eq!(shown.matches("already exists").count(), 2);
    }

    #[test]
    fn terminal_prompter_treats_eof_as_cancel() {
        let mut prompter = TerminalPrompter::new(Cursor::new(""), Vec::new());
        assert_eq!(
            prompter.resolve_conflict("x").expect("answer"),
            ConflictChoice::Cancel
        );
        assert!(!prompter.confirm(OperationKind::Archive, "x").expect("answer"));
        assert_eq!(
            prompter.resolve_missing_path("x").expect("answer"),
            MissingPathChoice::Cancel
        );
    }

    #[test]
    fn scripted_prompter_drains_queue_then_falls_back() {
        let mut prompter = ScriptedPrompter::new(true, ConflictChoice::Cancel, true);
        prompter.conflicts.push_back(ConflictChoice::Replace);
        assert_eq!(prompter.resolve_conflict("a").expect("a"), ConflictChoice::Replace);
        assert_eq!(prompter.resolve_conflict("b").expect("b"), ConflictChoice::Cancel);
        assert!(prompter.confirm(OperationKind::Unarchive, "a").expect("confirm"));
        assert_eq!(
            prompter.resolve_missing_path("a").expect("missing"),
            MissingPathChoice::Create
        );
    }
}
