//! Renaming every index and sidecar file when the carrier name changes.

use crate::logging::{self, WarnEvent};
use crate::vault::enumerate::find_carrier_files;
use crate::vault::record::sidecar_path;
use crate::vault::resolver::{join, parent_of};
use crate::vault::store::{Entry, Store};
use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedRename {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenameSummary {
    pub renamed: usize,
    pub failed: usize,
}

/// Path `carrier` would take under `new_name`: an index keeps its folder, a
/// sidecar keeps its owner prefix.
fn prospective_path(carrier: &Entry, old_name: &str, new_name: &str) -> Option<String> {
    if carrier.name() == old_name {
        return Some(join(parent_of(&carrier.path), new_name));
    }
    let owner = carrier.path.strip_suffix(&format!(".{old_name}"))?;
    Some(sidecar_path(owner, new_name))
}

pub fn plan_renames<S: Store + ?Sized>(
    store: &S,
    archive_root: &str,
    old_name: &str,
    new_name: &str,
) -> Result<Vec<PlannedRename>> {
    let carriers = find_carrier_files(store, archive_root, old_name)?;
    Ok(carriers
        .iter()
        .filter_map(|carrier| {
            let to = prospective_path(carrier, old_name, new_name)?;
            (to != carrier.path).then(|| PlannedRename {
                from: carrier.path.clone(),
                to,
            })
        })
        .collect())
}

/// Destinations already held by some other entry.
pub fn check_rename_conflicts<S: Store + ?Sized>(
    store: &S,
    archive_root: &str,
    old_name: &str,
    new_name: &str,
) -> Result<Vec<String>> {
    Ok(plan_renames(store, archive_root, old_name, new_name)?
        .into_iter()
        .filter(|plan| store.exists(&plan.to))
        .map(|plan| plan.to)
        .collect())
}

/// Rename carriers one at a time. Failures are reported and skipped; callers
/// are expected to run [`check_rename_conflicts`] first.
pub fn rename_all<S: Store + ?Sized>(
    store: &S,
    archive_root: &str,
    old_name: &str,
    new_name: &str,
) -> Result<RenameSummary> {
    let mut summary = RenameSummary::default();
    for plan in plan_renames(store, archive_root, old_name, new_name)? {
        let result = match store.resolve(&plan.from) {
            Some(entry) => store.move_entry(&entry, &plan.to),
            None => Err(anyhow::anyhow!("{} vanished before rename", plan.from)),
        };
        match result {
            Ok(()) => summary.renamed += 1,
            Err(err) => {
                summary.failed += 1;
                logging::emit(WarnEvent {
                    code: "CARRIER_RENAME_FAILED",
                    stage: "carrier",
                    action: "rename",
                    subject: &plan.from,
                    target: &plan.to,
                    reason: "skipped",
                    err: &format!("{err:#}"),
                });
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::store::FsStore;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn vault() -> (TempDir, FsStore) {
        let tmp = tempdir().expect("tempdir");
        let files = [
            (
                "Archive/Y/_archive.md",
                "---\narchived_from: Projects/Y\nis_archive_index: true\n---\n",
            ),
            ("Archive/Y/a.md", "a"),
            ("Archive/img.png", "png"),
            (
                "Archive/img.png._archive.md",
                "---\narchived_from: Media/img.png\nis_archive_sidecar: true\n---\n",
            ),
        ];
        for (path, content) in files {
            let abs = tmp.path().join(path);
            fs::create_dir_all(abs.parent().expect("parent")).expect("mkdir");
            fs::write(abs, content).expect("write");
        }
        let store = FsStore::new(tmp.path());
        (tmp, store)
    }

    #[test]
    fn prospective_paths_swap_suffix_or_file_name() {
        let index = Entry::file("Archive/Y/_archive.md");
        let sidecar = Entry::file("Archive/img.png._archive.md");
        assert_eq!(
            prospective_path(&index, "_archive.md", "_meta.md").as_deref(),
            Some("Archive/Y/_meta.md")
        );
        assert_eq!(
            prospective_path(&sidecar, "_archive.md", "_meta.md").as_deref(),
            Some("Archive/img.png._meta.md")
        );
    }

    #[test]
    fn conflicts_name_occupied_destinations() {
        let (tmp, store) = vault();
        fs::write(tmp.path().join("Archive/Y/_meta.md"), "user file").expect("write");

        let conflicts = check_rename_conflicts(&store, "Archive", "_archive.md", "_meta.md")
            .expect("check");
        assert_eq!(conflicts, vec!["Archive/Y/_meta.md"]);
        assert!(
            check_rename_conflicts(&store, "Archive", "_archive.md", "_other.md")
                .expect("check")
                .is_empty()
        );
    }

    #[test]
    fn rename_all_moves_every_carrier() {
        let (tmp, store) = vault();
        let summary = rename_all(&store, "Archive", "_archive.md", "_meta.md").expect("rename");
        assert_eq!(summary, RenameSummary { renamed: 2, failed: 0 });
        assert!(tmp.path().join("Archive/Y/_meta.md").exists());
        assert!(tmp.path().join("Archive/img.png._meta.md").exists());
        assert!(!tmp.path().join("Archive/Y/_archive.md").exists());
    }

    #[test]
    fn rename_all_skips_failures_and_continues() {
        let (tmp, store) = vault();
        fs::write(tmp.path().join("Archive/Y/_meta.md"), "user file").expect("write");

        let summary = rename_all(&store, "Archive", "_archive.md", "_meta.md").expect("rename");
        assert_eq!(summary, RenameSummary { renamed: 1, failed: 1 });
        assert_eq!(
            fs::read_to_string(tmp.path().join("Archive/Y/_meta.md")).expect("read"),
            "user file"
        );
        assert!(tmp.path().join("Archive/img.png._meta.md").exists());
    }
}
