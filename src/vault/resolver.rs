//! Pure path arithmetic over slash-delimited vault paths. The only store
//! access is existence probing.

use crate::vault::store::{Entry, Store};
use anyhow::Result;

pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Parent segment of `path`; empty for top-level entries.
pub fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

pub fn name_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Trim whitespace and surrounding slashes, collapse empty segments.
/// Parent references are rejected rather than resolved.
pub fn normalize(input: &str) -> Result<String> {
    let mut segments = Vec::new();
    for segment in input.trim().split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => anyhow::bail!("path may not contain `..`: {input}"),
            other => segments.push(other),
        }
    }
    Ok(segments.join("/"))
}

/// `path` is `root` itself or lies underneath it.
pub fn is_within(path: &str, root: &str) -> bool {
    path == root || path.starts_with(&format!("{root}/"))
}

pub fn destination_for(unit: &Entry, archive_root: &str) -> String {
    join(archive_root, unit.name())
}

/// Split into `(base, extension)`; the extension keeps its dot and only
/// exists when the last `.` sits after the last `/`. A leading dot names a
/// dotfile, not an extension.
pub fn split_extension(path: &str) -> (&str, &str) {
    let name_start = path.rfind('/').map_or(0, |s| s + 1);
    match path.rfind('.') {
        Some(dot) if dot > name_start => (&path[..dot], &path[dot..]),
        _ => (path, ""),
    }
}

/// First `"{base} {n}{ext}"` for `n >= 2` that the store does not hold.
pub fn unique_alternative<S: Store + ?Sized>(store: &S, path: &str) -> String {
    let (base, ext) = split_extension(path);
    let mut n: u64 = 2;
    loop {
        let candidate = format!("{base} {n}{ext}");
        if !store.exists(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

pub fn missing_ancestor<S: Store + ?Sized>(store: &S, path: &str) -> bool {
    let parent = parent_of(path);
    !parent.is_empty() && !store.exists(parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::store::FsStore;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn unique_alternative_skips_taken_numbers() {
        let tmp = tempdir().expect("tempdir");
        fs::create_dir_all(tmp.path().join("A")).expect("mkdir");
        fs::write(tmp.path().join("A/B.md"), "").expect("write");
        fs::write(tmp.path().join("A/B 2.md"), "").expect("write");
        let store = FsStore::new(tmp.path());

        assert_eq!(unique_alternative(&store, "A/B.md"), "A/B 3.md");
    }

    #[test]
    fn unique_alternative_does_not_split_folder_names() {
        let tmp = tempdir().expect("tempdir");
        fs::create_dir_all(tmp.path().join("A/My Folder")).expect("mkdir");
        fs::create_dir_all(tmp.path().join("v1.2")).expect("mkdir");
        let store = FsStore::new(tmp.path());

        assert_eq!(unique_alternative(&store, "A/My Folder"), "A/My Folder 2");
        assert_eq!(split_extension("v1.2/notes"), ("v1.2/notes", ""));
        assert_eq!(split_extension("a/.hidden"), ("a/.hidden", ""));
        assert_eq!(split_extension("a/b.tar.gz"), ("a/b.tar", ".gz"));
    }

    #[test]
    fn missing_ancestor_checks_parent_only() {
        let tmp = tempdir().expect("tempdir");
        fs::create_dir_all(tmp.path().join("Projects")).expect("mkdir");
        let store = FsStore::new(tmp.path());

        assert!(!missing_ancestor(&store, "top.md"));
        assert!(!missing_ancestor(&store, "Projects/x.md"));
        assert!(missing_ancestor(&store, "Projects/X/x.md"));
    }

    #[test]
    fn containment_is_segment_aware() {
        assert!(is_within("Archive", "Archive"));
        assert!(is_within("Archive/a.md", "Archive"));
        assert!(!is_within("Archived/a.md", "Archive"));
    }

    #[test]
    fn normalize_trims_and_rejects_parent_refs() {
        assert_eq!(normalize(" /Projects//X/ ").expect("norm"), "Projects/X");
        assert_eq!(normalize("./a/./b").expect("norm"), "a/b");
        assert!(normalize("a/../b").is_err());
    }

    #[test]
    fn destination_uses_unit_name() {
        let unit = Entry::file("Projects/X/notes.md");
        assert_eq!(destination_for(&unit, "Archive"), "Archive/notes.md");
    }
}
