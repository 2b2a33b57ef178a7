use crate::logging::{self, WarnEvent};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

const MARKDOWN_SUFFIX: &str = ".md";

/// Map a link target naming `old` (or something inside it, for folders) to
/// the equivalent target under `new`.
fn map_target(target: &str, old: &str, new: &str, is_dir: bool) -> Option<String> {
    let trimmed = target.trim();
    if is_dir {
        let rest = trimmed.strip_prefix(old)?.strip_prefix('/')?;
        return Some(format!("{new}/{rest}"));
    }
    if trimmed == old {
        return Some(new.to_string());
    }
    let old_stem = old.strip_suffix(MARKDOWN_SUFFIX)?;
    if trimmed == old_stem {
        return Some(new.strip_suffix(MARKDOWN_SUFFIX).unwrap_or(new).to_string());
    }
    None
}

fn rewrite_wiki_links(content: &str, old: &str, new: &str, is_dir: bool) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(start) = rest.find("[[") {
        out.push_str(&rest[..start + 2]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("]]") else {
            rest = after;
            break;
        };
        let inner = &after[..end];
        let split = inner.find(['|', '#']).unwrap_or(inner.len());
        let (target, suffix) = inner.split_at(split);
        match map_target(target, old, new, is_dir) {
            Some(mapped) => out.push_str(&mapped),
            None => out.push_str(target),
        }
        out.push_str(suffix);
        out.push_str("]]");
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

fn rewrite_inline_links(content: &str, old: &str, new: &str, is_dir: bool) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(start) = rest.find("](") {
        out.push_str(&rest[..start + 2]);
        let after = &rest[start + 2..];
        let Some(end) = after.find(')') else {
            rest = after;
            break;
        };
        let raw = &after[..end];
        let split = raw.find('#').unwrap_or(raw.len());
        let (target, suffix) = raw.split_at(split);
        let mapped = if target.contains("://") {
            None
        } else {
            map_target(&target.replace("%20", " "), old, new, is_dir)
        };
        match mapped {
            Some(mapped) => out.push_str(&mapped.replace(' ', "%20")),
            None => out.push_str(target),
        }
        out.push_str(suffix);
        out.push(')');
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

/// Rewrite every link in `content` that names `old`. Returns `None` when
/// nothing changed.
pub fn rewrite_links(content: &str, old: &str, new: &str, is_dir: bool) -> Option<String> {
    let needle = old.strip_suffix(MARKDOWN_SUFFIX).unwrap_or(old);
    if !content.contains(needle) && !content.contains(&needle.replace(' ', "%20")) {
        return None;
    }
    let rewritten = rewrite_inline_links(&rewrite_wiki_links(content, old, new, is_dir), old, new, is_dir);
    (rewritten != content).then_some(rewritten)
}

/// Apply [`rewrite_links`] to every markdown file in the vault, skipping
/// dot-folders. Files that cannot be walked, read or written are reported and
/// skipped. Returns the number of files rewritten.
pub fn rewrite_vault_links(root: &Path, old: &str, new: &str, is_dir: bool) -> usize {
    let mut rewritten = 0usize;
    let walker = WalkDir::new(root).follow_links(false).into_iter().filter_entry(|e| {
        e.depth() == 0 || !e.file_name().to_str().is_some_and(|name| name.starts_with('.'))
    });
    for item in walker {
        let item = match item {
            Ok(item) => item,
            Err(err) => {
                let subject = err.path().map(|p| p.display().to_string()).unwrap_or_default();
                skip_file("walk", &subject, old, &err.to_string());
                continue;
            }
        };
        let path = item.path();
        if !item.file_type().is_file()
            || path.extension().and_then(|e| e.to_str()) != Some("md")
        {
            continue;
        }
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                skip_file("read", &path.display().to_string(), old, &err.to_string());
                continue;
            }
        };
        if let Some(updated) = rewrite_links(&content, old, new, is_dir) {
            match fs::write(path, updated) {
                Ok(()) => rewritten += 1,
                Err(err) => skip_file("write", &path.display().to_string(), old, &err.to_string()),
            }
        }
    }
    rewritten
}

fn skip_file(action: &str, subject: &str, target: &str, err: &str) {
    logging::emit(WarnEvent {
        code: "LINK_REWRITE_SKIPPED",
        stage: "links",
        action,
        subject,
        target,
        reason: "skipped",
        err,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn wiki_links_keep_alias_heading_and_extension_style() {
        let body = "see [[Projects/X/notes]] and [[Projects/X/notes.md|alias]] or [[Projects/X/notes#Top]]";
        let got = rewrite_links(body, "Projects/X/notes.md", "Archive/notes.md", false).expect("changed");
        assert_eq!(
            got,
            "see [[Archive/notes]] and [[Archive/notes.md|alias]] or [[Archive/notes#Top]]"
        );
    }

    #[test]
    fn folder_moves_rewrite_children_only() {
        let body = "[[Projects/Y/a]] [[Projects/Yonder/a]] [b](Projects/Y/b.md)";
        let got = rewrite_links(body, "Projects/Y", "Archive/Y", true).expect("changed");
        assert_eq!(got, "[[Archive/Y/a]] [[Projects/Yonder/a]] [b](Archive/Y/b.md)");
    }

    #[test]
    fn inline_links_round_trip_percent_encoding() {
        let body = "[n](My%20Notes/plan.md#goals) [web](https://example.com/My Notes/plan.md)";
        let got = rewrite_links(body, "My Notes/plan.md", "Archive/plan v2.md", false).expect("changed");
        assert_eq!(
            got,
            "[n](Archive/plan%20v2.md#goals) [web](https://example.com/My Notes/plan.md)"
        );
    }

    #[test]
    fn unrelated_content_is_untouched() {
        assert!(rewrite_links("[[Other]] text", "Projects/X/notes.md", "Archive/notes.md", false).is_none());
        assert!(rewrite_links("[[broken", "broken", "fixed", false).is_none());
    }

    #[test]
    fn vault_walk_skips_dot_folders() {
        let tmp = tempdir().expect("tempdir");
        fs::create_dir_all(tmp.path().join(".varc")).expect("mkdir");
        fs::write(tmp.path().join("index.md"), "[[a]]").expect("write");
        fs::write(tmp.path().join(".varc/log.md"), "[[a]]").expect("write");

        let count = rewrite_vault_links(tmp.path(), "a.md", "Archive/a.md", false);
        assert_eq!(count, 1);
        assert_eq!(
            fs::read_to_string(tmp.path().join("index.md")).expect("read"),
            "[[Archive/a]]"
        );
        assert_eq!(
            fs::read_to_string(tmp.path().join(".varc/log.md")).expect("read"),
            "[[a]]"
        );
    }

    #[test]
    fn unreadable_notes_do_not_stop_the_walk() {
        let tmp = tempdir().expect("tempdir");
        fs::create_dir_all(tmp.path().join("notes")).expect("mkdir");
        for i in 0..20 {
            fs::write(tmp.path().join(format!("notes/n{i:02}.md")), "see [[Projects/a]]")
                .expect("write");
        }
        fs::write(tmp.path().join("notes/bad.md"), [0xff, 0xfe, 0x00]).expect("write bad");

        let count = rewrite_vault_links(tmp.path(), "Projects/a.md", "Archive/a.md", false);
        assert_eq!(count, 20);
        for i in 0..20 {
            let body = fs::read_to_string(tmp.path().join(format!("notes/n{i:02}.md"))).expect("read");
            assert_eq!(body, "see [[Archive/a]]");
        }
        assert_eq!(
            fs::read(tmp.path().join("notes/bad.md")).expect("read bad"),
            vec![0xff, 0xfe, 0x00]
        );
    }
}
