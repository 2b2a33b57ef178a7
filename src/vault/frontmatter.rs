//! Header-block ("frontmatter") access for markdown documents.
//!
//! Reads go through `serde_yaml`. Writes edit the raw header lines so fields
//! the caller does not touch keep their exact text, comments included.

use crate::logging::{self, WarnEvent};
use crate::vault::store::{Entry, Store};
use anyhow::{Context, Result};
use serde_yaml::{Mapping, Value};

const DELIMITER: &str = "---";

#[derive(Debug, Clone, PartialEq, Eq)]
struct SplitDocument<'a> {
    header: Option<Vec<&'a str>>,
    body: &'a str,
}

fn split_document(content: &str) -> SplitDocument<'_> {
    let no_header = SplitDocument {
        header: None,
        body: content,
    };
    let mut offset = 0usize;
    let mut lines = content.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return no_header;
    };
    if first.trim_end() != DELIMITER {
        return no_header;
    }
    offset += first.len();

    let mut header = Vec::new();
    for line in lines {
        offset += line.len();
        let bare = line.trim_end_matches(['\n', '\r']);
        if bare.trim_end() == DELIMITER {
            return SplitDocument {
                header: Some(header),
                body: &content[offset..],
            };
        }
        header.push(bare);
    }
    no_header
}

fn parse_header(lines: &[impl AsRef<str>]) -> Result<Mapping> {
    let raw = lines
        .iter()
        .map(|line| -> &str { line.as_ref() })
        .collect::<Vec<_>>()
        .join("\n");
    if raw.trim().is_empty() {
        return Ok(Mapping::new());
    }
    match serde_yaml::from_str::<Value>(&raw).context("header block is not valid YAML")? {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        _ => anyhow::bail!("header block is not a key/value mapping"),
    }
}

/// Line-level editor over a header block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderEdit {
    lines: Vec<String>,
}

fn is_continuation(line: &str) -> bool {
    line.starts_with([' ', '\t']) || line.starts_with("- ") || line == "-"
}

impl HeaderEdit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Line range of `key`, matching its bare, single- and double-quoted
    /// spellings.
    fn key_span(&self, key: &str) -> Option<(usize, usize)> {
        let prefixes = [format!("{key}:"), format!("'{key}':"), format!("\"{key}\":")];
        let start = self.lines.iter().position(|line| {
            prefixes.iter().any(|prefix| {
                line.strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t']))
            })
        })?;
        let mut end = start + 1;
        while end < self.lines.len() && is_continuation(&self.lines[end]) {
            end += 1;
        }
        Some((start, end))
    }

    /// Replace `key` in place, or append it when absent.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let rendered = serde_yaml::to_string(&value)
            .with_context(|| format!("failed to render header field {key}"))?;
        let new_lines = format!("{key}: {}", rendered.trim_end())
            .split('\n')
            .map(ToOwned::to_owned)
            .collect::<Vec<_>>();

        match self.key_span(key) {
            Some((start, end)) => {
                self.lines.splice(start..end, new_lines);
            }
            None => self.lines.extend(new_lines),
        }
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let Some((start, end)) = self.key_span(key) else {
            return false;
        };
        self.lines.drain(start..end);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|line| line.trim().is_empty())
    }

    /// Render a full document: header block (omitted when empty) then body.
    pub fn compose(&self, body: &str) -> String {
        if self.is_empty() {
            return body.to_string();
        }
        let mut out = String::new();
        out.push_str(DELIMITER);
        out.push('\n');
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(DELIMITER);
        out.push('\n');
        out.push_str(body);
        out
    }
}

/// Header fields of `entry`. `None` when the document has no header block;
/// an unparseable block reads as empty.
pub fn read_header_fields<S: Store + ?Sized>(store: &S, entry: &Entry) -> Result<Option<Mapping>> {
    let content = store.read_document(entry)?;
    let split = split_document(&content);
    let Some(header) = split.header else {
        return Ok(None);
    };
    match parse_header(&header) {
        Ok(map) => Ok(Some(map)),
        Err(err) => {
            logging::emit(WarnEvent {
                code: "HEADER_PARSE_FAILED",
                stage: "frontmatter",
                action: "read",
                subject: &entry.path,
                target: "",
                reason: "treated-as-empty",
                err: &format!("{err:#}"),
            });
            Ok(Some(Mapping::new()))
        }
    }
}

/// Whether [`mutate_header_fields`] would accept `entry`: no header block,
/// or one that parses.
pub fn header_is_editable<S: Store + ?Sized>(store: &S, entry: &Entry) -> Result<bool> {
    let content = store.read_document(entry)?;
    Ok(split_document(&content)
        .header
        .is_none_or(|header| parse_header(&header).is_ok()))
}

/// Apply `mutator` to the header block of `entry` and write the result back.
/// A header that does not parse is left alone and reported as an error.
pub fn mutate_header_fields<S, F>(store: &S, entry: &Entry, mutator: F) -> Result<()>
where
    S: Store + ?Sized,
    F: FnOnce(&mut HeaderEdit) -> Result<()>,
{
    let content = store.read_document(entry)?;
    let split = split_document(&content);
    let mut edit = HeaderEdit::new();
    if let Some(header) = &split.header {
        parse_header(header).with_context(|| {
            format!("refusing to rewrite unparseable header block in {}", entry.path)
        })?;
        edit.lines = header.iter().map(|line| (*line).to_string()).collect();
    }
    let before = edit.clone();
    mutator(&mut edit)?;
    if edit == before {
        return Ok(());
    }
    store.write_document(entry, &edit.compose(split.body))
}

pub fn field_str<'a>(map: &'a Mapping, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str)
}

/// Scalar rendered as text; timestamps written by other tools may arrive as
/// numbers.
pub fn field_text(map: &Mapping, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn field_flag(map: &Mapping, key: &str) -> bool {
    map.get(key).and_then(Value::as_bool).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::store::FsStore;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn split_finds_header_and_body() {
        let doc = split_document("---\ntitle: x\n---\nbody\n");
        assert_eq!(doc.header, Some(vec!["title: x"]));
        assert_eq!(doc.body, "body\n");

        let crlf = split_document("---\r\na: 1\r\n---\r\nrest");
        assert_eq!(crlf.header, Some(vec!["a: 1"]));
        assert_eq!(crlf.body, "rest");
    }

    #[test]
    fn unterminated_or_absent_header_is_body() {
        assert_eq!(split_document("---\ntitle: x\n").header, None);
        assert_eq!(split_document("# heading\n---\n").header, None);
        assert_eq!(split_document("").header, None);
    }

    #[test]
    fn set_and_remove_preserve_neighbours_verbatim() {
        let mut edit = HeaderEdit {
            lines: vec![
                "title: 'Quoted'  # comment".to_string(),
                "tags:".to_string(),
                "  - a".to_string(),
                "- b".to_string(),
                "aliases: [x]".to_string(),
            ],
        };
        edit.set("archived_from", "Projects/X/notes.md").expect("set");
        edit.set("tags", "replaced").expect("set");
        assert_eq!(
            edit.lines,
            vec![
                "title: 'Quoted'  # comment",
                "tags: replaced",
                "aliases: [x]",
                "archived_from: Projects/X/notes.md",
            ]
        );
        assert!(edit.remove("archived_from"));
        assert!(!edit.remove("archived_from"));
        assert_eq!(edit.lines.len(), 3);
    }

    #[test]
    fn key_match_requires_exact_key() {
        let mut edit = HeaderEdit {
            lines: vec!["archived_from: a".to_string()],
        };
        assert!(!edit.remove("archived"));
        assert_eq!(edit.lines.len(), 1);
    }

    #[test]
    fn quoted_keys_are_replaced_in_place() {
        let mut edit = HeaderEdit {
            lines: vec![
                "\"archived_from\": Old/a.md".to_string(),
                "'archived': 2020-01-01".to_string(),
            ],
        };
        edit.set("archived_from", "Projects/a.md").expect("set");
        edit.set("archived", "2024-05-01T10:00:00").expect("set");
        assert_eq!(edit.lines.len(), 2);
        assert_eq!(edit.lines[0], "archived_from: Projects/a.md");
        let fields = parse_header(&edit.lines).expect("parses without duplicates");
        assert_eq!(field_str(&fields, "archived_from"), Some("Projects/a.md"));

        assert!(edit.remove("archived"));
        assert_eq!(edit.lines, vec!["archived_from: Projects/a.md"]);
    }

    #[test]
    fn read_returns_none_without_header_and_empty_for_garbage() {
        let tmp = tempdir().expect("tempdir");
        fs::write(tmp.path().join("plain.md"), "just text\n").expect("write");
        fs::write(tmp.path().join("bad.md"), "---\n: : [\n---\nbody").expect("write");
        fs::write(tmp.path().join("list.md"), "---\n- a\n---\nbody").expect("write");
        let store = FsStore::new(tmp.path());

        let plain = store.resolve("plain.md").expect("plain");
        assert!(read_header_fields(&store, &plain).expect("read").is_none());

        let bad = store.resolve("bad.md").expect("bad");
        let fields = read_header_fields(&store, &bad).expect("read").expect("some");
        assert!(fields.is_empty());

        let list = store.resolve("list.md").expect("list");
        let fields = read_header_fields(&store, &list).expect("read").expect("some");
        assert!(fields.is_empty());
    }

    #[test]
    fn mutate_adds_header_and_removing_everything_restores_original() {
        let tmp = tempdir().expect("tempdir");
        let original = "# Notes\n\nbody text\n";
        fs::write(tmp.path().join("n.md"), original).expect("write");
        let store = FsStore::new(tmp.path());
        let entry = store.resolve("n.md").expect("entry");

        mutate_header_fields(&store, &entry, |h| h.set("archived_from", "Projects/n.md"))
            .expect("add");
        let added = fs::read_to_string(tmp.path().join("n.md")).expect("read");
        assert_eq!(added, "---\narchived_from: Projects/n.md\n---\n# Notes\n\nbody text\n");

        mutate_header_fields(&store, &entry, |h| {
            h.remove("archived_from");
            Ok(())
        })
        .expect("remove");
        let restored = fs::read_to_string(tmp.path().join("n.md")).expect("read");
        assert_eq!(restored, original);
    }

    #[test]
    fn mutate_refuses_unparseable_header() {
        let tmp = tempdir().expect("tempdir");
        let content = "---\n: : [\n---\nbody";
        fs::write(tmp.path().join("bad.md"), content).expect("write");
        let store = FsStore::new(tmp.path());
        let entry = store.resolve("bad.md").expect("entry");

        let err = mutate_header_fields(&store, &entry, |h| h.set("archived", "now"))
            .expect_err("refused");
        assert!(format!("{err:#}").contains("unparseable"));
        assert!(!header_is_editable(&store, &entry).expect("check"));
        assert_eq!(fs::read_to_string(tmp.path().join("bad.md")).expect("read"), content);
    }

    #[test]
    fn field_helpers_read_typed_values() {
        let map: Mapping = serde_yaml::from_str("a: x\nb: 12\nc: true\nd: [1]").expect("yaml");
        assert_eq!(field_str(&map, "a"), Some("x"));
        assert_eq!(field_text(&map, "b").as_deref(), Some("12"));
        assert!(field_flag(&map, "c"));
        assert!(!field_flag(&map, "a"));
        assert_eq!(field_text(&map, "d"), None);
    }
}
