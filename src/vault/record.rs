//! Provenance records: where an archived unit came from and when it moved.
//!
//! Documents carry the record in their own header block, folders in an
//! index document inside them, and any other file in a sidecar document
//! next to it.

use crate::vault::frontmatter::{
    HeaderEdit, field_flag, field_str, field_text, mutate_header_fields, read_header_fields,
};
use crate::vault::resolver::join;
use crate::vault::store::{Entry, Store, UnitKind};
use anyhow::{Context, Result};
use serde::Serialize;
use serde_yaml::Mapping;

pub const ARCHIVED_FIELD: &str = "archived";
pub const ARCHIVED_FROM_FIELD: &str = "archived_from";
pub const INDEX_MARKER_FIELD: &str = "is_archive_index";
pub const SIDECAR_MARKER_FIELD: &str = "is_archive_sidecar";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveRecord {
    pub archived_at: Option<String>,
    pub archived_from: String,
}

impl ArchiveRecord {
    pub fn new(archived_from: impl Into<String>, archived_at: impl Into<String>) -> Self {
        Self {
            archived_at: Some(archived_at.into()),
            archived_from: archived_from.into(),
        }
    }

    /// Record carried by a header mapping; requires `archived_from`.
    pub fn from_fields(fields: &Mapping) -> Option<Self> {
        let archived_from = field_str(fields, ARCHIVED_FROM_FIELD)?;
        if archived_from.trim().is_empty() {
            return None;
        }
        Some(Self {
            archived_at: field_text(fields, ARCHIVED_FIELD),
            archived_from: archived_from.to_string(),
        })
    }
}

/// Options that shape how records are written.
#[derive(Debug, Clone)]
pub struct CodecOptions {
    pub carrier_file_name: String,
    pub record_contents: bool,
}

pub fn sidecar_path(owner_path: &str, carrier_file_name: &str) -> String {
    format!("{owner_path}.{carrier_file_name}")
}

pub fn index_path(dir_path: &str, carrier_file_name: &str) -> String {
    join(dir_path, carrier_file_name)
}

/// Path of the document holding `unit`'s record.
pub fn carrier_path(unit: &Entry, carrier_file_name: &str) -> String {
    match unit.unit_kind() {
        UnitKind::Document => unit.path.clone(),
        UnitKind::Directory => index_path(&unit.path, carrier_file_name),
        UnitKind::OpaqueFile => sidecar_path(&unit.path, carrier_file_name),
    }
}

/// `name` is a carrier file or a sidecar under the configured carrier name.
pub fn is_carrier_name(name: &str, carrier_file_name: &str) -> bool {
    name == carrier_file_name || name.ends_with(&format!(".{carrier_file_name}"))
}

pub fn read_fields<S: Store + ?Sized>(store: &S, path: &str) -> Result<Option<Mapping>> {
    let Some(doc) = store.resolve(path) else {
        return Ok(None);
    };
    if doc.is_dir() {
        return Ok(None);
    }
    read_header_fields(store, &doc)
}

pub fn read_record<S: Store + ?Sized>(
    store: &S,
    unit: &Entry,
    carrier_file_name: &str,
) -> Result<Option<ArchiveRecord>> {
    let fields = read_fields(store, &carrier_path(unit, carrier_file_name))?;
    Ok(fields.as_ref().and_then(ArchiveRecord::from_fields))
}

fn contents_listing<S: Store + ?Sized>(
    store: &S,
    dir: &Entry,
    carrier_file_name: &str,
    depth: usize,
    out: &mut String,
) -> Result<()> {
    for child in store.list_children(dir)? {
        if depth == 0 && child.name() == carrier_file_name {
            continue;
        }
        out.push_str(&"  ".repeat(depth));
        out.push_str("- ");
        out.push_str(child.name());
        if child.is_dir() {
            out.push_str("/\n");
            contents_listing(store, &child, carrier_file_name, depth + 1, out)?;
        } else {
            out.push('\n');
        }
    }
    Ok(())
}

fn render_sidecar(unit: &Entry, record: &ArchiveRecord) -> Result<String> {
    let mut header = HeaderEdit::new();
    if let Some(at) = &record.archived_at {
        header.set(ARCHIVED_FIELD, at.as_str())?;
    }
    header.set(ARCHIVED_FROM_FIELD, record.archived_from.as_str())?;
    header.set(SIDECAR_MARKER_FIELD, true)?;
    let body = format!(
        "\n# {}\n\nArchived from `{}`.\n",
        unit.name(),
        record.archived_from
    );
    Ok(header.compose(&body))
}

fn render_index<S: Store + ?Sized>(
    store: &S,
    unit: &Entry,
    record: &ArchiveRecord,
    opts: &CodecOptions,
) -> Result<String> {
    let mut header = HeaderEdit::new();
    if let Some(at) = &record.archived_at {
        header.set(ARCHIVED_FIELD, at.as_str())?;
    }
    header.set(ARCHIVED_FROM_FIELD, record.archived_from.as_str())?;
    header.set(INDEX_MARKER_FIELD, true)?;

    let mut body = format!(
        "\n# {}\n\nArchived from `{}`.\n",
        unit.name(),
        record.archived_from
    );
    if opts.record_contents {
        let mut listing = String::new();
        contents_listing(store, unit, &opts.carrier_file_name, 0, &mut listing)?;
        body.push_str("\n## Contents\n\n");
        if listing.is_empty() {
            body.push_str("_empty folder_\n");
        } else {
            body.push_str(&listing);
        }
    }
    Ok(header.compose(&body))
}

pub fn write_record<S: Store + ?Sized>(
    store: &S,
    unit: &Entry,
    record: &ArchiveRecord,
    opts: &CodecOptions,
) -> Result<()> {
    match unit.unit_kind() {
        UnitKind::Document => mutate_header_fields(store, unit, |header| {
            if let Some(at) = &record.archived_at {
                header.set(ARCHIVED_FIELD, at.as_str())?;
            }
            header.set(ARCHIVED_FROM_FIELD, record.archived_from.as_str())
        })
        .with_context(|| format!("failed to write archive record into {}", unit.path)),
        UnitKind::Directory => {
            let content = render_index(store, unit, record, opts)?;
            let path = index_path(&unit.path, &opts.carrier_file_name);
            store
                .create_document(&path, &content)
                .with_context(|| format!("failed to create archive index {path}"))?;
            Ok(())
        }
        UnitKind::OpaqueFile => {
            let content = render_sidecar(unit, record)?;
            let path = sidecar_path(&unit.path, &opts.carrier_file_name);
            store
                .create_document(&path, &content)
                .with_context(|| format!("failed to create archive sidecar {path}"))?;
            Ok(())
        }
    }
}

pub fn clear_record<S: Store + ?Sized>(
    store: &S,
    unit: &Entry,
    carrier_file_name: &str,
) -> Result<()> {
    match unit.unit_kind() {
        UnitKind::Document => mutate_header_fields(store, unit, |header| {
            header.remove(ARCHIVED_FIELD);
            header.remove(ARCHIVED_FROM_FIELD);
            Ok(())
        })
        .with_context(|| format!("failed to clear archive record from {}", unit.path)),
        UnitKind::Directory | UnitKind::OpaqueFile => {
            let path = carrier_path(unit, carrier_file_name);
            match store.resolve(&path) {
                Some(doc) => store.delete(&doc),
                None => Ok(()),
            }
        }
    }
}

/// Header markers of a carrier document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Markers {
    pub index: bool,
    pub sidecar: bool,
}

pub fn markers(fields: &Mapping) -> Markers {
    Markers {
        index: field_flag(fields, INDEX_MARKER_FIELD),
        sidecar: field_flag(fields, SIDECAR_MARKER_FIELD),
    }
}
