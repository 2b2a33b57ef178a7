//! Depth-first walks of the archive subtree.

use crate::logging::{self, WarnEvent};
use crate::vault::frontmatter::read_header_fields;
use crate::vault::record::{
    ArchiveRecord, index_path, is_carrier_name, markers, read_fields, sidecar_path,
};
use crate::vault::store::{Entry, Store, UnitKind};
use anyhow::Result;
use serde::Serialize;
use serde_yaml::Mapping;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchivedUnit {
    pub unit: Entry,
    pub record: ArchiveRecord,
}

/// Header of the document at `path`; unreadable documents are reported and
/// read as absent so one bad file does not hide the rest of the archive.
fn fields_at<S: Store + ?Sized>(store: &S, path: &str) -> Option<Mapping> {
    match read_fields(store, path) {
        Ok(fields) => fields,
        Err(err) => {
            logging::emit(WarnEvent {
                code: "CARRIER_READ_FAILED",
                stage: "enumerate",
                action: "read",
                subject: path,
                target: "",
                reason: "skipped",
                err: &format!("{err:#}"),
            });
            None
        }
    }
}

/// Record carried by the index file of `dir`, if it is a valid archived folder.
fn index_record<S: Store + ?Sized>(store: &S, dir: &Entry, carrier: &str) -> Option<ArchiveRecord> {
    let fields = fields_at(store, &index_path(&dir.path, carrier))?;
    if !markers(&fields).index {
        return None;
    }
    ArchiveRecord::from_fields(&fields)
}

fn document_record<S: Store + ?Sized>(store: &S, doc: &Entry) -> Option<ArchiveRecord> {
    let fields = match read_header_fields(store, doc) {
        Ok(fields) => fields?,
        Err(err) => {
            logging::emit(WarnEvent {
                code: "DOCUMENT_READ_FAILED",
                stage: "enumerate",
                action: "read",
                subject: &doc.path,
                target: "",
                reason: "skipped",
                err: &format!("{err:#}"),
            });
            return None;
        }
    };
    let m = markers(&fields);
    if m.index || m.sidecar {
        return None;
    }
    ArchiveRecord::from_fields(&fields)
}

fn collect_units<S: Store + ?Sized>(
    store: &S,
    dir: &Entry,
    carrier: &str,
    out: &mut Vec<ArchivedUnit>,
) -> Result<()> {
    for child in store.list_children(dir)? {
        if child.is_dir() {
            match index_record(store, &child, carrier) {
                Some(record) => out.push(ArchivedUnit {
                    unit: child,
                    record,
                }),
                None => collect_units(store, &child, carrier, out)?,
            }
            continue;
        }
        if is_carrier_name(child.name(), carrier) {
            continue;
        }
        let record = match child.unit_kind() {
            UnitKind::Document => document_record(store, &child),
            UnitKind::OpaqueFile => fields_at(store, &sidecar_path(&child.path, carrier))
                .as_ref()
                .and_then(ArchiveRecord::from_fields),
            UnitKind::Directory => None,
        };
        if let Some(record) = record {
            out.push(ArchivedUnit {
                unit: child,
                record,
            });
        }
    }
    Ok(())
}

fn archive_root_entry<S: Store + ?Sized>(store: &S, archive_root: &str) -> Option<Entry> {
    store.resolve(archive_root).filter(Entry::is_dir)
}

/// Every archived unit under `archive_root`, depth-first in store order.
/// The interior of an archived folder is never scanned.
pub fn list_archived_units<S: Store + ?Sized>(
    store: &S,
    archive_root: &str,
    carrier: &str,
) -> Result<Vec<ArchivedUnit>> {
    let Some(root) = archive_root_entry(store, archive_root) else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    collect_units(store, &root, carrier, &mut out)?;
    Ok(out)
}

fn collect_carriers<S: Store + ?Sized>(
    store: &S,
    dir: &Entry,
    carrier: &str,
    out: &mut Vec<Entry>,
) -> Result<()> {
    for child in store.list_children(dir)? {
        if child.is_dir() {
            if index_record(store, &child, carrier).is_some() {
                let index = index_path(&child.path, carrier);
                if let Some(entry) = store.resolve(&index) {
                    out.push(entry);
                }
            } else {
                collect_carriers(store, &child, carrier, out)?;
            }
            continue;
        }
        if is_carrier_name(child.name(), carrier) {
            out.push(child);
        }
    }
    Ok(())
}

/// Every index and sidecar file under `archive_root`, valid or not.
pub fn find_carrier_files<S: Store + ?Sized>(
    store: &S,
    archive_root: &str,
    carrier: &str,
) -> Result<Vec<Entry>> {
    let Some(root) = archive_root_entry(store, archive_root) else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    collect_carriers(store, &root, carrier, &mut out)?;
    Ok(out)
}
