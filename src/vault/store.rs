use crate::vault::links;
use crate::vault::paths::TRASH_DIR;
use crate::vault::resolver::{join, name_of, parent_of, unique_alternative};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Extension of documents that carry their own header block.
pub const DOCUMENT_EXTENSION: &str = "md";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// How an entry carries its archive record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Document,
    Directory,
    OpaqueFile,
}

impl UnitKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Directory => "directory",
            Self::OpaqueFile => "opaque_file",
        }
    }
}

/// A file or directory node, addressed by its slash-delimited vault path.
/// Only valid for the operation that resolved it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub path: String,
    pub kind: EntryKind,
}

impl Entry {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File,
        }
    }

    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Directory,
        }
    }

    pub fn name(&self) -> &str {
        name_of(&self.path)
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn extension(&self) -> Option<&str> {
        if self.is_dir() {
            return None;
        }
        let name = self.name();
        match name.rfind('.') {
            Some(idx) if idx > 0 => Some(&name[idx + 1..]),
            _ => None,
        }
    }

    pub fn unit_kind(&self) -> UnitKind {
        match self.kind {
            EntryKind::Directory => UnitKind::Directory,
            EntryKind::File if self.extension() == Some(DOCUMENT_EXTENSION) => UnitKind::Document,
            EntryKind::File => UnitKind::OpaqueFile,
        }
    }
}

/// The hierarchical store the archive engine runs against.
pub trait Store {
    fn resolve(&self, path: &str) -> Option<Entry>;

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_some()
    }

    fn list_children(&self, dir: &Entry) -> Result<Vec<Entry>>;

    /// Create `path` and any missing ancestors.
    fn create_directory(&self, path: &str) -> Result<()>;

    /// Create a new document; refuses to overwrite.
    fn create_document(&self, path: &str, content: &str) -> Result<Entry>;

    fn read_document(&self, entry: &Entry) -> Result<String>;

    fn write_document(&self, entry: &Entry, content: &str) -> Result<()>;

    /// Relocate `entry`, keeping internal links pointed at it.
    fn move_entry(&self, entry: &Entry, new_path: &str) -> Result<()>;

    /// Recoverable removal.
    fn trash(&self, entry: &Entry) -> Result<()>;

    fn delete(&self, entry: &Entry) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn abs(&self, path: &str) -> PathBuf {
        if path.is_empty() {
            self.root.clone()
        } else {
            self.root.join(path)
        }
    }

    fn rename_on_disk(&self, from: &Path, to: &Path, is_dir: bool) -> Result<()> {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(rename_err) if !is_dir && rename_err.kind() == ErrorKind::CrossesDevices => {
                fs::copy(from, to).with_context(|| {
                    format!("failed to copy {} to {}", from.display(), to.display())
                })?;
                fs::remove_file(from)
                    .with_context(|| format!("failed to remove {}", from.display()))?;
                Ok(())
            }
            Err(rename_err) => Err(rename_err).with_context(|| {
                format!("failed to move {} to {}", from.display(), to.display())
            }),
        }
    }
}

impl Store for FsStore {
    fn resolve(&self, path: &str) -> Option<Entry> {
        let meta = fs::symlink_metadata(self.abs(path)).ok()?;
        if meta.is_dir() {
            Some(Entry::directory(path))
        } else {
            Some(Entry::file(path))
        }
    }

    fn list_children(&self, dir: &Entry) -> Result<Vec<Entry>> {
        let abs = self.abs(&dir.path);
        let mut out = Vec::new();
        for item in fs::read_dir(&abs).with_context(|| format!("failed to read {}", abs.display()))? {
            let item = item?;
            let Some(name) = item.file_name().to_str().map(ToOwned::to_owned) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let kind = if item.file_type()?.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            out.push(Entry {
                path: join(&dir.path, &name),
                kind,
            });
        }
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }

    fn create_directory(&self, path: &str) -> Result<()> {
        let abs = self.abs(path);
        fs::create_dir_all(&abs).with_context(|| format!("failed to create {}", abs.display()))
    }

    fn create_document(&self, path: &str, content: &str) -> Result<Entry> {
        use std::io::Write;
        let abs = self.abs(path);
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&abs)
            .with_context(|| format!("failed to create {}", abs.display()))?;
        file.write_all(content.as_bytes())
            .with_context(|| format!("failed to write {}", abs.display()))?;
        Ok(Entry::file(path))
    }

    fn read_document(&self, entry: &Entry) -> Result<String> {
        let abs = self.abs(&entry.path);
        fs::read_to_string(&abs).with_context(|| format!("failed to read {}", abs.display()))
    }

    fn write_document(&self, entry: &Entry, content: &str) -> Result<()> {
        let abs = self.abs(&entry.path);
        fs::write(&abs, content).with_context(|| format!("failed to write {}", abs.display()))
    }

    fn move_entry(&self, entry: &Entry, new_path: &str) -> Result<()> {
        if entry.path == new_path {
            anyhow::bail!("cannot move {} onto itself", entry.path);
        }
        if self.exists(new_path) {
            anyhow::bail!("destination already exists: {new_path}");
        }
        let parent = parent_of(new_path);
        if !parent.is_empty() && !self.exists(parent) {
            anyhow::bail!("destination folder does not exist: {parent}");
        }

        self.rename_on_disk(&self.abs(&entry.path), &self.abs(new_path), entry.is_dir())?;

        links::rewrite_vault_links(&self.root, &entry.path, new_path, entry.is_dir());
        Ok(())
    }

    fn trash(&self, entry: &Entry) -> Result<()> {
        self.create_directory(TRASH_DIR)?;
        let wanted = join(TRASH_DIR, entry.name());
        let dest = if self.exists(&wanted) {
            unique_alternative(self, &wanted)
        } else {
            wanted
        };
        self.rename_on_disk(&self.abs(&entry.path), &self.abs(&dest), entry.is_dir())
    }

    fn delete(&self, entry: &Entry) -> Result<()> {
        let abs = self.abs(&entry.path);
        let res = if entry.is_dir() {
            fs::remove_dir_all(&abs)
        } else {
            fs::remove_file(&abs)
        };
        match res {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("failed to delete {}", abs.display())),
        }
    }
}
