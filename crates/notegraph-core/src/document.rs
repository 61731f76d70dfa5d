//! Notes on disk: discovery, hidden-path rules and URL paths

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use ignore::WalkBuilder;
use tracing::warn;

/// Extension of every recognized note file.
pub const DOCUMENT_EXTENSION: &str = "md";

/// A note file located under the notes root.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Root-relative, extension-stripped, slash-separated path.
    pub id: String,
    /// Filename stem.
    pub title: String,
    /// Absolute path of the file.
    pub file: PathBuf,
    pub modified: Option<SystemTime>,
}

impl Document {
    /// Describe `file`, which must live under `root`.
    pub fn new(root: &Path, file: &Path) -> Option<Self> {
        let rel = file.strip_prefix(root).ok()?;
        let title = file.file_stem()?.to_string_lossy().into_owned();
        let modified = file.metadata().and_then(|m| m.modified()).ok();
        Some(Document {
            id: relative_id(rel),
            title,
            file: file.to_path_buf(),
            modified,
        })
    }

    /// URL path of the note (`/` + id).
    pub fn url(&self) -> String {
        format!("/{}", self.id)
    }
}

/// Whether a path names a note file.
pub fn is_document(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(DOCUMENT_EXTENSION)
}

/// Whether any segment of `path` is hidden (starts with a dot).
pub fn is_hidden(path: &Path) -> bool {
    path.components().any(|c| match c {
        Component::Normal(name) => name.to_string_lossy().starts_with('.'),
        _ => false,
    })
}

/// Slash-separated, extension-stripped form of a relative path.
pub fn relative_id(rel: &Path) -> String {
    rel.with_extension("")
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// URL path (`/a/b`) for a relative note path (`a/b.md`).
pub fn url_for(rel: &Path) -> String {
    format!("/{}", relative_id(rel))
}

/// Every note file under `root`, hidden segments skipped, in path order.
pub fn walk_documents(root: &Path) -> Vec<PathBuf> {
    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .ignore(false)
        .parents(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Cannot read entry under {}: {}", root.display(), e);
                continue;
            }
        };
        let path = entry.path();
        if entry.file_type().is_some_and(|t| t.is_file()) && is_document(path) {
            files.push(path.to_path_buf());
        }
    }
    files
}
