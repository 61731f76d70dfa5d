//! Notes directory configuration

use std::path::PathBuf;

/// Note served at `/` when nothing else is configured.
pub const DEFAULT_NOTE: &str = "homepage";

/// Settings that shape how the notes tree is read and linked.
#[derive(Debug, Clone)]
pub struct NotesConfig {
    /// Root of the notes tree.
    pub notes_dir: PathBuf,
    /// Landing note, without extension.
    pub default_note: String,
    /// Disables root containment and enables home/absolute link lookup.
    pub allow_all_paths: bool,
    /// Lowercased graph exclusion patterns.
    pub graph_exclude: Vec<String>,
}

impl NotesConfig {
    pub fn new(notes_dir: impl Into<PathBuf>) -> Self {
        NotesConfig {
            notes_dir: notes_dir.into(),
            default_note: DEFAULT_NOTE.to_string(),
            allow_all_paths: false,
            graph_exclude: Vec::new(),
        }
    }

    pub fn with_default_note(mut self, note: impl Into<String>) -> Self {
        self.default_note = note.into();
        self
    }

    pub fn with_allow_all_paths(mut self, allow: bool) -> Self {
        self.allow_all_paths = allow;
        self
    }

    pub fn with_graph_exclude(mut self, patterns: Vec<String>) -> Self {
        self.graph_exclude = patterns;
        self
    }
}

/// Split a comma-separated exclusion list, trimming and lowercasing entries.
pub fn parse_exclude_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect()
}
