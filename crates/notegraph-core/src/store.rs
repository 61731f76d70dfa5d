//! Filesystem-backed note store
//!
//! Every operation reads the notes tree afresh. Writes are plain
//! read-modify-write cycles with no locking, so concurrent writers to the
//! same note race and the last write wins.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::checkbox;
use crate::config::NotesConfig;
use crate::document::{DOCUMENT_EXTENSION, Document, walk_documents};
use crate::error::{NoteError, Result};
use crate::exclude::ExclusionSet;
use crate::graph::{GraphBuilder, GraphData, LocalGraphData};
use crate::markdown::render_markdown;
use crate::resolver::LinkResolver;
use crate::tags::{TagCount, extract_tags};

/// Number of notes listed by [`NoteStore::recent`] by default.
pub const RECENT_LIMIT: usize = 25;

/// Bytes of context kept on each side of a search match.
const SNIPPET_CONTEXT: usize = 50;

/// A rendered note page body.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedNote {
    pub title: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentNote {
    pub title: String,
    pub path: String,
    pub modified: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub path: String,
    pub snippet: String,
}

/// Read/write access to the notes tree rooted at the configured directory.
#[derive(Debug, Clone)]
pub struct NoteStore {
    config: NotesConfig,
    root: PathBuf,
    resolver: LinkResolver,
    exclusions: ExclusionSet,
}

impl NoteStore {
    /// Open the notes directory named by `config`.
    pub fn open(config: NotesConfig) -> Result<Self> {
        let root = config
            .notes_dir
            .canonicalize()
            .map_err(|e| NoteError::io(&config.notes_dir, e))?;
        if !root.is_dir() {
            return Err(NoteError::NotFound(root.display().to_string()));
        }

        let resolver = LinkResolver::new(&root, config.allow_all_paths);
        let exclusions = ExclusionSet::new(&config.graph_exclude);
        info!("Opened notes directory: {}", root.display());

        Ok(NoteStore {
            config,
            root,
            resolver,
            exclusions,
        })
    }

    /// Override the home directory used for `~` paths and cross-root links.
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.resolver = self.resolver.with_home(home);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &NotesConfig {
        &self.config
    }

    pub fn resolver(&self) -> &LinkResolver {
        &self.resolver
    }

    pub fn default_note(&self) -> &str {
        &self.config.default_note
    }

    /// Find the file for note `name` (relative, extension optional).
    ///
    /// Fails with `SecurityViolation` when the note exists outside the root
    /// and containment is enforced.
    pub fn locate(&self, name: &str) -> Result<PathBuf> {
        let file_name = if name.ends_with(&format!(".{DOCUMENT_EXTENSION}")) {
            name.to_string()
        } else {
            format!("{name}.{DOCUMENT_EXTENSION}")
        };

        let allow_all = self.config.allow_all_paths;
        let candidate = if allow_all && (file_name.starts_with('~') || file_name.starts_with('/')) {
            self.expand_home(&file_name)
        } else {
            self.root.join(&file_name)
        };

        let candidate = if allow_all {
            candidate
        } else {
            let resolved = candidate
                .canonicalize()
                .map_err(|_| NoteError::NotFound(name.to_string()))?;
            if !resolved.starts_with(&self.root) {
                warn!("Rejected note outside notes directory: {}", name);
                return Err(NoteError::SecurityViolation(name.to_string()));
            }
            resolved
        };

        if candidate.is_file() {
            Ok(candidate)
        } else {
            Err(NoteError::NotFound(name.to_string()))
        }
    }

    /// The note's file if it exists and may be served.
    pub fn resolve_document_securely(&self, name: &str) -> Option<PathBuf> {
        self.locate(name).ok()
    }

    pub fn read_raw(&self, name: &str) -> Result<String> {
        let file = self.locate(name)?;
        read_utf8(&file)
    }

    /// Replace the content of an existing note.
    pub fn save(&self, name: &str, content: &str) -> Result<()> {
        let file = self.locate(name)?;
        std::fs::write(&file, content).map_err(|e| NoteError::io(&file, e))?;
        debug!("Saved {}", file.display());
        Ok(())
    }

    /// Flip checkbox `index` of note `name` and write the result back.
    pub fn toggle_checkbox(&self, name: &str, index: i64, checked: bool) -> Result<()> {
        let file = self.locate(name)?;
        let content = read_utf8(&file)?;
        let updated = checkbox::toggle(&content, index, checked)?;
        std::fs::write(&file, updated).map_err(|e| NoteError::io(&file, e))?;
        debug!("Set checkbox {} of {} to {}", index, file.display(), checked);
        Ok(())
    }

    /// Render note `name` to HTML, resolving its wiki-links.
    pub fn render(&self, name: &str) -> Result<RenderedNote> {
        let file = self.locate(name)?;
        let content = read_utf8(&file)?;
        let current_dir = file.parent().unwrap_or(&self.root);
        let title = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(RenderedNote {
            title,
            html: render_markdown(&content, current_dir, &self.resolver),
        })
    }

    pub fn graph(&self) -> GraphData {
        GraphBuilder::new(&self.resolver, &self.exclusions)
            .build()
            .to_data()
    }

    /// Ego network of note `name`.
    pub fn local_graph(&self, name: &str) -> Result<LocalGraphData> {
        let file = self.locate(name)?;
        Ok(GraphBuilder::new(&self.resolver, &self.exclusions).local(&file))
    }

    /// Tag counts across all notes, most used first.
    pub fn tags(&self) -> Vec<TagCount> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for file in walk_documents(&self.root) {
            let Some(content) = read_for_scan(&file) else {
                continue;
            };
            let tags: BTreeSet<String> = extract_tags(&content)
                .into_iter()
                .map(|t| t.to_lowercase())
                .collect();
            for tag in tags {
                *counts.entry(tag).or_default() += 1;
            }
        }

        let mut tags: Vec<TagCount> = counts
            .into_iter()
            .map(|(name, count)| TagCount { name, count })
            .collect();
        tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        tags
    }

    /// Most recently modified notes, newest first.
    pub fn recent(&self, limit: usize) -> Vec<RecentNote> {
        let mut notes: Vec<RecentNote> = walk_documents(&self.root)
            .into_iter()
            .filter_map(|file| Document::new(&self.root, &file))
            .filter_map(|doc| {
                let modified = doc.modified?;
                Some(RecentNote {
                    path: doc.url(),
                    title: doc.title,
                    modified: DateTime::<Utc>::from(modified),
                })
            })
            .collect();
        notes.sort_by(|a, b| b.modified.cmp(&a.modified));
        notes.truncate(limit);
        notes
    }

    /// Case-insensitive substring search over note text and titles.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let needle = query.to_lowercase();
        let mut hits = Vec::new();

        for file in walk_documents(&self.root) {
            let Some(doc) = Document::new(&self.root, &file) else {
                continue;
            };
            let Some(content) = read_for_scan(&file) else {
                continue;
            };
            let lowered = content.to_lowercase();
            if !lowered.contains(&needle) && !doc.title.to_lowercase().contains(&needle) {
                continue;
            }
            hits.push(SearchHit {
                snippet: snippet(&content, &lowered, &needle),
                path: doc.url(),
                title: doc.title,
            });
        }
        hits
    }

    fn expand_home(&self, file_name: &str) -> PathBuf {
        match (file_name.strip_prefix('~'), self.resolver.home()) {
            (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with('/') => {
                home.join(rest.trim_start_matches('/'))
            }
            _ => PathBuf::from(file_name),
        }
    }
}

fn read_utf8(file: &Path) -> Result<String> {
    let bytes = std::fs::read(file).map_err(|e| NoteError::io(file, e))?;
    String::from_utf8(bytes).map_err(|_| NoteError::Decode(file.to_path_buf()))
}

/// Read a note during a bulk scan, logging and skipping failures.
fn read_for_scan(file: &Path) -> Option<String> {
    match read_utf8(file) {
        Ok(content) => Some(content),
        Err(e) => {
            warn!("Skipping during scan: {}", e);
            None
        }
    }
}

/// Context around the first match of `needle` in `lowered`.
fn snippet(content: &str, lowered: &str, needle: &str) -> String {
    let Some(idx) = lowered.find(needle) else {
        return String::new();
    };
    // Byte offsets only carry over when lowercasing kept the length.
    let text = if lowered.len() == content.len() { content } else { lowered };

    let start = floor_char_boundary(text, idx.saturating_sub(SNIPPET_CONTEXT));
    let end = ceil_char_boundary(text, (idx + needle.len() + SNIPPET_CONTEXT).min(text.len()));

    let mut out = String::new();
    if start > 0 {
        out.push_str("...");
    }
    out.push_str(&text[start..end]);
    if end < text.len() {
        out.push_str("...");
    }
    out
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(text: &str, mut idx: usize) -> usize {
    while !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_context() {
        let content = format!("{}needle{}", "a".repeat(60), "b".repeat(60));
        let lowered = content.to_lowercase();
        let s = snippet(&content, &lowered, "needle");
        assert_eq!(s, format!("...{}needle{}...", "a".repeat(50), "b".repeat(50)));
    }

    #[test]
    fn test_snippet_short_text() {
        let s = snippet("Find the Needle here", "find the needle here", "needle");
        assert_eq!(s, "Find the Needle here");
    }

    #[test]
    fn test_snippet_respects_char_boundaries() {
        let content = format!("{}needle", "é".repeat(40));
        let lowered = content.to_lowercase();
        let s = snippet(&content, &lowered, "needle");
        assert!(s.starts_with("..."));
        assert!(s.ends_with("needle"));
    }

    #[test]
    fn test_snippet_without_content_match() {
        assert_eq!(snippet("body", "body", "title"), "");
    }
}
