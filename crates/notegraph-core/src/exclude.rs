//! Graph exclusion patterns

use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;

/// Case-insensitive exact/glob patterns hiding notes from the graph.
///
/// A note is excluded when a pattern equals or glob-matches either its
/// relative path (no extension) or its bare stem.
#[derive(Debug, Clone)]
pub struct ExclusionSet {
    patterns: Vec<String>,
    globs: GlobSet,
}

impl ExclusionSet {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => warn!("Exclusion pattern {:?} is not a valid glob: {}", pattern, e),
            }
        }
        let globs = builder.build().unwrap_or_else(|e| {
            warn!("Cannot compile exclusion globs, using exact matching only: {}", e);
            GlobSet::empty()
        });

        ExclusionSet { patterns, globs }
    }

    pub fn empty() -> Self {
        ExclusionSet {
            patterns: Vec::new(),
            globs: GlobSet::empty(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether the note at `note_path` (relative, no extension) is excluded.
    pub fn is_excluded(&self, note_path: &str) -> bool {
        if self.is_empty() {
            return false;
        }
        let lowered = note_path.to_lowercase();
        if self.matches(&lowered) {
            return true;
        }
        match Path::new(&lowered).file_stem() {
            Some(stem) => self.matches(&stem.to_string_lossy()),
            None => false,
        }
    }

    fn matches(&self, candidate: &str) -> bool {
        self.patterns.iter().any(|p| p == candidate) || self.globs.is_match(candidate)
    }
}

impl Default for ExclusionSet {
    fn default() -> Self {
        Self::empty()
    }
}
