//! Wiki-link resolution: `[[token]]` to a URL path

use std::path::{Path, PathBuf};

use crate::document::{DOCUMENT_EXTENSION, is_hidden, url_for};

/// Resolves reference tokens against the notes tree.
///
/// Lookup order for `[[token]]`, first hit wins:
/// 1. the referencing note's own directory
/// 2. the notes root
/// 3. each non-hidden child directory of the root, one level deep, by name
/// 4. with `allow_all_paths` only: the home directory, then the absolute path
///
/// Candidates from steps 1-3 must canonicalize to a file inside the root.
/// Anything else produces a dead link URL built from the token.
#[derive(Debug, Clone)]
pub struct LinkResolver {
    root: PathBuf,
    allow_all_paths: bool,
    home: Option<PathBuf>,
}

impl LinkResolver {
    /// `root` should already be canonical.
    pub fn new(root: impl Into<PathBuf>, allow_all_paths: bool) -> Self {
        LinkResolver {
            root: root.into(),
            allow_all_paths,
            home: dirs::home_dir(),
        }
    }

    /// Override the home directory used for cross-root lookups.
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }

    pub fn allow_all_paths(&self) -> bool {
        self.allow_all_paths
    }

    /// Resolve `token` as referenced from a note living in `current_dir`.
    pub fn resolve(&self, token: &str, current_dir: &Path) -> String {
        let name = token.trim();
        let file_name = document_file_name(name);

        if let Some(url) = self.contained_url(&current_dir.join(&file_name)) {
            return url;
        }
        if let Some(url) = self.contained_url(&self.root.join(&file_name)) {
            return url;
        }
        for dir in self.child_dirs() {
            if let Some(url) = self.contained_url(&dir.join(&file_name)) {
                return url;
            }
        }

        if self.allow_all_paths {
            if let Some(home) = &self.home {
                let candidate = home.join(&file_name);
                if candidate.is_file() {
                    return self.display_path(&candidate);
                }
            }
            let candidate = Path::new("/").join(&file_name);
            if candidate.is_file() {
                return self.display_path(&candidate);
            }
        }

        dead_link(name)
    }

    /// Find a note for `token` without containment checks.
    ///
    /// Searches the root, its child directories, the home directory and the
    /// absolute path. Only meaningful when `allow_all_paths` is set.
    pub fn locate_unrestricted(&self, token: &str) -> Option<PathBuf> {
        let file_name = document_file_name(token);

        let candidate = self.root.join(&file_name);
        if candidate.exists() {
            return Some(candidate);
        }
        for dir in self.child_dirs() {
            let candidate = dir.join(&file_name);
            if candidate.exists() {
                return Some(candidate);
            }
        }

        if self.allow_all_paths {
            if let Some(home) = &self.home {
                let candidate = home.join(&file_name);
                if candidate.exists() {
                    return Some(candidate);
                }
            }
            let candidate = Path::new("/").join(&file_name);
            if candidate.exists() {
                return Some(candidate);
            }
        }

        None
    }

    /// Best-effort URL for a file that may live outside the root.
    ///
    /// Root-relative first, then `/~/` + home-relative, then the raw path.
    pub fn display_path(&self, file: &Path) -> String {
        if let Ok(rel) = file.strip_prefix(&self.root) {
            return url_for(rel);
        }
        if let Some(home) = &self.home {
            if let Ok(rel) = file.strip_prefix(home) {
                return format!("/~{}", url_for(rel));
            }
        }
        format!("/{}", file.with_extension("").display())
    }

    /// URL for `candidate` if it is a file inside the root.
    fn contained_url(&self, candidate: &Path) -> Option<String> {
        let resolved = candidate.canonicalize().ok()?;
        if !resolved.is_file() {
            return None;
        }
        let rel = resolved.strip_prefix(&self.root).ok()?;
        Some(url_for(rel))
    }

    /// Non-hidden child directories of the root, sorted by name.
    fn child_dirs(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut dirs: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .filter(|path| {
                path.file_name()
                    .is_some_and(|name| !is_hidden(Path::new(name)))
            })
            .collect();
        dirs.sort();
        dirs
    }
}

fn document_file_name(name: &str) -> String {
    format!("{name}.{DOCUMENT_EXTENSION}")
}

/// URL for a link that resolves nowhere. Traversal sequences are dropped.
pub fn dead_link(name: &str) -> String {
    format!("/{}", name.replace("..", "").trim_start_matches('/'))
}
