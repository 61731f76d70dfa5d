//! Test utilities for notegraph-core

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::config::NotesConfig;
use crate::store::NoteStore;

/// Create a temporary notes tree with a small linked corpus.
///
/// Layout (under `<tmp>/notes`):
/// - `home.md` links `todo` twice and `projects/roadmap` by stem
/// - `todo.md` links `roadmap` and carries checkboxes and tags
/// - `projects/roadmap.md` links `far` and back to `home`
/// - `projects/far.md` has no links
/// - `.drafts/hidden.md` must never appear anywhere
///
/// `<tmp>/outside.md` sits next to the root, outside it.
pub fn create_test_notes() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("notes");

    fs::create_dir_all(root.join("projects")).unwrap();
    fs::create_dir_all(root.join(".drafts")).unwrap();

    fs::write(
        root.join("home.md"),
        "# Home\n\nStart with [[todo]] and [[Todo]].\nPlans live in [[roadmap]].\n@daily\n",
    )
    .unwrap();
    fs::write(
        root.join("todo.md"),
        "# Todo\n\n- [ ] write docs\n- [x] ship @work\n- [ ] see [[roadmap]] @work @Daily\n",
    )
    .unwrap();
    fs::write(
        root.join("projects/roadmap.md"),
        "# Roadmap\n\nNext: [[far]]. Back to [[home]].\n",
    )
    .unwrap();
    fs::write(root.join("projects/far.md"), "Nothing links out from here.\n").unwrap();
    fs::write(root.join(".drafts/hidden.md"), "[[home]] @secret\n").unwrap();
    fs::write(temp_dir.path().join("outside.md"), "outside the notes root\n").unwrap();

    temp_dir
}

/// Root of the notes tree inside a directory from [`create_test_notes`].
pub fn notes_root(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("notes")
}

/// Open a store over the test corpus.
pub fn open_store(temp_dir: &TempDir, configure: impl FnOnce(NotesConfig) -> NotesConfig) -> NoteStore {
    let config = configure(NotesConfig::new(notes_root(temp_dir)));
    NoteStore::open(config)
        .unwrap()
        .with_home(Some(temp_dir.path().canonicalize().unwrap()))
}

/// Write `content` to `rel` under `root`, creating parent directories.
pub fn write_note(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}
