//! `@tag` extraction

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([a-zA-Z][a-zA-Z0-9_-]*)").expect("valid tag regex"));

/// A tag and the number of notes mentioning it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub name: String,
    pub count: usize,
}

/// Distinct `@tags` in `content`, case preserved.
///
/// An `@` directly after a word character (as in `me@example.com`) does not
/// start a tag.
pub fn extract_tags(content: &str) -> BTreeSet<String> {
    TAG.captures_iter(content)
        .filter(|caps| caps.get(0).is_some_and(|m| !follows_word_char(content, m.start())))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

fn follows_word_char(content: &str, at: usize) -> bool {
    content[..at]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
}
