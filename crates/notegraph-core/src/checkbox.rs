//! Locate and flip checkboxes in raw note text

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{NoteError, Result};

static CHECKBOX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[ xX]\]").expect("valid checkbox regex"));

/// Byte ranges of every `[ ]`, `[x]` and `[X]` in document order.
pub fn checkbox_spans(content: &str) -> Vec<Range<usize>> {
    CHECKBOX.find_iter(content).map(|m| m.range()).collect()
}

/// Set the checkbox at `index` to `[x]` or `[ ]`.
///
/// Indices count every checkbox-shaped span in `content`, so they are only
/// meaningful against the exact text they were computed from.
pub fn toggle(content: &str, index: i64, checked: bool) -> Result<String> {
    let spans = checkbox_spans(content);
    let span = usize::try_from(index)
        .ok()
        .and_then(|i| spans.get(i))
        .ok_or(NoteError::OutOfRange {
            index,
            count: spans.len(),
        })?;

    let replacement = if checked { "[x]" } else { "[ ]" };
    let mut out = String::with_capacity(content.len());
    out.push_str(&content[..span.start]);
    out.push_str(replacement);
    out.push_str(&content[span.end..]);
    Ok(out)
}
