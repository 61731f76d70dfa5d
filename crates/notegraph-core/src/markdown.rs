//! Markdown pipeline: wiki-link rewrite, checkbox normalization, HTML render
//!
//! Raw note text goes through two textual passes before pulldown-cmark sees
//! it:
//!
//! 1. `[[token]]` becomes `[token](<url>)` using [`LinkResolver::resolve`]
//! 2. bare `[ ]` / `[x]` lines become `- [ ]` / `- [x]` task items
//!
//! The event stream is then adjusted so headings carry slug ids, soft breaks
//! render as `<br />` and every task item gets a `data-checkbox-index`.

use std::path::Path;
use std::sync::LazyLock;

use pulldown_cmark::{CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html};
use regex::Regex;

use crate::resolver::LinkResolver;

static WIKI_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]]+)\]\]").expect("valid wiki-link regex"));

static BARE_CHECKBOX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)\[([xX ])\]").expect("valid checkbox regex"));

static NON_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\-_]").expect("valid slug regex"));

static HYPHEN_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").expect("valid regex"));

/// Anchor id for a heading, GitHub TOC style.
pub fn slugify(text: &str) -> String {
    let slug = text.to_lowercase().replace(' ', "-");
    let slug = NON_SLUG.replace_all(&slug, "");
    HYPHEN_RUN.replace_all(&slug, "-").into_owned()
}

/// Every raw `[[token]]` in document order, duplicates kept.
pub fn extract_wiki_links(content: &str) -> Vec<&str> {
    WIKI_LINK
        .captures_iter(content)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Replace wiki-links with standard markdown links.
pub fn rewrite_wiki_links(content: &str, current_dir: &Path, resolver: &LinkResolver) -> String {
    WIKI_LINK
        .replace_all(content, |caps: &regex::Captures<'_>| {
            let text = &caps[1];
            let url = resolver.resolve(text, current_dir);
            format!("[{text}](<{url}>)")
        })
        .into_owned()
}

/// Turn standalone checkbox lines into list items.
pub fn normalize_checkboxes(content: &str) -> String {
    BARE_CHECKBOX.replace_all(content, "$1- [$2]").into_owned()
}

/// Render a note to HTML.
pub fn render_markdown(content: &str, current_dir: &Path, resolver: &LinkResolver) -> String {
    let content = rewrite_wiki_links(content, current_dir, resolver);
    let content = normalize_checkboxes(&content);
    render_html(&content)
}

/// Render already-preprocessed markdown.
pub fn render_html(content: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let events: Vec<Event<'_>> = Parser::new_ext(content, options).collect();
    let events = NoteEvents::new().transform(events);

    let mut out = String::with_capacity(content.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    out
}

/// Per-render state for the event rewrite.
struct NoteEvents {
    checkbox_index: usize,
}

impl NoteEvents {
    fn new() -> Self {
        NoteEvents { checkbox_index: 0 }
    }

    fn transform<'a>(&mut self, events: Vec<Event<'a>>) -> Vec<Event<'a>> {
        let mut out = Vec::with_capacity(events.len());
        let mut i = 0;
        while i < events.len() {
            match &events[i] {
                Event::Start(Tag::Heading { level, .. }) => {
                    let end = heading_end(&events, i);
                    out.extend(self.heading(*level, &events[i..=end]));
                    i = end + 1;
                    continue;
                }
                Event::Start(Tag::Item) if is_task_item(&events, i) => {
                    out.push(Event::Html(CowStr::from(r#"<li class="task-list-item">"#)));
                }
                Event::TaskListMarker(checked) => {
                    out.push(self.checkbox(*checked));
                }
                Event::SoftBreak => out.push(Event::HardBreak),
                other => out.push(other.clone()),
            }
            i += 1;
        }
        out
    }

    /// Re-emit a heading with its slug as id.
    fn heading<'a>(&mut self, level: HeadingLevel, events: &[Event<'a>]) -> Vec<Event<'a>> {
        let text: String = events
            .iter()
            .filter_map(|e| match e {
                Event::Text(t) | Event::Code(t) => Some(t.as_ref()),
                _ => None,
            })
            .collect();

        let (classes, attrs) = match &events[0] {
            Event::Start(Tag::Heading { classes, attrs, .. }) => (classes.clone(), attrs.clone()),
            _ => (Vec::new(), Vec::new()),
        };

        let mut out = Vec::with_capacity(events.len());
        out.push(Event::Start(Tag::Heading {
            level,
            id: Some(CowStr::from(slugify(&text))),
            classes,
            attrs,
        }));
        let inner = events[1..events.len() - 1].to_vec();
        out.extend(self.transform(inner));
        out.push(Event::End(TagEnd::Heading(level)));
        out
    }

    fn checkbox<'a>(&mut self, checked: bool) -> Event<'a> {
        let mut input = format!(
            r#"<input class="task-list-item-checkbox" type="checkbox" data-checkbox-index="{}""#,
            self.checkbox_index
        );
        if checked {
            input.push_str(" checked");
        }
        input.push_str("/>");
        self.checkbox_index += 1;
        Event::InlineHtml(CowStr::from(input))
    }
}

fn heading_end(events: &[Event<'_>], start: usize) -> usize {
    events[start..]
        .iter()
        .position(|e| matches!(e, Event::End(TagEnd::Heading(_))))
        .map(|offset| start + offset)
        .unwrap_or(events.len() - 1)
}

/// A list item whose first content (possibly inside a paragraph) is a task marker.
fn is_task_item(events: &[Event<'_>], item: usize) -> bool {
    match events.get(item + 1) {
        Some(Event::TaskListMarker(_)) => true,
        Some(Event::Start(Tag::Paragraph)) => {
            matches!(events.get(item + 2), Some(Event::TaskListMarker(_)))
        }
        _ => false,
    }
}
