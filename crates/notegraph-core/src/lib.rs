//! Notegraph Core: note discovery, wiki-link resolution, rendering and the link graph

pub mod checkbox;
pub mod config;
pub mod document;
pub mod error;
pub mod exclude;
pub mod graph;
pub mod markdown;
pub mod resolver;
pub mod store;
pub mod tags;


#[cfg(test)]
pub mod test_utils;

pub use checkbox::{checkbox_spans, toggle};
pub use config::{DEFAULT_NOTE, NotesConfig, parse_exclude_list};
pub use document::{DOCUMENT_EXTENSION, Document, is_document, is_hidden, relative_id, url_for, walk_documents};
pub use error::{NoteError, Result};
pub use exclude::ExclusionSet;
pub use graph::{EdgeView, GraphBuilder, GraphData, LinkGraph, LocalGraphData, LocalNodeView, NodeView, NoteNode};
pub use markdown::{extract_wiki_links, normalize_checkboxes, render_html, render_markdown, rewrite_wiki_links, slugify};
pub use resolver::{LinkResolver, dead_link};
pub use store::{NoteStore, RECENT_LIMIT, RecentNote, RenderedNote, SearchHit};
pub use tags::{TagCount, extract_tags};
