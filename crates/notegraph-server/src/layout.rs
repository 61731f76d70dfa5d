//! Page layout seam and the built-in plain HTML shell

use std::fmt::Write;

use notegraph_core::{RecentNote, SearchHit, TagCount};

/// Navigation data shown next to every page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sidebar {
    pub tags: Vec<TagCount>,
    pub recent: Vec<RecentNote>,
}

/// Wraps rendered note HTML into a full page.
pub trait PageRenderer: Send + Sync {
    fn render_page(&self, title: &str, body_html: &str, sidebar: &Sidebar) -> String;
}

/// Minimal page shell with a live-reload hook on `/api/events`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainLayout;

const LIVE_RELOAD: &str = r#"<script>
const events = new EventSource("/api/events");
for (const kind of ["created", "modified", "deleted"]) {
  events.addEventListener(kind, (e) => {
    if (decodeURIComponent(location.pathname) === e.data) location.reload();
  });
}
</script>"#;

impl PageRenderer for PlainLayout {
    fn render_page(&self, title: &str, body_html: &str, sidebar: &Sidebar) -> String {
        let mut page = String::with_capacity(body_html.len() + 1024);
        page.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        let _ = writeln!(page, "<title>{}</title>", escape_html(title));
        page.push_str("</head>\n<body>\n<nav>\n<form action=\"/search\"><input name=\"q\" placeholder=\"Search\"></form>\n");

        if !sidebar.recent.is_empty() {
            page.push_str("<h2>Recent</h2>\n<ul class=\"recent\">\n");
            for note in &sidebar.recent {
                let _ = writeln!(
                    page,
                    "<li><a href=\"{}\">{}</a></li>",
                    escape_html(&note.path),
                    escape_html(&note.title)
                );
            }
            page.push_str("</ul>\n");
        }
        if !sidebar.tags.is_empty() {
            page.push_str("<h2>Tags</h2>\n<ul class=\"tags\">\n");
            for tag in &sidebar.tags {
                let _ = writeln!(
                    page,
                    "<li><a href=\"/search?q=%40{0}\">@{0}</a> ({1})</li>",
                    escape_html(&tag.name),
                    tag.count
                );
            }
            page.push_str("</ul>\n");
        }

        page.push_str("</nav>\n<main>\n");
        page.push_str(body_html);
        page.push_str("\n</main>\n");
        page.push_str(LIVE_RELOAD);
        page.push_str("\n</body>\n</html>\n");
        page
    }
}

/// HTML body listing search results for `query`.
pub fn search_results_html(query: &str, hits: &[SearchHit]) -> String {
    let mut html = format!("<h1>Search: {}</h1>\n", escape_html(query));
    if hits.is_empty() {
        html.push_str("<p>No matching notes.</p>\n");
        return html;
    }
    html.push_str("<ul class=\"search-results\">\n");
    for hit in hits {
        let _ = writeln!(
            html,
            "<li><a href=\"{}\">{}</a><p>{}</p></li>",
            escape_html(&hit.path),
            escape_html(&hit.title),
            escape_html(&hit.snippet)
        );
    }
    html.push_str("</ul>\n");
    html
}

/// HTML body for a note that does not exist.
pub fn not_found_html(name: &str) -> String {
    format!(
        "<h1>Note not found</h1>\n<p>There is no note named <code>{}</code>.</p>\n",
        escape_html(name)
    )
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recent(title: &str) -> RecentNote {
        RecentNote {
            title: title.to_string(),
            path: format!("/{title}"),
            modified: Default::default(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_plain_layout() {
        let sidebar = Sidebar {
            tags: vec![TagCount { name: "work".into(), count: 3 }],
            recent: vec![recent("todo")],
        };
        let page = PlainLayout.render_page("A <b> note", "<p>body</p>", &sidebar);
        assert!(page.contains("<title>A &lt;b&gt; note</title>"));
        assert!(page.contains("<main>\n<p>body</p>\n</main>"));
        assert!(page.contains(r#"<a href="/todo">todo</a>"#));
        assert!(page.contains("@work</a> (3)"));
        assert!(page.contains("/api/events"));
    }

    #[test]
    fn test_search_results() {
        let hits = vec![SearchHit {
            title: "todo".into(),
            path: "/todo".into(),
            snippet: "a <tag>".into(),
        }];
        let html = search_results_html("<q>", &hits);
        assert!(html.contains("Search: &lt;q&gt;"));
        assert!(html.contains("<p>a &lt;tag&gt;</p>"));
        assert!(search_results_html("x", &[]).contains("No matching notes"));
    }
}
