//! Web preview helpers for `flipbook-render`.
//!
//! Turns reader projections into HTML fragments that a browser shell can
//! swap in without any layout logic of its own.

use flipbook::escape_text;
use flipbook_render::{
    BookIndex, Direction, LayoutMode, ProjectionEntry, ProjectionView, Reader,
};
use serde::Serialize;

/// Crate marker module.
pub mod preview {
    /// Current crate version.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

fn layout_class(mode: LayoutMode) -> &'static str {
    match mode {
        LayoutMode::Single => "single",
        LayoutMode::Spread => "spread",
    }
}

fn push_page(out: &mut String, side: &str, entry: Option<&ProjectionEntry<'_>>) {
    match entry {
        Some(entry) => {
            out.push_str("<section class=\"page page-");
            out.push_str(side);
            out.push_str("\" data-page=\"");
            out.push_str(&entry.page_number.to_string());
            out.push_str("\"><div class=\"page-content\">");
            out.push_str(entry.html);
            out.push_str("</div><span class=\"page-number\">");
            out.push_str(&entry.page_number.to_string());
            out.push_str("</span></section>");
        }
        None => {
            out.push_str("<section class=\"page page-");
            out.push_str(side);
            out.push_str(" blank\"></section>");
        }
    }
}

/// Markup for the pages visible in `view`.
///
/// Spread views always render two page slots; a missing right page is a
/// blank slot.
pub fn projection_html(view: &ProjectionView<'_>) -> String {
    let page_bytes: usize = view.entries.iter().map(|e| e.html.len()).sum();
    let mut out = String::with_capacity(page_bytes + 256);
    out.push_str("<div class=\"book-view ");
    out.push_str(layout_class(view.mode));
    out.push_str("\">");
    match view.mode {
        LayoutMode::Single => push_page(&mut out, "single", view.left()),
        LayoutMode::Spread => {
            push_page(&mut out, "left", view.left());
            push_page(&mut out, "right", view.right());
        }
    }
    out.push_str("</div>");
    out
}

/// Clickable table of contents for a book index.
pub fn toc_html(index: &BookIndex) -> String {
    let mut out = String::with_capacity(64 + index.toc().len() * 96);
    out.push_str("<ol class=\"toc-list\">");
    for entry in index.toc() {
        out.push_str("<li><a href=\"#\" data-page=\"");
        out.push_str(&entry.start_page.to_string());
        out.push_str("\">");
        out.push_str(&escape_text(&entry.title));
        out.push_str("</a><span class=\"toc-pages\">");
        if entry.page_count > 1 {
            out.push_str(&format!("{}–{}", entry.start_page, entry.end_page()));
        } else {
            out.push_str(&entry.start_page.to_string());
        }
        out.push_str("</span></li>");
    }
    out.push_str("</ol>");
    out
}

/// Everything a browser needs to paint one cursor position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ViewSnapshot {
    pub cursor: usize,
    pub pages: Vec<usize>,
    pub html: String,
    pub next_enabled: bool,
    pub prev_enabled: bool,
    pub progress_percent: u8,
}

pub fn snapshot(reader: &Reader) -> ViewSnapshot {
    let view = reader.projection();
    ViewSnapshot {
        cursor: reader.cursor(),
        pages: view.entries.iter().map(|e| e.page_number).collect(),
        html: projection_html(&view),
        next_enabled: reader.next_enabled(),
        prev_enabled: reader.prev_enabled(),
        progress_percent: reader.progress_percent(),
    }
}

/// Snapshots from the current position to the end of the book, turning
/// forward one step at a time.
pub fn walk_views(reader: &mut Reader) -> Vec<ViewSnapshot> {
    let mut views = Vec::with_capacity(reader.total_pages());
    views.push(snapshot(reader));
    while let Some(transition) = reader.turn_page(Direction::Next) {
        if !reader.finish_transition(transition.id) {
            log::warn!("preview: transition {} did not close", transition.id.0);
            break;
        }
        views.push(snapshot(reader));
    }
    log::debug!(
        "preview: {} {} views over {} pages",
        views.len(),
        layout_class(reader.layout_mode()),
        reader.total_pages()
    );
    views
}
