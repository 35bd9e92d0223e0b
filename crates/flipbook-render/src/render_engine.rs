use flipbook::{escape_text, Chapter};
use serde::{Deserialize, Serialize};

use crate::render_ir::{LayoutMode, Page, PageKind, PaginationProfileId, WordLocation};
use crate::render_layout::{Measurer, PaginationConfig, Paginator};

/// Render-engine options.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RenderEngineOptions {
    /// Geometry and break policy handed to the paginator.
    pub pagination: PaginationConfig,
    /// Prepend a generated table-of-contents page.
    pub table_of_contents: bool,
}

impl RenderEngineOptions {
    /// Build options for a viewport size and layout.
    pub fn for_viewport(width: u32, height: u32, layout: LayoutMode) -> Self {
        Self {
            pagination: PaginationConfig::for_viewport(width, height, layout),
            table_of_contents: false,
        }
    }

    pub fn with_table_of_contents(mut self, enabled: bool) -> Self {
        self.table_of_contents = enabled;
        self
    }
}

/// Table-of-contents row for one chapter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub chapter_id: u32,
    pub title: String,
    /// 1-based number of the chapter's first page.
    pub start_page: usize,
    pub page_count: usize,
}

impl TocEntry {
    /// 1-based number of the chapter's last page.
    pub fn end_page(&self) -> usize {
        self.start_page + self.page_count.saturating_sub(1)
    }

    pub fn contains_page(&self, page_number: usize) -> bool {
        self.page_count > 0 && page_number >= self.start_page && page_number <= self.end_page()
    }
}

/// Page-number lookup row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageIndexEntry {
    /// 1-based page number.
    pub page_number: usize,
    /// Owning chapter; `0` for front matter.
    pub chapter_id: u32,
    pub chapter_title: String,
    pub sequence_index: usize,
}

/// Chapter start pages and page-number map for one page list.
///
/// Always rebuilt together with the page list it describes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BookIndex {
    toc: Vec<TocEntry>,
    pages: Vec<PageIndexEntry>,
}

impl BookIndex {
    /// Index `pages`, of which the first `front_matter_pages` are generated
    /// front matter.
    ///
    /// Chapters are matched to runs of consecutive pages with the chapter's
    /// id, in chapter order, so `start_page` of chapter `i` is
    /// `1 + front_matter_pages + pages of chapters before i`.
    pub fn build(chapters: &[Chapter], pages: &[Page], front_matter_pages: usize) -> Self {
        let front = front_matter_pages.min(pages.len());
        let mut toc = Vec::with_capacity(chapters.len());
        let mut entries = Vec::with_capacity(pages.len());

        for (idx, page) in pages.iter().take(front).enumerate() {
            entries.push(PageIndexEntry {
                page_number: idx + 1,
                chapter_id: page.source_chapter_id,
                chapter_title: front_matter_title(page.kind).to_string(),
                sequence_index: idx,
            });
        }

        let mut cursor = front;
        for chapter in chapters {
            let page_count = pages[cursor..]
                .iter()
                .take_while(|page| page.source_chapter_id == chapter.id)
                .count();
            if page_count == 0 {
                log::warn!(
                    "book index: chapter {} '{}' has no pages at position {}",
                    chapter.id,
                    chapter.title,
                    cursor + 1
                );
                continue;
            }
            toc.push(TocEntry {
                chapter_id: chapter.id,
                title: chapter.title.clone(),
                start_page: cursor + 1,
                page_count,
            });
            for offset in 0..page_count {
                let sequence_index = cursor + offset;
                entries.push(PageIndexEntry {
                    page_number: sequence_index + 1,
                    chapter_id: chapter.id,
                    chapter_title: chapter.title.clone(),
                    sequence_index,
                });
            }
            cursor += page_count;
        }

        if cursor < pages.len() {
            log::warn!(
                "book index: {} trailing pages not owned by any listed chapter",
                pages.len() - cursor
            );
            for (offset, page) in pages[cursor..].iter().enumerate() {
                let sequence_index = cursor + offset;
                entries.push(PageIndexEntry {
                    page_number: sequence_index + 1,
                    chapter_id: page.source_chapter_id,
                    chapter_title: String::new(),
                    sequence_index,
                });
            }
        }

        Self {
            toc,
            pages: entries,
        }
    }

    pub fn toc(&self) -> &[TocEntry] {
        &self.toc
    }

    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    /// Lookup row for a 1-based page number.
    pub fn entry(&self, page_number: usize) -> Option<&PageIndexEntry> {
        page_number
            .checked_sub(1)
            .and_then(|idx| self.pages.get(idx))
    }

    pub fn entries(&self) -> &[PageIndexEntry] {
        &self.pages
    }

    /// TOC row of the chapter that owns `page_number`.
    pub fn chapter_for_page(&self, page_number: usize) -> Option<&TocEntry> {
        self.toc.iter().find(|entry| entry.contains_page(page_number))
    }

    pub fn chapter_start(&self, chapter_id: u32) -> Option<usize> {
        self.toc
            .iter()
            .find(|entry| entry.chapter_id == chapter_id)
            .map(|entry| entry.start_page)
    }
}

fn front_matter_title(kind: PageKind) -> &'static str {
    match kind {
        PageKind::TableOfContents => TOC_TITLE,
        PageKind::Content | PageKind::Placeholder => "",
    }
}

const TOC_TITLE: &str = "Index";

/// Markup for the generated table-of-contents page.
pub fn table_of_contents_html(toc: &[TocEntry]) -> String {
    let mut html = String::with_capacity(64 + toc.len() * 64);
    html.push_str("<h2 class=\"toc-title\">");
    html.push_str(TOC_TITLE);
    html.push_str("</h2><ul class=\"toc\">");
    for entry in toc {
        html.push_str("<li><a href=\"#\" data-page=\"");
        html.push_str(&entry.start_page.to_string());
        html.push_str("\">");
        html.push_str(&escape_text(&entry.title));
        html.push_str("</a></li>");
    }
    html.push_str("</ul>");
    html
}

/// A paginated book: pages, their index and the profile that produced them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Book {
    pages: Vec<Page>,
    index: BookIndex,
    front_matter_pages: usize,
    profile: PaginationProfileId,
}

impl Book {
    /// Assemble a book from paginated chapter pages.
    ///
    /// With `table_of_contents`, a generated index page is placed first and
    /// every page is re-sequenced behind it.
    pub fn from_pages(
        chapters: &[Chapter],
        mut pages: Vec<Page>,
        table_of_contents: bool,
        profile: PaginationProfileId,
    ) -> Self {
        let front_matter_pages = if table_of_contents && !pages.is_empty() {
            // Start pages are relative to the final list, so index with the
            // front matter slot reserved before rendering the TOC.
            let mut with_front = Vec::with_capacity(pages.len() + 1);
            with_front.push(Page {
                source_chapter_id: 0,
                sequence_index: 0,
                is_chapter_start: false,
                kind: PageKind::TableOfContents,
                html: String::new(),
                word_count: 0,
                spans: Vec::new(),
            });
            with_front.append(&mut pages);
            pages = with_front;
            1
        } else {
            0
        };
        for (idx, page) in pages.iter_mut().enumerate() {
            page.sequence_index = idx;
        }

        let index = BookIndex::build(chapters, &pages, front_matter_pages);
        if front_matter_pages > 0 {
            if let Some(toc_page) = pages.first_mut() {
                toc_page.html = table_of_contents_html(index.toc());
            }
        }

        Self {
            pages,
            index,
            front_matter_pages,
            profile,
        }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Page by 1-based number.
    pub fn page(&self, page_number: usize) -> Option<&Page> {
        page_number
            .checked_sub(1)
            .and_then(|idx| self.pages.get(idx))
    }

    /// Index row and page for a 1-based number.
    pub fn entry(&self, page_number: usize) -> Option<(&PageIndexEntry, &Page)> {
        Some((self.index.entry(page_number)?, self.page(page_number)?))
    }

    pub fn index(&self) -> &BookIndex {
        &self.index
    }

    pub fn front_matter_pages(&self) -> usize {
        self.front_matter_pages
    }

    pub fn profile_id(&self) -> PaginationProfileId {
        self.profile
    }

    /// 1-based number of the page holding `location`.
    ///
    /// Falls back to the owning chapter's start page when the exact word is
    /// not found.
    pub fn locate_word(&self, location: WordLocation) -> Option<usize> {
        self.pages
            .iter()
            .find(|page| page.contains_word(location))
            .map(Page::page_number)
            .or_else(|| self.index.chapter_start(location.chapter_id))
    }
}

/// Paginate chapters and assemble them into a [`Book`].
#[derive(Clone, Debug)]
pub struct RenderEngine {
    opts: RenderEngineOptions,
    paginator: Paginator,
}

impl RenderEngine {
    pub fn new(opts: RenderEngineOptions) -> Self {
        Self {
            opts,
            paginator: Paginator::new(opts.pagination),
        }
    }

    pub fn options(&self) -> RenderEngineOptions {
        self.opts
    }

    /// Fingerprint of the settings that shape the page list.
    pub fn pagination_profile_id(&self) -> PaginationProfileId {
        let base = self.paginator.profile_id();
        let payload = format!("{}|toc={}", base.0, self.opts.table_of_contents);
        PaginationProfileId::from_bytes(payload.as_bytes())
    }

    pub fn assemble<M: Measurer + ?Sized>(&self, chapters: &[Chapter], measurer: &M) -> Book {
        let pages = self.paginator.paginate(chapters, measurer);
        let book = Book::from_pages(
            chapters,
            pages,
            self.opts.table_of_contents,
            self.pagination_profile_id(),
        );
        log::debug!(
            "assemble: {} chapters -> {} pages (front matter {})",
            chapters.len(),
            book.total_pages(),
            book.front_matter_pages()
        );
        book
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_layout::PaginationMode;

    fn quota_engine(words_per_page: usize, toc: bool) -> RenderEngine {
        RenderEngine::new(RenderEngineOptions {
            pagination: PaginationConfig {
                content_width: 400,
                content_height: 600,
                mode: PaginationMode::WordQuota { words_per_page },
            },
            table_of_contents: toc,
        })
    }

    fn words(count: usize) -> String {
        vec!["word"; count].join(" ")
    }

    fn chapters() -> Vec<Chapter> {
        vec![
            Chapter::new(1, "Arrival", [words(3)]),
            Chapter::new(2, "Storm & Sea", [words(3), words(3), words(3)]),
            Chapter::new(3, "Home", [words(2)]),
        ]
    }

    struct NoMeasure;

    impl Measurer for NoMeasure {
        fn measure(
            &self,
            _html: &str,
            _available_width: i32,
        ) -> Result<f32, crate::render_layout::MeasureError> {
            Ok(0.0)
        }
    }

    #[test]
    fn start_pages_accumulate_chapter_page_counts() {
        let book = quota_engine(3, false).assemble(&chapters(), &NoMeasure);
        assert_eq!(book.total_pages(), 5);
        let starts: Vec<(usize, usize)> = book
            .index()
            .toc()
            .iter()
            .map(|entry| (entry.start_page, entry.end_page()))
            .collect();
        assert_eq!(starts, vec![(1, 1), (2, 4), (5, 5)]);
        assert_eq!(
            book.index().chapter_for_page(3).map(|e| e.chapter_id),
            Some(2)
        );
        assert_eq!(book.index().toc()[1].page_count, 3);
    }

    #[test]
    fn table_of_contents_shifts_start_pages_and_links_them() {
        let book = quota_engine(3, true).assemble(&chapters(), &NoMeasure);
        assert_eq!(book.total_pages(), 6);
        assert_eq!(book.front_matter_pages(), 1);
        let toc_page = book.page(1).expect("toc page");
        assert_eq!(toc_page.kind, PageKind::TableOfContents);
        assert!(toc_page.html.contains(r#"data-page="3">Storm &amp; Sea</a>"#));
        assert_eq!(book.index().chapter_start(1), Some(2));
        assert_eq!(book.index().chapter_start(3), Some(6));
        for (idx, page) in book.pages().iter().enumerate() {
            assert_eq!(page.sequence_index, idx);
        }
        let (entry, _) = book.entry(1).expect("entry");
        assert_eq!(entry.chapter_title, "Index");
        assert_eq!(entry.chapter_id, 0);
    }

    #[test]
    fn page_index_entries_track_page_numbers() {
        let book = quota_engine(3, false).assemble(&chapters(), &NoMeasure);
        let (entry, page) = book.entry(4).expect("page 4");
        assert_eq!(entry.page_number, 4);
        assert_eq!(entry.chapter_title, "Storm & Sea");
        assert_eq!(entry.sequence_index, page.sequence_index);
        assert!(book.entry(0).is_none());
        assert!(book.entry(6).is_none());
    }

    #[test]
    fn locate_word_finds_page_or_chapter_start() {
        let book = quota_engine(3, false).assemble(&chapters(), &NoMeasure);
        let third_paragraph = WordLocation {
            chapter_id: 2,
            paragraph_index: 2,
            word_index: 1,
        };
        assert_eq!(book.locate_word(third_paragraph), Some(4));
        let missing = WordLocation {
            paragraph_index: 40,
            ..third_paragraph
        };
        assert_eq!(book.locate_word(missing), Some(2));
    }

    #[test]
    fn profile_id_changes_with_toc_option() {
        assert_ne!(
            quota_engine(3, false).pagination_profile_id(),
            quota_engine(3, true).pagination_profile_id()
        );
        assert_eq!(
            quota_engine(3, true).pagination_profile_id(),
            quota_engine(3, true).pagination_profile_id()
        );
    }

    #[test]
    fn empty_chapter_list_builds_empty_book() {
        let book = quota_engine(3, true).assemble(&[], &NoMeasure);
        assert!(book.is_empty());
        assert!(book.index().toc().is_empty());
    }
}
