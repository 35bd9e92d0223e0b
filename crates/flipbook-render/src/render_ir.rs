use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// What a page holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageKind {
    /// Paginated chapter text.
    Content,
    /// Stand-in for a chapter whose pagination failed.
    Placeholder,
    /// Generated table of contents placed before the chapters.
    TableOfContents,
}

/// Fragment of one source paragraph placed on a page.
///
/// `word_start..word_end` indexes the paragraph's whitespace-separated words.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphSpan {
    pub paragraph_index: usize,
    pub word_start: usize,
    pub word_end: usize,
}

impl ParagraphSpan {
    pub fn word_range(&self) -> core::ops::Range<usize> {
        self.word_start..self.word_end
    }

    pub fn len(&self) -> usize {
        self.word_end.saturating_sub(self.word_start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Position of a single word in the source text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WordLocation {
    pub chapter_id: u32,
    pub paragraph_index: usize,
    pub word_index: usize,
}

/// One renderable page of the book.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Chapter the content came from; `0` for generated front matter.
    pub source_chapter_id: u32,
    /// 0-based position in the final page list.
    pub sequence_index: usize,
    /// First page of its chapter.
    pub is_chapter_start: bool,
    pub kind: PageKind,
    /// Page markup (heading plus `<p>` fragments).
    pub html: String,
    pub word_count: usize,
    /// Source paragraph fragments in page order.
    pub spans: Vec<ParagraphSpan>,
}

impl Page {
    /// 1-based display number.
    pub fn page_number(&self) -> usize {
        self.sequence_index + 1
    }

    /// Location of the first word on this page, if it carries any text.
    pub fn first_word(&self) -> Option<WordLocation> {
        self.spans
            .iter()
            .find(|span| !span.is_empty())
            .map(|span| WordLocation {
                chapter_id: self.source_chapter_id,
                paragraph_index: span.paragraph_index,
                word_index: span.word_start,
            })
    }

    pub fn contains_word(&self, location: WordLocation) -> bool {
        self.source_chapter_id == location.chapter_id
            && self.spans.iter().any(|span| {
                span.paragraph_index == location.paragraph_index
                    && span.word_range().contains(&location.word_index)
            })
    }
}

/// Stable fingerprint of every setting that affects pagination.
///
/// Two books paginated under the same profile id have identical page breaks
/// for identical chapters, so hosts can skip re-pagination on no-op resizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaginationProfileId(pub u32);

impl PaginationProfileId {
    /// Build a deterministic profile id from arbitrary payload bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(crc32fast::hash(bytes))
    }
}

/// Visible page arrangement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayoutMode {
    /// One page at a time (narrow viewports).
    Single,
    /// Two facing pages; the left page number is always odd.
    #[default]
    Spread,
}

impl LayoutMode {
    /// Widest viewport, in CSS px, that still uses the single-page layout.
    pub const SINGLE_PAGE_MAX_WIDTH: u32 = 768;

    pub fn for_viewport_width(width: u32) -> Self {
        if width <= Self::SINGLE_PAGE_MAX_WIDTH {
            Self::Single
        } else {
            Self::Spread
        }
    }

    /// Pages per cursor step.
    pub fn step(self) -> usize {
        match self {
            Self::Single => 1,
            Self::Spread => 2,
        }
    }
}

/// A visible page: its 1-based number and markup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProjectionEntry<'a> {
    pub page_number: usize,
    pub html: &'a str,
}

/// What a renderer should paint for the current cursor position.
///
/// Holds one entry in single layout, and one or two in spread layout (the
/// right page is absent past the end of the book).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectionView<'a> {
    pub mode: LayoutMode,
    pub entries: SmallVec<[ProjectionEntry<'a>; 2]>,
}

impl<'a> ProjectionView<'a> {
    pub fn left(&self) -> Option<&ProjectionEntry<'a>> {
        self.entries.first()
    }

    pub fn right(&self) -> Option<&ProjectionEntry<'a>> {
        match self.mode {
            LayoutMode::Single => None,
            LayoutMode::Spread => self.entries.get(1),
        }
    }
}
