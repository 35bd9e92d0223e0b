use core::fmt;
use core::ops::Range;

use flipbook::{escape_text, Chapter, FormattedParagraph};
use quick_xml::events::Event;

use crate::render_ir::{LayoutMode, Page, PageKind, PaginationProfileId, ParagraphSpan};

/// Words per page for [`PaginationMode::WordQuota`] when unspecified.
pub const DEFAULT_WORDS_PER_PAGE: usize = 250;

/// Vertical space, in px, reserved for page chrome (number, margins).
const PAGE_CHROME_RESERVE_PX: i32 = 80;

/// Rendered-height oracle for candidate page markup.
///
/// The paginator calls this once per word in [`PaginationMode::Measured`]
/// mode. Implementations must be deterministic for pagination to be
/// repeatable.
pub trait Measurer {
    /// Height in px of `html` laid out `available_width` px wide.
    fn measure(&self, html: &str, available_width: i32) -> Result<f32, MeasureError>;
}

/// Measurer failure. Pagination of the affected chapter falls back to a
/// single placeholder page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeasureError {
    message: String,
}

impl MeasureError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for MeasureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "measure failed: {}", self.message)
    }
}

impl std::error::Error for MeasureError {}

/// Page-break granularity. One mode applies to every chapter of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PaginationMode {
    /// Fill pages word by word up to the measured height budget.
    #[default]
    Measured,
    /// Fill pages with whole paragraphs up to a word quota.
    WordQuota { words_per_page: usize },
}

/// Page geometry and break policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PaginationConfig {
    /// Width available to page content, in px.
    pub content_width: i32,
    /// Height budget for page content, in px.
    pub content_height: i32,
    pub mode: PaginationMode,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self::for_viewport(1280, 800, LayoutMode::Spread)
    }
}

impl PaginationConfig {
    /// Page geometry for a viewport.
    ///
    /// A spread page is half the viewport wide, a single page the full width.
    /// Pages are 90% of the viewport tall, minus room for page chrome.
    pub fn for_viewport(viewport_width: u32, viewport_height: u32, layout: LayoutMode) -> Self {
        let width = i32::try_from(viewport_width).unwrap_or(i32::MAX);
        let height = i32::try_from(viewport_height).unwrap_or(i32::MAX);
        let page_width = match layout {
            LayoutMode::Single => width,
            LayoutMode::Spread => width / 2,
        };
        let page_height = height.saturating_mul(9) / 10 - PAGE_CHROME_RESERVE_PX;
        Self {
            content_width: page_width.max(1),
            content_height: page_height.max(1),
            mode: PaginationMode::Measured,
        }
    }

    pub fn with_word_quota(mut self, words_per_page: usize) -> Self {
        self.mode = PaginationMode::WordQuota {
            words_per_page: words_per_page.max(1),
        };
        self
    }

    pub fn size_budget(&self) -> f32 {
        self.content_height as f32
    }
}

/// Markup for a chapter heading.
pub fn chapter_heading(title: &str, continued: bool) -> String {
    let title = escape_text(title);
    if continued {
        format!("<h2 class=\"chapter-title cont\">{title} (cont.)</h2>")
    } else {
        format!("<h2 class=\"chapter-title\">{title}</h2>")
    }
}

fn paragraph_markup(
    out: &mut String,
    paragraph: Option<&FormattedParagraph>,
    words: Range<usize>,
) {
    out.push_str("<p>");
    if let Some(paragraph) = paragraph {
        paragraph.push_words(out, words);
    }
    out.push_str("</p>");
}

/// Greedy chapter paginator.
#[derive(Clone, Debug)]
pub struct Paginator {
    cfg: PaginationConfig,
}

impl Paginator {
    pub fn new(cfg: PaginationConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> PaginationConfig {
        self.cfg
    }

    /// Stable fingerprint for all pagination-affecting settings.
    pub fn profile_id(&self) -> PaginationProfileId {
        let payload = format!("{:?}", self.cfg);
        PaginationProfileId::from_bytes(payload.as_bytes())
    }

    /// Paginate `chapters` in order into one flat page list.
    ///
    /// `sequence_index` is the position in the returned list. A chapter whose
    /// measurement fails is replaced by a single placeholder page and the run
    /// continues with the next chapter.
    pub fn paginate<M: Measurer + ?Sized>(&self, chapters: &[Chapter], measurer: &M) -> Vec<Page> {
        let mut pages = Vec::with_capacity(chapters.len().saturating_mul(2));
        for chapter in chapters {
            match self.paginate_chapter(chapter, measurer) {
                Ok(chapter_pages) => {
                    log::debug!(
                        "paginate: chapter {} '{}' -> {} pages",
                        chapter.id,
                        chapter.title,
                        chapter_pages.len()
                    );
                    pages.extend(chapter_pages);
                }
                Err(err) => {
                    log::warn!(
                        "paginate: chapter {} '{}' fell back to placeholder: {}",
                        chapter.id,
                        chapter.title,
                        err
                    );
                    pages.push(placeholder_page(chapter, &err));
                }
            }
        }
        for (idx, page) in pages.iter_mut().enumerate() {
            page.sequence_index = idx;
        }
        pages
    }

    /// Paginate one chapter. Sequence indices are chapter-local.
    pub fn paginate_chapter<M: Measurer + ?Sized>(
        &self,
        chapter: &Chapter,
        measurer: &M,
    ) -> Result<Vec<Page>, MeasureError> {
        match self.cfg.mode {
            PaginationMode::Measured => self.paginate_measured(chapter, measurer),
            PaginationMode::WordQuota { words_per_page } => {
                Ok(paginate_word_quota(chapter, words_per_page.max(1)))
            }
        }
    }

    fn paginate_measured<M: Measurer + ?Sized>(
        &self,
        chapter: &Chapter,
        measurer: &M,
    ) -> Result<Vec<Page>, MeasureError> {
        let budget = self.cfg.size_budget();
        let width = self.cfg.content_width;
        let mut acc = PageAccumulator::new(chapter);

        for paragraph_index in 0..chapter.paragraphs.len() {
            let words = acc.paragraph_words(paragraph_index);
            acc.open_paragraph(paragraph_index, 0);

            if words == 0 {
                let height = measurer.measure(&acc.candidate(false), width)?;
                if height > budget && acc.has_words() {
                    acc.close_page(Some((paragraph_index, 0)));
                }
                acc.commit_open();
                continue;
            }

            for word_index in 0..words {
                loop {
                    let height = measurer.measure(&acc.candidate(true), width)?;
                    if height <= budget {
                        acc.push_words(1);
                        break;
                    }
                    if !acc.has_words() {
                        // Too tall even alone: the word gets a page to itself.
                        acc.push_words(1);
                        acc.close_page(Some((paragraph_index, word_index + 1)));
                        break;
                    }
                    acc.close_page(Some((paragraph_index, word_index)));
                }
            }
            acc.commit_open();
        }

        Ok(acc.finish())
    }
}

fn paginate_word_quota(chapter: &Chapter, words_per_page: usize) -> Vec<Page> {
    let mut acc = PageAccumulator::new(chapter);
    for paragraph_index in 0..chapter.paragraphs.len() {
        let words = acc.paragraph_words(paragraph_index);
        if acc.word_count + words > words_per_page && acc.has_content() {
            acc.close_page(None);
        }
        acc.open_paragraph(paragraph_index, 0);
        acc.push_words(words);
        acc.commit_open();
    }
    acc.finish()
}

fn placeholder_page(chapter: &Chapter, err: &MeasureError) -> Page {
    let mut html = chapter_heading(&chapter.title, false);
    html.push_str("<p class=\"placeholder\">This chapter could not be laid out (");
    html.push_str(&escape_text(err.message()));
    html.push_str(").</p>");
    Page {
        source_chapter_id: chapter.id,
        sequence_index: 0,
        is_chapter_start: true,
        kind: PageKind::Placeholder,
        html,
        word_count: 0,
        spans: Vec::new(),
    }
}

/// Paragraph fragment still being filled on the current page.
struct OpenFragment {
    paragraph_index: usize,
    word_start: usize,
    len: usize,
}

impl OpenFragment {
    fn words(&self) -> Range<usize> {
        self.word_start..self.word_start + self.len
    }
}

/// Builds the pages of one chapter.
struct PageAccumulator<'c> {
    chapter: &'c Chapter,
    /// Each paragraph formatted once, before it is cut into fragments.
    paragraphs: Vec<FormattedParagraph>,
    pages: Vec<Page>,
    /// Heading plus committed fragments of the current page.
    html: String,
    spans: Vec<ParagraphSpan>,
    word_count: usize,
    open: Option<OpenFragment>,
}

impl<'c> PageAccumulator<'c> {
    fn new(chapter: &'c Chapter) -> Self {
        Self {
            chapter,
            paragraphs: chapter
                .paragraphs
                .iter()
                .map(|paragraph| FormattedParagraph::new(paragraph))
                .collect(),
            pages: Vec::with_capacity(2),
            html: chapter_heading(&chapter.title, false),
            spans: Vec::with_capacity(4),
            word_count: 0,
            open: None,
        }
    }

    fn open_paragraph(&mut self, paragraph_index: usize, word_start: usize) {
        self.open = Some(OpenFragment {
            paragraph_index,
            word_start,
            len: 0,
        });
    }

    fn paragraph_words(&self, paragraph_index: usize) -> usize {
        self.paragraphs
            .get(paragraph_index)
            .map_or(0, FormattedParagraph::word_count)
    }

    fn open_words(&self) -> usize {
        self.open.as_ref().map_or(0, |open| open.len)
    }

    fn has_words(&self) -> bool {
        self.word_count + self.open_words() > 0
    }

    fn has_content(&self) -> bool {
        !self.spans.is_empty() || self.open_words() > 0
    }

    /// Current page markup, with the open fragment grown by one word when
    /// `extra_word` is set.
    fn candidate(&self, extra_word: bool) -> String {
        let mut out = String::with_capacity(self.html.len() + 256);
        out.push_str(&self.html);
        if let Some(open) = &self.open {
            let mut words = open.words();
            words.end += usize::from(extra_word);
            paragraph_markup(&mut out, self.paragraphs.get(open.paragraph_index), words);
        }
        out
    }

    fn push_words(&mut self, count: usize) {
        if let Some(open) = self.open.as_mut() {
            open.len += count;
        }
    }

    /// Move the open fragment into the committed page markup.
    ///
    /// An open fragment of an empty paragraph is committed as `<p></p>`; an
    /// emptied continuation fragment is dropped.
    fn commit_open(&mut self) {
        let Some(open) = self.open.take() else {
            return;
        };
        if open.len == 0 && open.word_start > 0 {
            return;
        }
        paragraph_markup(
            &mut self.html,
            self.paragraphs.get(open.paragraph_index),
            open.words(),
        );
        self.word_count += open.len;
        self.spans.push(ParagraphSpan {
            paragraph_index: open.paragraph_index,
            word_start: open.word_start,
            word_end: open.word_start + open.len,
        });
    }

    /// Emit the current page and start a continuation page.
    ///
    /// `resume` reopens the paragraph being split at the given word.
    fn close_page(&mut self, resume: Option<(usize, usize)>) {
        if self.open_words() > 0 {
            self.commit_open();
        } else {
            self.open = None;
        }
        let html = core::mem::replace(&mut self.html, chapter_heading(&self.chapter.title, true));
        let spans = core::mem::take(&mut self.spans);
        let page = Page {
            source_chapter_id: self.chapter.id,
            sequence_index: self.pages.len(),
            is_chapter_start: self.pages.is_empty(),
            kind: PageKind::Content,
            html,
            word_count: self.word_count,
            spans,
        };
        self.pages.push(page);
        self.word_count = 0;
        if let Some((paragraph_index, word_start)) = resume {
            self.open_paragraph(paragraph_index, word_start);
        }
    }

    fn finish(mut self) -> Vec<Page> {
        self.commit_open();
        if self.has_content() || self.pages.is_empty() {
            self.close_page(None);
        }
        self.pages
    }
}

/// Deterministic measurer that estimates height from character counts.
///
/// The candidate markup is parsed block by block (`h1`-`h6`, `p`, `li`); each
/// block takes `ceil(chars / chars_per_line)` lines plus a trailing gap.
/// Like a browser, it tolerates crossed or stray inline end tags, which
/// textual delimiter formatting produces for overlapping pairs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeuristicMeasurer {
    pub avg_char_width_px: f32,
    pub line_height_px: f32,
    pub heading_line_height_px: f32,
    pub block_gap_px: f32,
}

impl Default for HeuristicMeasurer {
    fn default() -> Self {
        Self {
            avg_char_width_px: 8.5,
            line_height_px: 26.0,
            heading_line_height_px: 34.0,
            block_gap_px: 14.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BlockKind {
    Heading,
    Body,
}

impl HeuristicMeasurer {
    fn chars_per_line(&self, available_width: i32) -> usize {
        let per_line = available_width as f32 / self.avg_char_width_px.max(0.1);
        (per_line.floor() as usize).max(1)
    }

    fn block_height(&self, kind: BlockKind, chars: usize, chars_per_line: usize) -> f32 {
        let lines = chars.div_ceil(chars_per_line).max(1);
        let line_height = match kind {
            BlockKind::Heading => self.heading_line_height_px,
            BlockKind::Body => self.line_height_px,
        };
        lines as f32 * line_height + self.block_gap_px
    }
}

fn block_kind(name: &[u8]) -> Option<BlockKind> {
    match name {
        b"h1" | b"h2" | b"h3" | b"h4" | b"h5" | b"h6" => Some(BlockKind::Heading),
        b"p" | b"li" => Some(BlockKind::Body),
        _ => None,
    }
}

impl Measurer for HeuristicMeasurer {
    fn measure(&self, html: &str, available_width: i32) -> Result<f32, MeasureError> {
        if available_width <= 0 {
            return Err(MeasureError::new(format!(
                "no layout width ({available_width}px)"
            )));
        }
        let chars_per_line = self.chars_per_line(available_width);
        let mut reader = quick_xml::reader::Reader::from_str(html);
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        let mut height = 0.0f32;
        let mut block: Option<(BlockKind, usize)> = None;
        let mut loose_chars = 0usize;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    if let Some(kind) = block_kind(e.name().as_ref()) {
                        block = Some((kind, 0));
                    }
                }
                Ok(Event::Empty(e)) => {
                    if let Some(kind) = block_kind(e.name().as_ref()) {
                        height += self.block_height(kind, 0, chars_per_line);
                    }
                }
                // Any block end tag closes the open block, matched or not.
                Ok(Event::End(e)) => {
                    if block_kind(e.name().as_ref()).is_some() {
                        if let Some((kind, chars)) = block.take() {
                            height += self.block_height(kind, chars, chars_per_line);
                        }
                    }
                }
                Ok(Event::Text(e)) => {
                    let text = e
                        .decode()
                        .map_err(|err| MeasureError::new(format!("text decode: {err:?}")))?;
                    let chars = text.chars().count();
                    match block.as_mut() {
                        Some((_, count)) => *count += chars,
                        None => loose_chars += text.trim().chars().count(),
                    }
                }
                Ok(Event::GeneralRef(_)) => match block.as_mut() {
                    Some((_, count)) => *count += 1,
                    None => loose_chars += 1,
                },
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => {
                    return Err(MeasureError::new(format!(
                        "unparseable markup at {}: {err}",
                        reader.buffer_position()
                    )))
                }
            }
        }

        if let Some((kind, chars)) = block {
            height += self.block_height(kind, chars, chars_per_line);
        }
        if loose_chars > 0 {
            height += self.block_height(BlockKind::Body, loose_chars, chars_per_line);
        }
        Ok(height)
    }
}
