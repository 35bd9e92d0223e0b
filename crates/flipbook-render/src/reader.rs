use core::cell::Cell;
use core::time::Duration;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::gesture::{
    Direction, DragFeedback, GestureConfig, GestureOutcome, GestureTracker, TouchPoint,
};
use crate::render_engine::Book;
use crate::render_ir::{LayoutMode, ProjectionEntry, ProjectionView};

/// Reader timing and gesture settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReaderConfig {
    /// Transition window for single-page turns.
    pub single_turn: Duration,
    /// Transition window for spread turns.
    pub spread_turn: Duration,
    pub gesture: GestureConfig,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            single_turn: Duration::from_millis(400),
            spread_turn: Duration::from_millis(800),
            gesture: GestureConfig::default(),
        }
    }
}

impl ReaderConfig {
    pub fn turn_duration(&self, mode: LayoutMode) -> Duration {
        match mode {
            LayoutMode::Single => self.single_turn,
            LayoutMode::Spread => self.spread_turn,
        }
    }
}

/// Snapshot of the navigation state.
///
/// `cursor` is a 1-based page number and always names a renderable page. In
/// spread layout it is the odd left page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NavigationState {
    pub cursor: usize,
    pub layout_mode: LayoutMode,
    pub is_animating: bool,
}

/// Ticket for one animated cursor change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransitionId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionKind {
    Turn(Direction),
    Jump,
}

/// An accepted navigation. The reader stays busy until
/// [`Reader::finish_transition`] is called with `id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub id: TransitionId,
    pub kind: TransitionKind,
    pub from: usize,
    pub to: usize,
    /// How long the host should animate before finishing.
    pub duration: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavKey {
    ArrowLeft,
    ArrowRight,
}

/// Discrete input relayed by a renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    NextButton,
    PrevButton,
    Key(NavKey),
    /// Table-of-contents link to a 1-based page.
    TocLink { page: usize },
}

/// Result of a finished touch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureResponse {
    Turned(Transition),
    /// No navigation happened; drop any drag feedback.
    Reset,
}

/// The open transition, if any. Shared with [`TransitionGuard`]s so a guard
/// can close it without borrowing the reader.
type TransitionWindow = Rc<Cell<Option<TransitionId>>>;

/// Close `window` if `id` is the open transition.
fn close_window(window: &Cell<Option<TransitionId>>, id: TransitionId) -> bool {
    if window.get() != Some(id) {
        log::debug!("reader: ignoring stale completion {}", id.0);
        return false;
    }
    window.set(None);
    true
}

/// Page-turn state machine over a paginated [`Book`].
///
/// Navigation is reject-on-busy: while a transition is open every
/// navigating call returns `None`/`false` and changes nothing.
#[derive(Debug)]
pub struct Reader {
    book: Book,
    cursor: usize,
    layout_mode: LayoutMode,
    config: ReaderConfig,
    gestures: GestureTracker,
    window: TransitionWindow,
    next_transition_id: u64,
}

impl Reader {
    /// Open `book` at its first page. Returns `None` for an empty book.
    pub fn new(book: Book, layout_mode: LayoutMode, config: ReaderConfig) -> Option<Self> {
        if book.is_empty() {
            log::debug!("reader: refusing empty book");
            return None;
        }
        Some(Self {
            book,
            cursor: 1,
            layout_mode,
            gestures: GestureTracker::new(config.gesture),
            config,
            window: Rc::new(Cell::new(None)),
            next_transition_id: 1,
        })
    }

    pub fn book(&self) -> &Book {
        &self.book
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn state(&self) -> NavigationState {
        NavigationState {
            cursor: self.cursor,
            layout_mode: self.layout_mode,
            is_animating: self.is_animating(),
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn layout_mode(&self) -> LayoutMode {
        self.layout_mode
    }

    pub fn is_animating(&self) -> bool {
        self.window.get().is_some()
    }

    pub fn total_pages(&self) -> usize {
        self.book.total_pages()
    }

    /// Round `page` down to a valid cursor for the current layout.
    fn align(&self, page: usize) -> usize {
        let page = page.clamp(1, self.total_pages());
        match self.layout_mode {
            LayoutMode::Single => page,
            LayoutMode::Spread if page % 2 == 0 => page - 1,
            LayoutMode::Spread => page,
        }
    }

    pub fn next_enabled(&self) -> bool {
        let step = self.layout_mode.step();
        self.cursor + step <= self.total_pages()
    }

    pub fn prev_enabled(&self) -> bool {
        let step = self.layout_mode.step();
        self.cursor > step
    }

    fn begin(&mut self, kind: TransitionKind, to: usize) -> Transition {
        let id = TransitionId(self.next_transition_id);
        self.next_transition_id += 1;
        let transition = Transition {
            id,
            kind,
            from: self.cursor,
            to,
            duration: self.config.turn_duration(self.layout_mode),
        };
        self.cursor = to;
        self.window.set(Some(id));
        log::debug!(
            "reader: transition {} {:?} {} -> {}",
            id.0,
            kind,
            transition.from,
            to
        );
        transition
    }

    /// Turn one step (one page, or one spread) in `direction`.
    pub fn turn_page(&mut self, direction: Direction) -> Option<Transition> {
        if self.is_animating() {
            log::debug!("reader: turn {direction:?} rejected, transition in progress");
            return None;
        }
        let step = self.layout_mode.step();
        let target = match direction {
            Direction::Next if self.next_enabled() => self.cursor + step,
            Direction::Prev if self.prev_enabled() => self.cursor - step,
            _ => {
                log::debug!(
                    "reader: turn {direction:?} rejected at boundary (page {} of {})",
                    self.cursor,
                    self.total_pages()
                );
                return None;
            }
        };
        Some(self.begin(TransitionKind::Turn(direction), target))
    }

    /// Jump to the spread or page holding 1-based `page`.
    pub fn jump_to_page(&mut self, page: usize) -> Option<Transition> {
        if self.is_animating() {
            log::debug!("reader: jump to {page} rejected, transition in progress");
            return None;
        }
        if page < 1 || page > self.total_pages() {
            log::debug!(
                "reader: jump to {page} rejected, book has {} pages",
                self.total_pages()
            );
            return None;
        }
        let target = self.align(page);
        if target == self.cursor {
            return None;
        }
        Some(self.begin(TransitionKind::Jump, target))
    }

    /// Close the transition `id`. Returns `false` for stale or repeated ids.
    pub fn finish_transition(&mut self, id: TransitionId) -> bool {
        close_window(&self.window, id)
    }

    /// Switch layouts while idle, rounding the cursor down to a valid page.
    pub fn set_layout_mode(&mut self, mode: LayoutMode) -> bool {
        if self.is_animating() {
            log::debug!("reader: layout change to {mode:?} deferred, transition in progress");
            return false;
        }
        self.layout_mode = mode;
        self.cursor = self.align(self.cursor);
        true
    }

    /// Swap in a re-paginated book while idle, keeping the reading position.
    ///
    /// The new cursor is the page holding the first word of the current page,
    /// else the start of the current chapter, else the current page number
    /// clamped to the new length.
    pub fn replace_book(&mut self, book: Book) -> bool {
        if self.is_animating() || book.is_empty() {
            return false;
        }
        let anchor_page = self.book.page(self.cursor);
        let target = anchor_page
            .and_then(|page| page.first_word())
            .and_then(|word| book.locate_word(word))
            .or_else(|| {
                anchor_page
                    .filter(|page| page.source_chapter_id != 0)
                    .and_then(|page| book.index().chapter_start(page.source_chapter_id))
            })
            .unwrap_or(self.cursor);
        log::debug!(
            "reader: reflow {} -> {} pages, cursor {} -> {}",
            self.total_pages(),
            book.total_pages(),
            self.cursor,
            target
        );
        self.book = book;
        self.cursor = self.align(target);
        true
    }

    /// Visible pages for the current cursor.
    pub fn projection(&self) -> ProjectionView<'_> {
        let mut entries: SmallVec<[ProjectionEntry<'_>; 2]> = SmallVec::new();
        let visible = self.layout_mode.step();
        for page_number in self.cursor..self.cursor + visible {
            if let Some(page) = self.book.page(page_number) {
                entries.push(ProjectionEntry {
                    page_number,
                    html: &page.html,
                });
            }
        }
        ProjectionView {
            mode: self.layout_mode,
            entries,
        }
    }

    /// Reading progress, `round(cursor / total * 100)`.
    pub fn progress_percent(&self) -> u8 {
        let total = self.total_pages().max(1);
        let percent = (self.cursor as f64 / total as f64 * 100.0).round();
        percent.clamp(0.0, 100.0) as u8
    }

    pub fn handle_input(&mut self, event: InputEvent) -> Option<Transition> {
        match event {
            InputEvent::NextButton | InputEvent::Key(NavKey::ArrowRight) => {
                self.turn_page(Direction::Next)
            }
            InputEvent::PrevButton | InputEvent::Key(NavKey::ArrowLeft) => {
                self.turn_page(Direction::Prev)
            }
            InputEvent::TocLink { page } => self.jump_to_page(page),
        }
    }

    /// Start tracking a touch. Ignored while a transition is open.
    pub fn touch_start(&mut self, point: TouchPoint) -> bool {
        if self.is_animating() {
            return false;
        }
        self.gestures.begin(point);
        true
    }

    pub fn touch_move(&self, point: TouchPoint, viewport_width: f32) -> Option<DragFeedback> {
        self.gestures.drag(point, viewport_width)
    }

    pub fn touch_end(&mut self, point: TouchPoint) -> GestureResponse {
        match self.gestures.end(point) {
            GestureOutcome::Navigate(direction) => match self.turn_page(direction) {
                Some(transition) => GestureResponse::Turned(transition),
                None => GestureResponse::Reset,
            },
            GestureOutcome::Reset => GestureResponse::Reset,
        }
    }

    pub fn touch_cancel(&mut self) -> GestureResponse {
        self.gestures.cancel();
        GestureResponse::Reset
    }
}

/// Closes a transition when dropped.
///
/// Hold one across the host's animation so the reader returns to idle even
/// if the animation errors out or its future is dropped. The guard shares
/// the reader's transition window, so it releases even while the reader
/// itself is borrowed.
#[must_use = "dropping the guard finishes the transition immediately"]
#[derive(Debug)]
pub struct TransitionGuard {
    window: TransitionWindow,
    id: TransitionId,
    released: bool,
}

impl TransitionGuard {
    pub fn new(reader: &Reader, id: TransitionId) -> Self {
        Self {
            window: Rc::clone(&reader.window),
            id,
            released: false,
        }
    }

    pub fn id(&self) -> TransitionId {
        self.id
    }

    /// Finish the transition now.
    pub fn release(mut self) -> bool {
        self.finish()
    }

    fn finish(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        close_window(&self.window, self.id)
    }
}

impl Drop for TransitionGuard {
    fn drop(&mut self) {
        self.finish();
    }
}
