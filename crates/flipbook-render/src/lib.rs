//! Pagination, book index and page-turn navigation for `flipbook`.

#![cfg_attr(
    not(test),
    deny(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

#[cfg(feature = "async")]
mod animation;
mod gesture;
mod reader;
mod render_engine;
mod render_ir;
mod render_layout;

#[cfg(feature = "async")]
pub use animation::{animate_jump, animate_turn};
pub use gesture::{
    classify as classify_gesture, Direction, DragFeedback, GestureConfig, GestureOutcome,
    GestureTracker, TouchPoint,
};
pub use reader::{
    GestureResponse, InputEvent, NavKey, NavigationState, Reader, ReaderConfig, Transition,
    TransitionGuard, TransitionId, TransitionKind,
};
pub use render_engine::{
    table_of_contents_html, Book, BookIndex, PageIndexEntry, RenderEngine, RenderEngineOptions,
    TocEntry,
};
pub use render_ir::{
    LayoutMode, Page, PageKind, PaginationProfileId, ParagraphSpan, ProjectionEntry,
    ProjectionView, WordLocation,
};
pub use render_layout::{
    chapter_heading, HeuristicMeasurer, MeasureError, Measurer, PaginationConfig, PaginationMode,
    Paginator, DEFAULT_WORDS_PER_PAGE,
};
