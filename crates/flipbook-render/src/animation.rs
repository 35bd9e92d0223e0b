//! Timer-driven transitions on a tokio runtime.
//!
//! Each helper starts a transition, waits out its duration and closes it
//! through a [`TransitionGuard`], so dropping the future early still returns
//! the reader to idle.

use core::cell::RefCell;

use crate::gesture::Direction;
use crate::reader::{Reader, Transition, TransitionGuard};

async fn run(reader: &RefCell<Reader>, transition: Transition) -> Transition {
    let guard = TransitionGuard::new(&reader.borrow(), transition.id);
    tokio::time::sleep(transition.duration).await;
    guard.release();
    transition
}

/// Turn a page and wait for the transition window to close.
///
/// Returns `None` without waiting when the turn is rejected.
pub async fn animate_turn(reader: &RefCell<Reader>, direction: Direction) -> Option<Transition> {
    let transition = reader.borrow_mut().turn_page(direction)?;
    Some(run(reader, transition).await)
}

/// Jump to `page` and wait for the transition window to close.
pub async fn animate_jump(reader: &RefCell<Reader>, page: usize) -> Option<Transition> {
    let transition = reader.borrow_mut().jump_to_page(page)?;
    Some(run(reader, transition).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_engine::{RenderEngine, RenderEngineOptions};
    use crate::render_ir::LayoutMode;
    use crate::render_layout::{HeuristicMeasurer, PaginationConfig};
    use crate::reader::ReaderConfig;
    use core::time::Duration;
    use flipbook::Chapter;

    fn reader(pages: usize, mode: LayoutMode) -> RefCell<Reader> {
        let engine = RenderEngine::new(RenderEngineOptions {
            pagination: PaginationConfig::default().with_word_quota(1),
            table_of_contents: false,
        });
        let paragraphs: Vec<String> = (0..pages).map(|i| format!("w{i}")).collect();
        let book = engine.assemble(
            &[Chapter::new(1, "Timed", paragraphs)],
            &HeuristicMeasurer::default(),
        );
        RefCell::new(Reader::new(book, mode, ReaderConfig::default()).expect("non-empty book"))
    }

    #[tokio::test(start_paused = true)]
    async fn turn_holds_reader_busy_for_its_duration() {
        let cell = reader(4, LayoutMode::Single);
        let started = tokio::time::Instant::now();
        let (first, second) = tokio::join!(
            animate_turn(&cell, Direction::Next),
            animate_turn(&cell, Direction::Next)
        );
        assert_eq!(first.map(|t| t.to), Some(2));
        assert!(second.is_none());
        assert!(started.elapsed() >= Duration::from_millis(400));
        assert!(!cell.borrow().is_animating());
        assert_eq!(cell.borrow().cursor(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_animation_still_releases_reader() {
        let cell = reader(8, LayoutMode::Spread);
        let outcome =
            tokio::time::timeout(Duration::from_millis(100), animate_jump(&cell, 6)).await;
        assert!(outcome.is_err());
        assert!(!cell.borrow().is_animating());
        assert_eq!(cell.borrow().cursor(), 5);

        let back = animate_turn(&cell, Direction::Prev).await;
        assert_eq!(back.map(|t| (t.from, t.to)), Some((5, 3)));
    }
}
