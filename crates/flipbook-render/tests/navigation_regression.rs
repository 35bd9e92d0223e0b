use flipbook::Chapter;
use flipbook_render::{
    Book, Direction, GestureResponse, HeuristicMeasurer, LayoutMode, NavigationState,
    PaginationConfig, Reader, ReaderConfig, RenderEngine, RenderEngineOptions, TouchPoint,
};

fn book_with_chapter_pages(chapter: &Chapter, words_per_page: usize, toc: bool) -> Book {
    let engine = RenderEngine::new(RenderEngineOptions {
        pagination: PaginationConfig::default().with_word_quota(words_per_page),
        table_of_contents: toc,
    });
    engine.assemble(std::slice::from_ref(chapter), &HeuristicMeasurer::default())
}

/// One-word paragraphs, one per page.
fn book_with_pages(total: usize) -> Book {
    let paragraphs: Vec<String> = (1..=total).map(|n| format!("page{n}")).collect();
    book_with_chapter_pages(&Chapter::new(1, "Pages", paragraphs), 1, false)
}

fn open(total: usize, mode: LayoutMode) -> Reader {
    Reader::new(book_with_pages(total), mode, ReaderConfig::default()).expect("non-empty book")
}

fn turn_and_settle(reader: &mut Reader, direction: Direction) -> bool {
    match reader.turn_page(direction) {
        Some(transition) => {
            assert!(reader.finish_transition(transition.id));
            true
        }
        None => false,
    }
}

#[test]
fn spread_of_seven_pages_stops_on_the_last_left_page() {
    let mut reader = open(7, LayoutMode::Spread);
    assert_eq!(reader.cursor(), 1);

    let mut cursors = Vec::new();
    for _ in 0..4 {
        turn_and_settle(&mut reader, Direction::Next);
        cursors.push(reader.cursor());
    }
    assert_eq!(cursors, vec![3, 5, 7, 7]);
    assert!(!reader.next_enabled());

    let before = reader.state();
    assert!(reader.turn_page(Direction::Next).is_none());
    assert_eq!(reader.state(), before);

    let view = reader.projection();
    assert_eq!(view.entries.len(), 1);
    assert_eq!(view.left().map(|e| e.page_number), Some(7));
}

#[test]
fn back_to_back_turns_mutate_the_cursor_once() {
    for mode in [LayoutMode::Single, LayoutMode::Spread] {
        let mut reader = open(9, mode);
        let first = reader.turn_page(Direction::Next);
        let second = reader.turn_page(Direction::Next);
        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(reader.cursor(), 1 + mode.step());
        assert!(reader.is_animating());
    }
}

#[test]
fn failed_boundary_checks_leave_state_untouched() {
    for total in 1..=9 {
        for mode in [LayoutMode::Single, LayoutMode::Spread] {
            let mut reader = open(total, mode);
            for target in 1..=total {
                if let Some(t) = reader.jump_to_page(target) {
                    assert!(reader.finish_transition(t.id));
                }
                let state = reader.state();
                assert!(state.cursor >= 1 && state.cursor <= total);
                if mode == LayoutMode::Spread {
                    assert_eq!(state.cursor % 2, 1, "spread cursor must be odd");
                }
                for direction in [Direction::Next, Direction::Prev] {
                    let enabled = match direction {
                        Direction::Next => reader.next_enabled(),
                        Direction::Prev => reader.prev_enabled(),
                    };
                    if enabled {
                        continue;
                    }
                    assert!(reader.turn_page(direction).is_none());
                    assert_eq!(
                        reader.state(),
                        NavigationState {
                            is_animating: false,
                            ..state
                        }
                    );
                }
            }
        }
    }
}

#[test]
fn jumps_normalize_and_reject_out_of_range() {
    let mut reader = open(10, LayoutMode::Spread);
    let jump = reader.jump_to_page(8).expect("jump accepted");
    assert_eq!((jump.from, jump.to), (1, 7));
    assert!(reader.finish_transition(jump.id));

    assert!(reader.jump_to_page(7).is_none());
    assert!(reader.jump_to_page(0).is_none());
    assert!(reader.jump_to_page(11).is_none());
    assert_eq!(reader.cursor(), 7);

    let jump = reader.jump_to_page(10).expect("jump accepted");
    assert_eq!(jump.to, 9);
}

#[test]
fn stale_completion_does_not_end_a_newer_transition() {
    let mut reader = open(5, LayoutMode::Single);
    let first = reader.turn_page(Direction::Next).expect("turn accepted");
    assert!(reader.finish_transition(first.id));
    let second = reader.turn_page(Direction::Next).expect("turn accepted");
    assert!(!reader.finish_transition(first.id));
    assert!(reader.is_animating());
    assert!(reader.finish_transition(second.id));
    assert!(!reader.is_animating());
}

#[test]
fn layout_flip_rounds_down_without_animating() {
    let mut reader = open(8, LayoutMode::Single);
    let jump = reader.jump_to_page(6).expect("jump accepted");
    assert!(reader.finish_transition(jump.id));
    assert!(reader.set_layout_mode(LayoutMode::for_viewport_width(1024)));
    assert_eq!(reader.layout_mode(), LayoutMode::Spread);
    assert_eq!(reader.cursor(), 5);
    assert!(!reader.is_animating());
}

#[test]
fn reflow_keeps_the_first_visible_word() {
    let chapter = Chapter::new(
        1,
        "Reflow",
        (0..10).map(|i| format!("para{i}")).collect::<Vec<_>>(),
    );
    let mut reader = Reader::new(
        book_with_chapter_pages(&chapter, 1, false),
        LayoutMode::Single,
        ReaderConfig::default(),
    )
    .expect("non-empty book");
    let jump = reader.jump_to_page(7).expect("jump accepted");
    assert!(reader.finish_transition(jump.id));

    // Two paragraphs per page: "para6" now lives on page 4.
    assert!(reader.replace_book(book_with_chapter_pages(&chapter, 2, false)));
    assert_eq!(reader.total_pages(), 5);
    assert_eq!(reader.cursor(), 4);

    // With a contents page in front, everything shifts by one.
    assert!(reader.replace_book(book_with_chapter_pages(&chapter, 2, true)));
    assert_eq!(reader.cursor(), 5);
    assert_eq!(reader.book().index().chapter_start(1), Some(2));
}

#[test]
fn reflow_is_refused_mid_transition() {
    let mut reader = open(4, LayoutMode::Single);
    let turn = reader.turn_page(Direction::Next).expect("turn accepted");
    assert!(!reader.replace_book(book_with_pages(2)));
    assert_eq!(reader.total_pages(), 4);
    assert!(reader.finish_transition(turn.id));
    assert!(reader.replace_book(book_with_pages(1)));
    assert_eq!(reader.cursor(), 1);
}

#[test]
fn leftward_swipe_turns_to_the_next_page() {
    let mut reader = open(3, LayoutMode::Single);
    assert!(reader.touch_start(TouchPoint::new(300.0, 200.0)));
    let feedback = reader
        .touch_move(TouchPoint::new(200.0, 205.0), 375.0)
        .expect("horizontal drag gives feedback");
    assert!(feedback.translate_x_px < 0.0);
    match reader.touch_end(TouchPoint::new(100.0, 210.0)) {
        GestureResponse::Turned(t) => assert_eq!((t.from, t.to), (1, 2)),
        GestureResponse::Reset => panic!("swipe should navigate"),
    }
}

#[test]
fn cancelled_drag_only_resets() {
    let mut reader = open(3, LayoutMode::Single);
    assert!(reader.touch_start(TouchPoint::new(300.0, 200.0)));
    assert_eq!(reader.touch_cancel(), GestureResponse::Reset);
    assert_eq!(
        reader.touch_end(TouchPoint::new(100.0, 200.0)),
        GestureResponse::Reset
    );
    assert_eq!(reader.cursor(), 1);
    assert!(!reader.is_animating());
}

#[test]
fn swipe_at_the_last_page_resets() {
    let mut reader = open(1, LayoutMode::Single);
    assert!(reader.touch_start(TouchPoint::new(300.0, 0.0)));
    assert_eq!(
        reader.touch_end(TouchPoint::new(0.0, 0.0)),
        GestureResponse::Reset
    );
}

#[test]
fn progress_tracks_the_cursor() {
    let mut reader = open(8, LayoutMode::Spread);
    assert_eq!(reader.progress_percent(), 13);
    let jump = reader.jump_to_page(8).expect("jump accepted");
    assert!(reader.finish_transition(jump.id));
    assert_eq!(reader.progress_percent(), 88);
}
