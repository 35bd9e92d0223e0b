mod common;

use common::fixtures::{temp_root, write_sample_site};
use flipbook::{load_book, CachingLoader, ContentLoader, DirectoryLoader};
use flipbook_render::{
    Direction, HeuristicMeasurer, LayoutMode, PageKind, PaginationConfig, Reader, ReaderConfig,
    RenderEngine, RenderEngineOptions, DEFAULT_WORDS_PER_PAGE,
};

#[test]
fn site_loads_paginates_and_reads_end_to_end() {
    let root = temp_root("flow");
    write_sample_site(&root);

    let mut loader = CachingLoader::new(DirectoryLoader::new(&root));
    let book = load_book(&mut loader);
    assert!(!book.is_fallback());
    assert_eq!(book.metadata.title, "The Lantern Keeper");
    assert_eq!(book.chapters.len(), 3);
    assert_eq!(book.warnings.len(), 1);
    assert_eq!(book.chapters[2].title, "Chapter 3");
    assert!(book.chapters[2].paragraphs[0].starts_with("Content could not be loaded for Chapter 3"));

    let engine = RenderEngine::new(
        RenderEngineOptions::for_viewport(390, 780, LayoutMode::Single).with_table_of_contents(true),
    );
    let paginated = engine.assemble(&book.chapters, &HeuristicMeasurer::default());
    assert_eq!(paginated.page(1).map(|p| p.kind), Some(PageKind::TableOfContents));
    let toc = paginated.index().toc();
    assert_eq!(toc.len(), 3);
    assert_eq!(toc[0].start_page, 2);
    assert!(toc[1].page_count >= 2, "long chapter should span pages");
    assert_eq!(toc[2].end_page(), paginated.total_pages());

    let first = paginated.page(2).expect("first chapter page");
    assert!(first
        .html
        .contains(r#"<span class="scene">Dawn.</span> The keeper climbed the <span class="dialogue">long</span> stair."#));

    let mut reader = Reader::new(paginated, LayoutMode::Single, ReaderConfig::default())
        .expect("non-empty book");
    let toc_target = toc_target_for(&reader, 3);
    let jump = reader.jump_to_page(toc_target).expect("toc jump accepted");
    assert!(reader.finish_transition(jump.id));
    assert_eq!(reader.cursor(), toc_target);
    while let Some(turn) = reader.turn_page(Direction::Next) {
        assert!(reader.finish_transition(turn.id));
    }
    assert_eq!(reader.cursor(), reader.total_pages());
    assert!(!reader.next_enabled());
    assert!(reader.turn_page(Direction::Next).is_none());
    assert_eq!(reader.progress_percent(), 100);
}

fn toc_target_for(reader: &Reader, chapter_id: u32) -> usize {
    reader
        .book()
        .index()
        .chapter_start(chapter_id)
        .expect("chapter listed in toc")
}

#[test]
fn reflow_after_resize_keeps_reading_position() {
    let root = temp_root("reflow");
    write_sample_site(&root);
    let book = load_book(&mut DirectoryLoader::new(&root));

    let narrow = RenderEngine::new(RenderEngineOptions::for_viewport(360, 640, LayoutMode::Single))
        .assemble(&book.chapters, &HeuristicMeasurer::default());
    let mut reader =
        Reader::new(narrow, LayoutMode::Single, ReaderConfig::default()).expect("non-empty book");
    let storm_page = reader
        .book()
        .pages()
        .iter()
        .find(|p| p.html.contains("storm60"))
        .map(|p| p.page_number())
        .expect("storm60 is paginated");
    let jump = reader.jump_to_page(storm_page).expect("jump accepted");
    assert!(reader.finish_transition(jump.id));
    let anchor = reader
        .book()
        .page(reader.cursor())
        .and_then(|p| p.first_word())
        .expect("content page has words");

    let wide = RenderEngine::new(RenderEngineOptions::for_viewport(1280, 800, LayoutMode::Spread))
        .assemble(&book.chapters, &HeuristicMeasurer::default());
    assert!(reader.replace_book(wide));
    assert!(reader.set_layout_mode(LayoutMode::Spread));

    let spread = reader.projection();
    assert!(spread
        .entries
        .iter()
        .filter_map(|e| reader.book().page(e.page_number))
        .any(|page| page.contains_word(anchor)));
    assert_eq!(reader.cursor() % 2, 1);
}

#[test]
fn missing_site_falls_back_to_demo_book() {
    let root = temp_root("empty");
    let book = load_book(&mut DirectoryLoader::new(root.join("nowhere")));
    assert!(book.is_fallback());
    assert_eq!(book.chapters.len(), 1);

    let engine = RenderEngine::new(RenderEngineOptions {
        pagination: PaginationConfig::default().with_word_quota(DEFAULT_WORDS_PER_PAGE),
        table_of_contents: false,
    });
    let paginated = engine.assemble(&book.chapters, &HeuristicMeasurer::default());
    assert_eq!(paginated.total_pages(), 1);
    assert!(Reader::new(paginated, LayoutMode::Spread, ReaderConfig::default()).is_some());
}

#[test]
fn caching_loader_reads_each_chapter_once() {
    let root = temp_root("cache");
    write_sample_site(&root);
    let mut loader = CachingLoader::new(DirectoryLoader::new(&root));
    let metadata = loader.load_metadata().expect("metadata loads");
    let first = loader
        .load_chapter(&metadata.chapters[0])
        .expect("chapter loads");
    std::fs::remove_file(root.join("content/chapter1.json")).expect("remove chapter file");
    let again = loader
        .load_chapter(&metadata.chapters[0])
        .expect("cached chapter survives file removal");
    assert_eq!(first, again);
    assert_eq!(loader.cached_chapters(), 1);
}
