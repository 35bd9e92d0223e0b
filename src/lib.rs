//! Content model and loading for paginated flipbook readers.
//!
//! A flipbook is published as a `book-metadata.json` listing plus one JSON
//! file per chapter. This crate turns those files into [`Chapter`]s and
//! formats paragraph text into markup; pagination and page-turn navigation
//! live in `flipbook-render`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use flipbook::{load_book, CachingLoader, DirectoryLoader};
//!
//! let mut loader = CachingLoader::new(DirectoryLoader::new("site/content"));
//! let book = load_book(&mut loader);
//! for chapter in &book.chapters {
//!     println!("{}: {} words", chapter.title, chapter.word_count());
//! }
//! ```

#![cfg_attr(
    not(test),
    deny(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented
    )
)]

pub mod book;
pub mod error;
pub mod loader;
pub mod text_format;

pub use book::{BookMetadata, Chapter, ChapterContent, ChapterRef, LoadedBook};
pub use error::LoadError;
pub use loader::{
    load_book, load_chapters, CachingLoader, ContentLoader, DirectoryLoader, METADATA_FILE,
};
pub use text_format::{
    escape_text, format_rich_text, split_words, word_count, FormattedParagraph,
};
