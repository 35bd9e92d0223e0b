//! Book content model.
//!
//! [`BookMetadata`] and [`ChapterContent`] mirror the JSON files a flipbook is
//! published as. [`Chapter`] is the immutable, loader-independent form the
//! paginator consumes.

use serde::{Deserialize, Serialize};

use crate::text_format::word_count;

/// Chapter listing entry in `book-metadata.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRef {
    /// Unique chapter id, starting at 1.
    pub id: u32,
    /// Title shown in the table of contents.
    pub title: String,
    /// Chapter file, relative to the content root.
    pub file: String,
}

/// Top-level book description.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetadata {
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub chapters: Vec<ChapterRef>,
}

/// Contents of a single chapter file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterContent {
    pub title: String,
    /// Paragraphs in reading order.
    #[serde(default)]
    pub content: Vec<String>,
}

/// A loaded chapter ready for pagination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chapter {
    pub id: u32,
    pub title: String,
    pub paragraphs: Vec<String>,
}

impl Chapter {
    pub fn new<I, S>(id: u32, title: impl Into<String>, paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            title: title.into(),
            paragraphs: paragraphs.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a chapter from its listing entry and file contents.
    ///
    /// The file's own title wins; the listing title is used when it is blank.
    pub fn from_content(chapter_ref: &ChapterRef, content: ChapterContent) -> Self {
        let title = if content.title.trim().is_empty() {
            chapter_ref.title.clone()
        } else {
            content.title
        };
        Self {
            id: chapter_ref.id,
            title,
            paragraphs: content.content,
        }
    }

    /// Stand-in chapter used when the real content could not be loaded.
    pub fn placeholder(id: u32, reason: &str) -> Self {
        Self {
            id,
            title: format!("Chapter {id}"),
            paragraphs: vec![format!(
                "Content could not be loaded for Chapter {id}: {reason}"
            )],
        }
    }

    pub fn word_count(&self) -> usize {
        self.paragraphs.iter().map(|p| word_count(p)).sum()
    }
}

/// Metadata plus chapters, as produced by [`load_book`](crate::load_book).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedBook {
    pub metadata: BookMetadata,
    pub chapters: Vec<Chapter>,
    /// Set when the metadata could not be loaded and demo content was used.
    pub fallback_reason: Option<String>,
    /// Per-chapter load failures that were replaced by placeholders.
    pub warnings: Vec<String>,
}

impl LoadedBook {
    const DEMO_TITLE: &'static str = "Demo Chapter";

    /// One-chapter book shown when no real content is available.
    pub fn demo(reason: impl Into<String>) -> Self {
        Self {
            metadata: BookMetadata {
                title: "Digital Book".to_string(),
                author: String::new(),
                chapters: vec![ChapterRef {
                    id: 1,
                    title: Self::DEMO_TITLE.to_string(),
                    file: "demo.json".to_string(),
                }],
            },
            chapters: vec![Chapter::new(
                1,
                Self::DEMO_TITLE,
                [
                    "This is demo content. Please ensure the content files are properly loaded.",
                ],
            )],
            fallback_reason: Some(reason.into()),
            warnings: Vec::new(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}
