//! Content loading collaborator.
//!
//! The paginator never touches storage. Hosts hand it [`Chapter`]s obtained
//! through a [`ContentLoader`]; [`load_book`] drives a loader and recovers from
//! every failure locally so a broken chapter never takes the rest of the book
//! down with it.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::book::{BookMetadata, Chapter, ChapterContent, ChapterRef, LoadedBook};
use crate::error::LoadError;

/// File name of the book description inside a content root.
pub const METADATA_FILE: &str = "book-metadata.json";

/// Conventional sub-directory that may hold the content files.
const CONTENT_DIR: &str = "content";

/// Source of book metadata and chapter content.
pub trait ContentLoader {
    fn load_metadata(&mut self) -> Result<BookMetadata, LoadError>;

    fn load_chapter(&mut self, chapter: &ChapterRef) -> Result<ChapterContent, LoadError>;
}

impl<L: ContentLoader + ?Sized> ContentLoader for &mut L {
    fn load_metadata(&mut self) -> Result<BookMetadata, LoadError> {
        (**self).load_metadata()
    }

    fn load_chapter(&mut self, chapter: &ChapterRef) -> Result<ChapterContent, LoadError> {
        (**self).load_chapter(chapter)
    }
}

/// Loads JSON content files from a directory tree.
///
/// Metadata is looked up as `book-metadata.json` at the root, then under
/// `content/`. A chapter file is looked up, in order, as the path given in the
/// listing, that path under `content/`, its basename (at the root and under
/// `content/`), and finally `chapter{id}.json` (same two places).
#[derive(Clone, Debug)]
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Candidate metadata paths in lookup order.
    pub fn metadata_candidates(&self) -> Vec<PathBuf> {
        vec![
            self.root.join(METADATA_FILE),
            self.root.join(CONTENT_DIR).join(METADATA_FILE),
        ]
    }

    /// Candidate chapter paths in lookup order, without duplicates.
    pub fn chapter_candidates(&self, chapter: &ChapterRef) -> Vec<PathBuf> {
        let file = chapter.file.trim_start_matches("./").trim_start_matches('/');
        let basename = file.rsplit('/').next().unwrap_or(file);
        let by_id = format!("chapter{}.json", chapter.id);

        let mut out: Vec<PathBuf> = Vec::with_capacity(6);
        for name in [file, basename, by_id.as_str()] {
            if name.is_empty() {
                continue;
            }
            for candidate in [
                self.root.join(name),
                self.root.join(CONTENT_DIR).join(name),
            ] {
                if !out.contains(&candidate) {
                    out.push(candidate);
                }
            }
        }
        out
    }

    fn load_first<T: DeserializeOwned>(
        what: String,
        candidates: Vec<PathBuf>,
    ) -> Result<T, LoadError> {
        for path in &candidates {
            if !path.is_file() {
                log::debug!("loader: {} not at {}", what, path.display());
                continue;
            }
            log::debug!("loader: reading {} from {}", what, path.display());
            return read_json(path);
        }
        Err(LoadError::NotFound {
            what,
            tried: candidates,
        })
    }
}

impl ContentLoader for DirectoryLoader {
    fn load_metadata(&mut self) -> Result<BookMetadata, LoadError> {
        Self::load_first("book metadata".to_string(), self.metadata_candidates())
    }

    fn load_chapter(&mut self, chapter: &ChapterRef) -> Result<ChapterContent, LoadError> {
        Self::load_first(
            format!("chapter {}", chapter.id),
            self.chapter_candidates(chapter),
        )
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let bytes = fs::read(path).map_err(|err| LoadError::io(path, err))?;
    serde_json::from_slice(&bytes).map_err(|err| LoadError::json(path, err))
}

/// Memoizes chapter content by chapter id.
///
/// Reflowing a book re-paginates the same chapters; the cache keeps that from
/// hitting the underlying loader again. Failures are not cached.
#[derive(Debug)]
pub struct CachingLoader<L> {
    inner: L,
    chapters: HashMap<u32, ChapterContent>,
}

impl<L: ContentLoader> CachingLoader<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            chapters: HashMap::new(),
        }
    }

    pub fn cached_chapters(&self) -> usize {
        self.chapters.len()
    }

    pub fn into_inner(self) -> L {
        self.inner
    }
}

impl<L: ContentLoader> ContentLoader for CachingLoader<L> {
    fn load_metadata(&mut self) -> Result<BookMetadata, LoadError> {
        self.inner.load_metadata()
    }

    fn load_chapter(&mut self, chapter: &ChapterRef) -> Result<ChapterContent, LoadError> {
        if let Some(cached) = self.chapters.get(&chapter.id) {
            return Ok(cached.clone());
        }
        let content = self.inner.load_chapter(chapter)?;
        self.chapters.insert(chapter.id, content.clone());
        Ok(content)
    }
}

/// Load every chapter listed in `chapters`.
///
/// A chapter that fails to load is replaced by [`Chapter::placeholder`]; the
/// failure message is appended to `warnings`.
pub fn load_chapters<L: ContentLoader + ?Sized>(
    loader: &mut L,
    chapters: &[ChapterRef],
    warnings: &mut Vec<String>,
) -> Vec<Chapter> {
    let mut out = Vec::with_capacity(chapters.len());
    for chapter_ref in chapters {
        match loader.load_chapter(chapter_ref) {
            Ok(content) => out.push(Chapter::from_content(chapter_ref, content)),
            Err(err) => {
                log::warn!(
                    "chapter {} ({}) failed to load, using placeholder: {}",
                    chapter_ref.id,
                    chapter_ref.file,
                    err
                );
                warnings.push(format!("chapter {}: {}", chapter_ref.id, err));
                out.push(Chapter::placeholder(chapter_ref.id, &err.to_string()));
            }
        }
    }
    out
}

/// Drop listing entries with id 0 or an id already listed earlier.
///
/// Chapter ids key the page index and the chapter cache, and 0 marks front
/// matter, so each kept id is unique and at least 1.
fn retain_valid_chapter_refs(chapters: &mut Vec<ChapterRef>, warnings: &mut Vec<String>) {
    let mut seen = HashSet::with_capacity(chapters.len());
    chapters.retain(|chapter| {
        let reason = if chapter.id == 0 {
            "id must be at least 1"
        } else if !seen.insert(chapter.id) {
            "duplicate id"
        } else {
            return true;
        };
        log::warn!(
            "skipping chapter {} '{}' ({}): {}",
            chapter.id,
            chapter.title,
            chapter.file,
            reason
        );
        warnings.push(format!("chapter {} ({}): skipped, {}", chapter.id, chapter.file, reason));
        false
    });
}

/// Load metadata and all chapters.
///
/// Never fails: missing metadata, or a listing with no usable chapter,
/// yields [`LoadedBook::demo`]. Entries with a zero or repeated id are
/// skipped with a warning.
pub fn load_book<L: ContentLoader + ?Sized>(loader: &mut L) -> LoadedBook {
    let mut metadata = match loader.load_metadata() {
        Ok(metadata) => metadata,
        Err(err) => {
            log::warn!("book metadata failed to load, using demo content: {}", err);
            return LoadedBook::demo(err.to_string());
        }
    };

    let mut warnings = Vec::new();
    retain_valid_chapter_refs(&mut metadata.chapters, &mut warnings);
    if metadata.chapters.is_empty() {
        log::warn!("book metadata lists no chapters, using demo content");
        return LoadedBook::demo(LoadError::NoChapters.to_string());
    }

    let chapters = load_chapters(loader, &metadata.chapters, &mut warnings);
    log::debug!(
        "loaded '{}' with {} chapters ({} placeholders)",
        metadata.title,
        chapters.len(),
        warnings.len()
    );
    LoadedBook {
        metadata,
        chapters,
        fallback_reason: None,
        warnings,
    }
}
