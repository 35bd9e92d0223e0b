//! Error types for content loading.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Failure while loading book metadata or chapter content.
///
/// Loading failures are recovered by [`load_book`](crate::load_book): a failed
/// chapter becomes a placeholder chapter and a failed metadata load falls back
/// to demo content. The error is still surfaced for logging.
#[derive(Debug)]
pub enum LoadError {
    /// Reading a file failed.
    Io { path: PathBuf, source: io::Error },
    /// A file was read but is not valid JSON for the expected shape.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// None of the candidate locations exist.
    NotFound {
        what: String,
        tried: Vec<PathBuf>,
    },
    /// Metadata loaded but lists no chapters.
    NoChapters,
}

impl LoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            Self::Json { path, source } => {
                write!(f, "invalid JSON in {}: {}", path.display(), source)
            }
            Self::NotFound { what, tried } => {
                write!(f, "{} not found (tried {} locations)", what, tried.len())
            }
            Self::NoChapters => write!(f, "book metadata lists no chapters"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::NotFound { .. } | Self::NoChapters => None,
        }
    }
}
