//! Error types for comic-dl
//!
//! This module provides the error handling for the library:
//! - Domain-specific error types (specifier, source, assembly, etc.)
//! - A clear split between fatal setup errors and per-chapter errors that
//!   the chapter loop catches and skips

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for comic-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for comic-dl
///
/// Variants fall into two families: setup-time errors that abort a run
/// before any fetch (`Specifier`, `UnknownSite`, `Config`, ...) and
/// per-chapter errors (`Source`, `EmptyChapter`) that the chapter loop
/// logs and skips so a batch run completes as much work as possible.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed chapter selection expression; fatal, aborts before any fetch
    #[error("invalid chapter specifier {spec:?}: {reason}")]
    Specifier {
        /// The selection expression that failed to parse
        spec: String,
        /// What was wrong with it
        reason: String,
    },

    /// Site adapter failure (network/parse/out-of-range chapter)
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Every image fetch for a chapter failed, so no artifact is written
    #[error("chapter {chapter} produced no usable images")]
    EmptyChapter {
        /// The chapter index whose images all failed
        chapter: u32,
    },

    /// No adapter is registered for the requested site identifier
    #[error("unknown site: {0}")]
    UnknownSite(String),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "proxy")
        key: Option<String>,
    },

    /// Image decode or re-encode failed during assembly
    #[error("image error for {path:?}: {reason}")]
    Image {
        /// The artifact path being produced when the failure occurred
        path: PathBuf,
        /// The underlying image library message
        reason: String,
    },

    /// PDF generation failed
    #[error("pdf error for {path:?}: {reason}")]
    Pdf {
        /// The PDF path being produced when the failure occurred
        path: PathBuf,
        /// The underlying PDF library message
        reason: String,
    },

    /// Zip archive read/write failed
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (cookie file, config)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation not supported (e.g., login on an adapter without one)
    #[error("not supported: {0}")]
    NotSupported(String),
}

/// Errors produced by a site adapter
///
/// These are per-chapter (or per-listing) failures: the chapter loop
/// catches them, logs, and moves on to the next chapter.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network or parse failure while talking to the source site
    #[error("source unavailable: {url}: {reason}")]
    Unavailable {
        /// The URL that failed
        url: String,
        /// The underlying failure
        reason: String,
    },

    /// Requested chapter index is outside the known range for its track
    #[error("chapter {chapter} not found (last known chapter is {last})")]
    ChapterNotFound {
        /// The requested chapter index
        chapter: u32,
        /// The highest chapter index the source reports
        last: u32,
    },

    /// The catalog id could not be resolved from the given URL
    #[error("cannot resolve catalog id from url: {0}")]
    UnresolvableComicId(String),
}

impl Error {
    /// Whether this error aborts the whole run rather than a single chapter.
    ///
    /// Per-chapter errors (`Source`, `EmptyChapter`) are caught at the
    /// chapter-loop boundary; everything else is a setup or environment
    /// problem that should surface to the caller. An unresolvable catalog
    /// id happens before any chapter work starts, so it stays fatal even
    /// though adapters report it.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Source(SourceError::UnresolvableComicId(_)) => true,
            Error::Source(_) | Error::EmptyChapter { .. } => false,
            _ => true,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specifier_error_is_fatal() {
        let err = Error::Specifier {
            spec: "1-x".into(),
            reason: "invalid integer".into(),
        };
        assert!(err.is_fatal());
    }

    #[test]
    fn unknown_site_is_fatal() {
        assert!(Error::UnknownSite("nosuch".into()).is_fatal());
    }

    #[test]
    fn source_unavailable_is_per_chapter() {
        let err = Error::Source(SourceError::Unavailable {
            url: "https://example.com/c/1".into(),
            reason: "timeout".into(),
        });
        assert!(!err.is_fatal());
    }

    #[test]
    fn chapter_not_found_is_per_chapter() {
        let err = Error::Source(SourceError::ChapterNotFound {
            chapter: 900,
            last: 100,
        });
        assert!(!err.is_fatal());
    }

    #[test]
    fn unresolvable_comicid_is_fatal() {
        let err = Error::Source(SourceError::UnresolvableComicId(
            "https://other.com/x".into(),
        ));
        assert!(err.is_fatal());
    }

    #[test]
    fn empty_chapter_is_per_chapter() {
        assert!(!Error::EmptyChapter { chapter: 3 }.is_fatal());
    }

    #[test]
    fn display_includes_context() {
        let err = Error::Source(SourceError::ChapterNotFound {
            chapter: 900,
            last: 100,
        });
        let msg = err.to_string();
        assert!(msg.contains("900"));
        assert!(msg.contains("100"));

        let err = Error::Specifier {
            spec: "a-b".into(),
            reason: "invalid integer".into(),
        };
        assert!(err.to_string().contains("a-b"));
    }
}
