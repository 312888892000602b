//! Chapter assembly: turning a fetched, ordered image set into artifacts
//!
//! [`ChapterAssembler`] owns the successful images of one chapter, in
//! reading order, and produces the four artifact kinds: an image folder
//! (here), a concatenated long image ([`long_image`]), a PDF ([`pdf`]),
//! and a zip archive ([`archive`]). Artifact paths are deterministic
//! functions of source name, comic name, and chapter number/title, so
//! re-runs and merges see the same layout.

mod archive;
mod long_image;
mod pdf;

use crate::error::{Error, Result};
use crate::types::ChapterMetadata;
use crate::utils::{image_extension, image_file_name, sanitize_filename};
use std::path::{Path, PathBuf};

/// Assembles one fetched chapter into durable artifacts
#[derive(Debug)]
pub struct ChapterAssembler<'a> {
    source_name: &'a str,
    comic_name: &'a str,
    chapter: &'a ChapterMetadata,
    /// Successful image bytes in reading order
    images: Vec<Vec<u8>>,
    /// Number of image slots whose fetch failed
    dropped: usize,
}

impl<'a> ChapterAssembler<'a> {
    /// Build an assembler from the worker pool's per-slot fetch results.
    ///
    /// Failed slots are dropped; the survivors keep their reading order and
    /// are renumbered 1..n. The count of dropped slots is surfaced through
    /// [`dropped`](Self::dropped) for the caller to log as a warning.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyChapter`] when no slot produced usable bytes; no
    /// artifact may be written for such a chapter.
    pub fn new(
        source_name: &'a str,
        comic_name: &'a str,
        chapter: &'a ChapterMetadata,
        fetch_results: Vec<Result<Vec<u8>>>,
    ) -> Result<Self> {
        let total = fetch_results.len();
        let images: Vec<Vec<u8>> = fetch_results.into_iter().filter_map(|r| r.ok()).collect();
        if images.is_empty() {
            return Err(Error::EmptyChapter {
                chapter: chapter.chapter_number,
            });
        }
        Ok(Self {
            source_name,
            comic_name,
            chapter,
            dropped: total - images.len(),
            images,
        })
    }

    /// Number of images whose fetch failed and were left out of assembly
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Number of images that will appear in artifacts
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub(crate) fn images(&self) -> &[Vec<u8>] {
        &self.images
    }

    /// `<outputRoot>/<sourceName>/<comicName>`, shared by all artifacts
    pub fn comic_dir(&self, output_root: &Path) -> PathBuf {
        output_root
            .join(sanitize_filename(self.source_name))
            .join(sanitize_filename(self.comic_name))
    }

    /// `<chapterNumber> <chapterTitle>`, sanitized; the chapter's
    /// directory name and the stem of its single-file artifacts
    pub fn chapter_label(&self) -> String {
        sanitize_filename(&format!(
            "{} {}",
            self.chapter.chapter_number, self.chapter.title
        ))
    }

    pub(crate) fn chapter_number(&self) -> u32 {
        self.chapter.chapter_number
    }

    /// Write each image as a sequentially-numbered file in the chapter
    /// directory, preserving reading order.
    ///
    /// The directory name and numbering are pure functions of the inputs,
    /// so repeated runs overwrite in place rather than duplicating.
    pub fn save_folder(&self, output_root: &Path) -> Result<PathBuf> {
        let chapter_dir = self.comic_dir(output_root).join(self.chapter_label());
        std::fs::create_dir_all(&chapter_dir)?;

        for (i, bytes) in self.images.iter().enumerate() {
            let name = image_file_name(i + 1, image_extension(bytes));
            std::fs::write(chapter_dir.join(name), bytes)?;
        }

        tracing::debug!(
            chapter = self.chapter.chapter_number,
            images = self.images.len(),
            dir = %chapter_dir.display(),
            "chapter folder written"
        );
        Ok(chapter_dir)
    }
}
