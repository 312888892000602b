//! Utility functions for file naming and image listing

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Characters a filename component may not contain on common filesystems
const FORBIDDEN: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Replace filesystem-hostile characters with underscores.
///
/// Comic names, chapter titles, and source names flow into directory names
/// unchanged otherwise, so the mapping must be deterministic for artifact
/// paths to be reproducible.
pub fn sanitize_filename(s: &str) -> String {
    s.replace(FORBIDDEN, "_")
}

/// Zero-padded sequence file name for an image within a chapter (1-based)
pub fn image_file_name(sequence: usize, ext: &str) -> String {
    format!("{sequence:03}.{ext}")
}

/// Guess a file extension from raw image bytes, defaulting to "jpg"
pub fn image_extension(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Png) => "png",
        Ok(image::ImageFormat::Gif) => "gif",
        Ok(image::ImageFormat::WebP) => "webp",
        Ok(image::ImageFormat::Bmp) => "bmp",
        _ => "jpg",
    }
}

/// Files of a chapter directory in sequence order.
///
/// Ordering is by numeric file stem, not name, so chapters that grow past
/// three digits (`999.jpg` followed by `1000.jpg`) keep their reading order.
/// Files without a numeric stem sort after the sequence. Subdirectories are
/// ignored.
pub fn list_sequence_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort_by_key(|path| {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        (stem.parse::<u64>().unwrap_or(u64::MAX), path.clone())
    });
    Ok(files)
}
