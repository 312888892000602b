//! Vertical concatenation of a chapter into one (or a few) long JPEGs

use super::ChapterAssembler;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, Rgb, RgbImage};

impl ChapterAssembler<'_> {
    /// Concatenate the chapter's images top-to-bottom into JPEG parts.
    ///
    /// Images are grouped greedily in reading order so that no part grows
    /// taller than `max_height`. A single source image that already exceeds
    /// `max_height` becomes a part of its own, uncropped. Part files land
    /// in the comic directory, named after the chapter label, and the
    /// returned paths follow reading order.
    pub fn save_long_image(
        &self,
        output_root: &Path,
        quality: u8,
        max_height: u32,
    ) -> Result<Vec<PathBuf>> {
        let decoded = self.decode_all()?;
        let groups = group_by_height(&decoded, max_height);

        let comic_dir = self.comic_dir(output_root);
        std::fs::create_dir_all(&comic_dir)?;
        let label = self.chapter_label();
        let multi_part = groups.len() > 1;

        let mut paths = Vec::with_capacity(groups.len());
        for (part, group) in groups.iter().enumerate() {
            let canvas = compose(&decoded[group.clone()]);
            let path = if multi_part {
                comic_dir.join(format!("{label} {:02}.jpg", part + 1))
            } else {
                comic_dir.join(format!("{label}.jpg"))
            };
            let file = File::create(&path)?;
            let mut encoder = JpegEncoder::new_with_quality(BufWriter::new(file), quality);
            encoder.encode_image(&canvas).map_err(|e| Error::Image {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            paths.push(path);
        }

        tracing::debug!(
            chapter = self.chapter_number(),
            parts = paths.len(),
            "long image written"
        );
        Ok(paths)
    }

    fn decode_all(&self) -> Result<Vec<RgbImage>> {
        self.images()
            .iter()
            .map(|bytes| {
                image::load_from_memory(bytes)
                    .map(|img| img.to_rgb8())
                    .map_err(|e| Error::Image {
                        path: PathBuf::new(),
                        reason: e.to_string(),
                    })
            })
            .collect()
    }
}

/// Split `images` into contiguous runs whose summed heights stay within
/// `max_height`, except that an oversized single image forms its own run.
fn group_by_height(images: &[RgbImage], max_height: u32) -> Vec<std::ops::Range<usize>> {
    let mut groups = Vec::new();
    let mut start = 0;
    let mut height: u64 = 0;
    for (i, img) in images.iter().enumerate() {
        let h = u64::from(img.height());
        if i > start && height + h > u64::from(max_height) {
            groups.push(start..i);
            start = i;
            height = 0;
        }
        height += h;
    }
    if start < images.len() {
        groups.push(start..images.len());
    }
    groups
}

/// Paint the run onto a white canvas, left-aligned, top to bottom.
fn compose(images: &[RgbImage]) -> RgbImage {
    let width = images.iter().map(|i| i.width()).max().unwrap_or(1);
    let height: u32 = images.iter().map(|i| i.height()).sum();
    let mut canvas = RgbImage::from_pixel(width, height.max(1), Rgb([255, 255, 255]));
    let mut y: i64 = 0;
    for img in images {
        imageops::overlay(&mut canvas, img, 0, y);
        y += i64::from(img.height());
    }
    canvas
}
