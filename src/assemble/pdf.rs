//! Chapter-to-PDF assembly, one page per image

use super::ChapterAssembler;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use printpdf::image_crate::DynamicImage;
use printpdf::{Image, ImageTransform, Mm, PdfDocument};

/// Pages are sized so the image fills them edge to edge at this density.
const RENDER_DPI: f32 = 96.0;

fn px_to_mm(px: u32) -> Mm {
    Mm(px as f32 * 25.4 / RENDER_DPI)
}

impl ChapterAssembler<'_> {
    /// Write the chapter as a PDF in the comic directory, one page per
    /// image, each page sized to its image's pixel dimensions.
    pub fn save_pdf(&self, output_root: &Path) -> Result<PathBuf> {
        let comic_dir = self.comic_dir(output_root);
        std::fs::create_dir_all(&comic_dir)?;
        let label = self.chapter_label();
        let path = comic_dir.join(format!("{label}.pdf"));

        let pdf_err = |e: &dyn std::fmt::Display| Error::Pdf {
            path: path.clone(),
            reason: e.to_string(),
        };

        let mut pages = self.images().iter().map(|bytes| {
            printpdf::image_crate::load_from_memory(bytes)
                .map(|img| DynamicImage::ImageRgb8(img.to_rgb8()))
                .map_err(|e| pdf_err(&e))
        });

        // The document is created with its first page, so the first image
        // is pulled eagerly and the rest appended.
        let first = match pages.next() {
            Some(img) => img?,
            None => {
                return Err(Error::EmptyChapter {
                    chapter: self.chapter_number(),
                })
            }
        };
        let (width, height) = (first.width(), first.height());
        let (doc, first_page, first_layer) =
            PdfDocument::new(&label, px_to_mm(width), px_to_mm(height), "page");

        let transform = || ImageTransform {
            dpi: Some(RENDER_DPI),
            ..Default::default()
        };
        Image::from_dynamic_image(&first)
            .add_to_layer(doc.get_page(first_page).get_layer(first_layer), transform());

        for page in pages {
            let img = page?;
            let (page_idx, layer_idx) =
                doc.add_page(px_to_mm(img.width()), px_to_mm(img.height()), "page");
            Image::from_dynamic_image(&img)
                .add_to_layer(doc.get_page(page_idx).get_layer(layer_idx), transform());
        }

        let file = File::create(&path)?;
        doc.save(&mut BufWriter::new(file))
            .map_err(|e| pdf_err(&e))?;

        tracing::debug!(
            chapter = self.chapter_number(),
            path = %path.display(),
            "pdf written"
        );
        Ok(path)
    }
}
