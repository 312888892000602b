//! Chapter-to-zip assembly

use super::ChapterAssembler;
use crate::error::{Error, Result};
use crate::utils::list_sequence_files;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use zip::write::FileOptions;
use zip::ZipWriter;

impl ChapterAssembler<'_> {
    /// Archive the chapter as `<chapterLabel>.zip` in the comic directory.
    ///
    /// The folder artifact is written (or refreshed) first so the archive
    /// always reflects the current image set, and entries are added in
    /// numbering order so readers that trust entry order page correctly.
    pub fn save_zip(&self, output_root: &Path) -> Result<PathBuf> {
        let chapter_dir = self.save_folder(output_root)?;
        let path = self
            .comic_dir(output_root)
            .join(format!("{}.zip", self.chapter_label()));

        let file = File::create(&path)?;
        let mut writer = ZipWriter::new(BufWriter::new(file));
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for entry in list_sequence_files(&chapter_dir)? {
            let name = entry
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    Error::Io(std::io::Error::other(format!(
                        "unreadable entry name under {}",
                        chapter_dir.display()
                    )))
                })?;
            writer.start_file(name, options)?;
            writer.write_all(&std::fs::read(&entry)?)?;
        }
        writer.finish()?.flush()?;

        tracing::debug!(
            chapter = self.chapter_number(),
            path = %path.display(),
            "zip written"
        );
        Ok(path)
    }
}
