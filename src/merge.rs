//! Merging downloaded chapters into one continuous volume
//!
//! An ordered list of chapter directories is flattened into a single
//! artifact with continuous page numbering: images keep chapter order and
//! in-chapter order, but are renumbered 1..N across chapter boundaries so
//! readers page straight through.

use crate::error::Result;
use crate::utils::{image_file_name, list_sequence_files};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use zip::write::FileOptions;
use zip::ZipWriter;

/// `(source path, merged file name)` for every image, in final page order
fn renumbered_pages(chapter_dirs: &[PathBuf]) -> Result<Vec<(PathBuf, String)>> {
    let mut pages = Vec::new();
    let mut sequence = 0usize;
    for dir in chapter_dirs {
        for source in list_sequence_files(dir)? {
            sequence += 1;
            let ext = source
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_else(|| "jpg".to_string());
            pages.push((source, image_file_name(sequence, &ext)));
        }
    }
    Ok(pages)
}

/// Copy every chapter image into `target_dir` under its merged number.
///
/// Re-running with the same inputs rewrites the same file names, so the
/// merge is idempotent. Returns the number of images written.
pub fn merge_folders(chapter_dirs: &[PathBuf], target_dir: &Path) -> Result<usize> {
    let pages = renumbered_pages(chapter_dirs)?;
    std::fs::create_dir_all(target_dir)?;
    for (source, name) in &pages {
        std::fs::copy(source, target_dir.join(name))?;
    }
    tracing::info!(
        chapters = chapter_dirs.len(),
        images = pages.len(),
        dir = %target_dir.display(),
        "chapters merged"
    );
    Ok(pages.len())
}

/// Write every chapter image into a single zip at `target_path`, entries
/// in merged page order. Returns the number of images archived.
pub fn merge_to_zip(chapter_dirs: &[PathBuf], target_path: &Path) -> Result<usize> {
    let pages = renumbered_pages(chapter_dirs)?;
    if let Some(parent) = target_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(target_path)?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (source, name) in &pages {
        writer.start_file(name.clone(), options)?;
        writer.write_all(&std::fs::read(source)?)?;
    }
    writer.finish()?.flush()?;
    tracing::info!(
        chapters = chapter_dirs.len(),
        images = pages.len(),
        path = %target_path.display(),
        "chapters merged into archive"
    );
    Ok(pages.len())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    /// Lay down a chapter directory holding `count` numbered jpg files
    /// whose contents name their origin, so merged order is checkable.
    fn fake_chapter(root: &Path, label: &str, count: usize) -> PathBuf {
        let dir = root.join(label);
        std::fs::create_dir_all(&dir).unwrap();
        for i in 1..=count {
            let name = image_file_name(i, "jpg");
            std::fs::write(dir.join(name), format!("{label}/{i}")).unwrap();
        }
        dir
    }

    #[test]
    fn merged_numbering_is_continuous_across_chapters() {
        let tmp = tempfile::tempdir().unwrap();
        let ch1 = fake_chapter(tmp.path(), "1 One", 3);
        let ch2 = fake_chapter(tmp.path(), "2 Two", 2);
        let target = tmp.path().join("merged");

        let written = merge_folders(&[ch1, ch2], &target).unwrap();
        assert_eq!(written, 5);

        let files = list_sequence_files(&target).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["001.jpg", "002.jpg", "003.jpg", "004.jpg", "005.jpg"]
        );

        // Page 4 is the first image of the second chapter.
        let page4 = std::fs::read_to_string(&files[3]).unwrap();
        assert_eq!(page4, "2 Two/1");
    }

    #[test]
    fn merged_page_order_holds_past_a_thousand_images() {
        let tmp = tempfile::tempdir().unwrap();
        let ch1 = fake_chapter(tmp.path(), "1 One", 1000);
        let target = tmp.path().join("merged");

        let written = merge_folders(std::slice::from_ref(&ch1), &target).unwrap();
        assert_eq!(written, 1000);

        // Name-sorted listing would slot 1000 after 100 and shift every
        // later page by one.
        let page102 = std::fs::read_to_string(target.join("102.jpg")).unwrap();
        assert_eq!(page102, "1 One/102");
        let page1000 = std::fs::read_to_string(target.join("1000.jpg")).unwrap();
        assert_eq!(page1000, "1 One/1000");
    }

    #[test]
    fn merge_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let ch1 = fake_chapter(tmp.path(), "1 One", 2);
        let target = tmp.path().join("merged");

        merge_folders(std::slice::from_ref(&ch1), &target).unwrap();
        merge_folders(std::slice::from_ref(&ch1), &target).unwrap();
        assert_eq!(list_sequence_files(&target).unwrap().len(), 2);
    }

    #[test]
    fn zip_merge_preserves_page_order() {
        let tmp = tempfile::tempdir().unwrap();
        let ch1 = fake_chapter(tmp.path(), "1 One", 2);
        let ch2 = fake_chapter(tmp.path(), "2 Two", 1);
        let target = tmp.path().join("merged.zip");

        let written = merge_to_zip(&[ch1, ch2], &target).unwrap();
        assert_eq!(written, 3);

        let mut archive = zip::ZipArchive::new(File::open(&target).unwrap()).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["001.jpg", "002.jpg", "003.jpg"]);
    }

    #[test]
    fn missing_chapter_dir_is_an_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let ghost = tmp.path().join("nope");
        let err = merge_folders(std::slice::from_ref(&ghost), &tmp.path().join("m")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
