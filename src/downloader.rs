//! Chapter download orchestration
//!
//! [`ComicDownloader`] binds one site adapter to a session registry and a
//! [`Config`], and drives the full pipeline for a run: resolve the chapter
//! specifier against the comic's catalog, fetch each chapter's images
//! through the bounded worker pool, assemble the requested artifacts, and
//! optionally merge the run into one continuous volume. Chapter failures
//! are isolated: one bad chapter is logged and skipped while its siblings
//! complete.

use crate::adapter::SiteAdapter;
use crate::assemble::ChapterAssembler;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::SessionRegistry;
use crate::types::tag_id_by_name;
use crate::utils::sanitize_filename;
use crate::{fetch, merge, retry, specifier};
use std::path::PathBuf;
use std::sync::Arc;

/// Listing pagination has no advertised last page, so page specifiers
/// resolve against this cap and iteration stops at the first empty page.
const LISTING_PAGE_CAP: u32 = 100;

/// Which artifacts a run should produce
///
/// The image folder is always written; it is the substrate the other
/// artifacts and the merge step build on.
#[derive(Clone, Debug, Default)]
pub struct ArtifactOptions {
    /// Concatenate each chapter into long JPEG part(s)
    pub single_image: bool,
    /// Render each chapter as a PDF
    pub pdf: bool,
    /// Archive each chapter as a zip
    pub zip: bool,
    /// Merge the run's chapters into one continuously-numbered folder
    pub merge: bool,
    /// Merge the run's chapters into one continuously-numbered zip
    pub merge_zip: bool,
}

/// What one run produced, chapter by chapter
#[derive(Debug, Default)]
pub struct DownloadReport {
    /// Comic name as reported by the source
    pub comic_name: String,
    /// Chapter numbers fully assembled, in processing order
    pub succeeded: Vec<u32>,
    /// Chapters skipped after a non-fatal error, with the reason
    pub skipped: Vec<(u32, String)>,
    /// Folder artifact of each succeeded chapter, in processing order
    pub chapter_dirs: Vec<PathBuf>,
    /// Long-image parts written, across all chapters
    pub long_images: Vec<PathBuf>,
    /// PDF artifacts written
    pub pdfs: Vec<PathBuf>,
    /// Zip artifacts written
    pub zips: Vec<PathBuf>,
    /// Merged folder, when requested and at least one chapter succeeded
    pub merged_dir: Option<PathBuf>,
    /// Merged zip, when requested and at least one chapter succeeded
    pub merged_zip: Option<PathBuf>,
}

struct ChapterOutcome {
    dir: PathBuf,
    long_images: Vec<PathBuf>,
    pdf: Option<PathBuf>,
    zip: Option<PathBuf>,
}

/// Drives downloads for one site adapter
pub struct ComicDownloader {
    adapter: Arc<dyn SiteAdapter>,
    sessions: Arc<SessionRegistry>,
    config: Config,
}

impl ComicDownloader {
    /// Bind an adapter to session state and configuration.
    ///
    /// Proxy, TLS, and persisted cookies from the config are applied to
    /// the adapter's site session up front, before any request is made.
    pub fn new(
        adapter: Arc<dyn SiteAdapter>,
        sessions: Arc<SessionRegistry>,
        config: Config,
    ) -> Result<Self> {
        let site = adapter.site();
        if let Some(proxy) = &config.proxy {
            sessions.set_proxy(site, proxy)?;
        }
        if !config.verify_tls {
            sessions.set_verify(site, false)?;
        }
        if let Some(path) = &config.cookies_path {
            let loaded = sessions.load_cookies(site, path)?;
            tracing::info!(site = site, cookies = loaded, "cookies loaded");
        }
        Ok(Self {
            adapter,
            sessions,
            config,
        })
    }

    /// The adapter this downloader drives
    pub fn adapter(&self) -> &Arc<dyn SiteAdapter> {
        &self.adapter
    }

    /// The configuration this downloader runs with.
    ///
    /// Adapters typically read `crawler_timeout` from here for their own
    /// page fetches.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the adapter's login flow against this downloader's sessions
    pub async fn login(&self) -> Result<()> {
        self.adapter.login(&self.sessions).await
    }

    /// Download the chapters a specifier selects and assemble artifacts.
    ///
    /// The specifier is resolved against the comic's last chapter number
    /// on the `ext_name` track; `select_all` overrides it to the full
    /// track. Setup failures (unreachable comic, empty track, malformed
    /// specifier) abort the run; per-chapter failures are recorded in the
    /// report and the run continues.
    pub async fn download_chapters(
        &self,
        comicid: &str,
        spec: &str,
        select_all: bool,
        ext_name: &str,
        options: &ArtifactOptions,
    ) -> Result<DownloadReport> {
        let comic = self.adapter.fetch_comic(comicid).await?;
        let last = comic
            .last_chapter_number(ext_name)
            .ok_or_else(|| Error::Specifier {
                spec: spec.to_string(),
                reason: format!(
                    "comic {comicid} has no chapters on track {ext_name:?}"
                ),
            })?;
        let indices = specifier::resolve(spec, last, select_all)?;

        tracing::info!(
            site = self.adapter.site(),
            comicid = comicid,
            comic = %comic.name,
            chapters = indices.len(),
            "download starting"
        );

        let mut report = DownloadReport {
            comic_name: comic.name.clone(),
            ..DownloadReport::default()
        };

        for number in indices {
            match self
                .download_one_chapter(comicid, number, ext_name, &comic.name, options)
                .await
            {
                Ok(outcome) => {
                    report.succeeded.push(number);
                    report.chapter_dirs.push(outcome.dir);
                    report.long_images.extend(outcome.long_images);
                    report.pdfs.extend(outcome.pdf);
                    report.zips.extend(outcome.zip);
                }
                Err(e) if !e.is_fatal() => {
                    tracing::error!(
                        site = self.adapter.site(),
                        comicid = comicid,
                        chapter = number,
                        error = %e,
                        "chapter skipped"
                    );
                    report.skipped.push((number, e.to_string()));
                }
                Err(e) => return Err(e),
            }

            // Pacing applies after every chapter, failed ones included.
            if let Some(delay) = self.config.chapter_delay {
                tokio::time::sleep(delay).await;
            }
        }

        if (options.merge || options.merge_zip) && !report.chapter_dirs.is_empty() {
            self.merge_run(&mut report, options)?;
        }

        tracing::info!(
            comicid = comicid,
            succeeded = report.succeeded.len(),
            skipped = report.skipped.len(),
            "download finished"
        );
        Ok(report)
    }

    async fn download_one_chapter(
        &self,
        comicid: &str,
        number: u32,
        ext_name: &str,
        comic_name: &str,
        options: &ArtifactOptions,
    ) -> Result<ChapterOutcome> {
        let chapter = self.adapter.fetch_chapter(comicid, number, ext_name).await?;

        let session = self.sessions.session(self.adapter.site())?;
        let retry_config = self.config.retry.clone();
        let timeout = self.config.image_timeout;
        let fetch_one = move |url: String| {
            let session = Arc::clone(&session);
            let retry_config = retry_config.clone();
            async move {
                retry::fetch_with_retry(&retry_config, || session.get_bytes(&url, timeout)).await
            }
        };

        let results =
            fetch::fetch_all(&chapter.image_urls, self.config.workers, fetch_one).await;

        let assembler =
            ChapterAssembler::new(self.adapter.source_name(), comic_name, &chapter, results)?;
        if assembler.dropped() > 0 {
            tracing::warn!(
                chapter = number,
                dropped = assembler.dropped(),
                kept = assembler.image_count(),
                "some images failed to fetch"
            );
        }

        let output_root = &self.config.output_dir;
        let dir = assembler.save_folder(output_root)?;
        let long_images = if options.single_image {
            assembler.save_long_image(output_root, self.config.quality, self.config.max_height)?
        } else {
            Vec::new()
        };
        let pdf = if options.pdf {
            Some(assembler.save_pdf(output_root)?)
        } else {
            None
        };
        let zip = if options.zip {
            Some(assembler.save_zip(output_root)?)
        } else {
            None
        };

        Ok(ChapterOutcome {
            dir,
            long_images,
            pdf,
            zip,
        })
    }

    /// Merge the run's chapter folders, named for the chapter range.
    ///
    /// Skipped chapters simply contribute nothing; numbering stays
    /// continuous over whatever the run actually produced.
    fn merge_run(&self, report: &mut DownloadReport, options: &ArtifactOptions) -> Result<()> {
        let first = report.succeeded.iter().min().copied().unwrap_or(0);
        let last = report.succeeded.iter().max().copied().unwrap_or(0);
        let comic_dir = self
            .config
            .output_dir
            .join(sanitize_filename(self.adapter.source_name()))
            .join(sanitize_filename(&report.comic_name));
        let label = format!("merged {first}-{last}");

        if options.merge {
            let target = comic_dir.join(&label);
            merge::merge_folders(&report.chapter_dirs, &target)?;
            report.merged_dir = Some(target);
        }
        if options.merge_zip {
            let target = comic_dir.join(format!("{label}.zip"));
            merge::merge_to_zip(&report.chapter_dirs, &target)?;
            report.merged_zip = Some(target);
        }
        Ok(())
    }

    /// Download chapters for every comic on the site's "latest" listing.
    ///
    /// `page_spec` selects listing pages with the same grammar as chapter
    /// specifiers; iteration stops early at the first empty page. Failures
    /// for one comic are logged and skipped.
    pub async fn download_latest_all(
        &self,
        page_spec: &str,
        chapter_spec: &str,
        ext_name: &str,
        options: &ArtifactOptions,
    ) -> Result<Vec<DownloadReport>> {
        let pages = specifier::resolve(page_spec, LISTING_PAGE_CAP, false)?;
        let mut reports = Vec::new();
        for page in pages {
            let items = self.adapter.latest(page).await?;
            if items.is_empty() {
                tracing::debug!(page = page, "empty listing page, stopping");
                break;
            }
            self.download_listing(&items, chapter_spec, ext_name, options, &mut reports)
                .await?;
        }
        Ok(reports)
    }

    /// Download chapters for every comic under one tag.
    ///
    /// `tag` may be a tag name (looked up in the site's tag categories) or
    /// a raw tag id when no name matches.
    pub async fn download_tag_all(
        &self,
        tag: &str,
        page_spec: &str,
        chapter_spec: &str,
        ext_name: &str,
        options: &ArtifactOptions,
    ) -> Result<Vec<DownloadReport>> {
        let categories = self.adapter.tags().await?;
        let tag_id = tag_id_by_name(&categories, tag).unwrap_or_else(|| tag.to_string());

        let pages = specifier::resolve(page_spec, LISTING_PAGE_CAP, false)?;
        let mut reports = Vec::new();
        for page in pages {
            let items = self.adapter.tag_result(&tag_id, page).await?;
            if items.is_empty() {
                tracing::debug!(tag = %tag_id, page = page, "empty tag page, stopping");
                break;
            }
            self.download_listing(&items, chapter_spec, ext_name, options, &mut reports)
                .await?;
        }
        Ok(reports)
    }

    async fn download_listing(
        &self,
        items: &[crate::types::SearchResultItem],
        chapter_spec: &str,
        ext_name: &str,
        options: &ArtifactOptions,
        reports: &mut Vec<DownloadReport>,
    ) -> Result<()> {
        for item in items {
            match self
                .download_chapters(&item.comicid, chapter_spec, false, ext_name, options)
                .await
            {
                Ok(report) => reports.push(report),
                // A listed comic with an empty chapter track surfaces as a
                // specifier error; in batch mode that skips the comic
                // rather than aborting the sweep.
                Err(e) if !e.is_fatal() || matches!(e, Error::Specifier { .. }) => {
                    tracing::error!(
                        comicid = %item.comicid,
                        name = %item.name,
                        error = %e,
                        "comic skipped"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
