//! Core types for comic-dl
//!
//! Fixed-shape records for comic and chapter metadata, search results,
//! tag browsing, and cookie persistence. Metadata values are produced
//! fresh per adapter call, consumed by the pipeline, and discarded after
//! assembly; nothing here persists across runs except [`CookieRecord`]
//! lists written through the session registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The extension-name key of the default chapter track.
///
/// Sites can expose alternate numbering tracks (bonus chapters, volume
/// releases); the unnamed track is the main story.
pub const DEFAULT_TRACK: &str = "";

/// A `{name, tag-id}` pair as exposed by a source site's tag browser
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Human-readable tag name
    pub name: String,
    /// Site-specific tag identifier, usable with `SiteAdapter::tag_result`
    pub tag_id: String,
}

/// Grouping of tags under a category label
///
/// Tags are de-duplicated by `tag_id` within a category.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCategory {
    /// Category label (e.g., "genre", "region")
    pub category: String,
    /// Tags in this category, in the order the site lists them
    pub tags: Vec<Tag>,
}

impl TagCategory {
    /// Create an empty category with the given label
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            tags: Vec::new(),
        }
    }

    /// Add a tag, ignoring duplicates by `tag_id`
    pub fn add_tag(&mut self, name: impl Into<String>, tag_id: impl Into<String>) {
        let tag_id = tag_id.into();
        if self.tags.iter().any(|t| t.tag_id == tag_id) {
            return;
        }
        self.tags.push(Tag {
            name: name.into(),
            tag_id,
        });
    }
}

/// Find a tag id by its display name across a list of categories.
///
/// Returns `None` when no category contains the name.
pub fn tag_id_by_name(categories: &[TagCategory], name: &str) -> Option<String> {
    categories
        .iter()
        .flat_map(|c| c.tags.iter())
        .find(|t| t.name == name)
        .map(|t| t.tag_id.clone())
}

/// Summary of one chapter within a comic's chapter listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterSummary {
    /// Chapter index within its track (1-based)
    pub chapter_number: u32,
    /// Chapter title
    pub title: String,
    /// URL of the chapter page on the source site
    pub source_url: String,
}

/// Comic-level metadata returned by `SiteAdapter::fetch_comic`
///
/// Chapters are grouped into extension-name tracks: independent numbering
/// spaces keyed by a track name, where the empty string ([`DEFAULT_TRACK`])
/// is the main story. Chapter indices are unique within a track.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComicMetadata {
    /// Site-specific catalog id
    pub comicid: String,
    /// Comic name
    pub name: String,
    /// Description / synopsis
    pub description: String,
    /// Author name(s)
    pub author: String,
    /// Cover image URL
    pub cover_image_url: String,
    /// URL of the comic page on the source site
    pub source_url: String,
    /// Publication status as reported by the site (e.g., "ongoing")
    pub status: String,
    /// Tags attached to the comic, in site order
    pub tags: Vec<Tag>,
    /// When this metadata was crawled
    pub crawl_time: DateTime<Utc>,
    /// Chapter tracks: extension name -> chapter index -> summary
    chapters: BTreeMap<String, BTreeMap<u32, ChapterSummary>>,
}

impl ComicMetadata {
    /// Create metadata with empty chapter tracks
    pub fn new(comicid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            comicid: comicid.into(),
            name: name.into(),
            description: String::new(),
            author: String::new(),
            cover_image_url: String::new(),
            source_url: String::new(),
            status: String::new(),
            tags: Vec::new(),
            crawl_time: Utc::now(),
            chapters: BTreeMap::new(),
        }
    }

    /// Add a tag to the comic (duplicates by name are ignored)
    pub fn add_tag(&mut self, name: impl Into<String>, tag_id: impl Into<String>) {
        let name = name.into();
        if name.is_empty() || self.tags.iter().any(|t| t.name == name) {
            return;
        }
        self.tags.push(Tag {
            name,
            tag_id: tag_id.into(),
        });
    }

    /// Add a chapter summary to a track.
    ///
    /// A duplicate chapter index within the same track replaces the earlier
    /// entry, keeping indices unique per track.
    pub fn add_chapter(
        &mut self,
        ext_name: impl Into<String>,
        chapter_number: u32,
        title: impl Into<String>,
        source_url: impl Into<String>,
    ) {
        self.chapters.entry(ext_name.into()).or_default().insert(
            chapter_number,
            ChapterSummary {
                chapter_number,
                title: title.into(),
                source_url: source_url.into(),
            },
        );
    }

    /// Chapter summaries of a track in ascending index order
    pub fn chapters(&self, ext_name: &str) -> Vec<&ChapterSummary> {
        self.chapters
            .get(ext_name)
            .map(|track| track.values().collect())
            .unwrap_or_default()
    }

    /// Names of all tracks that contain at least one chapter
    pub fn track_names(&self) -> Vec<&str> {
        self.chapters
            .iter()
            .filter(|(_, track)| !track.is_empty())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Highest chapter index of a track, or `None` for an unknown/empty track
    pub fn last_chapter_number(&self, ext_name: &str) -> Option<u32> {
        self.chapters
            .get(ext_name)
            .and_then(|track| track.keys().next_back())
            .copied()
    }

    /// Title of the highest-indexed chapter of a track
    pub fn last_chapter_title(&self, ext_name: &str) -> Option<&str> {
        self.chapters
            .get(ext_name)
            .and_then(|track| track.values().next_back())
            .map(|c| c.title.as_str())
    }
}

/// Chapter-level metadata returned by `SiteAdapter::fetch_chapter`
///
/// `image_urls` order is authoritative reading order and is preserved
/// through fetch and assembly.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChapterMetadata {
    /// Site-specific catalog id
    pub comicid: String,
    /// Resolved, concrete chapter index (never negative at this stage)
    pub chapter_number: u32,
    /// Chapter title
    pub title: String,
    /// URL of the chapter page on the source site
    pub source_url: String,
    /// Image URLs in reading order
    pub image_urls: Vec<String>,
}

/// One catalog entry of a search, "latest", or tag listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultItem {
    /// Site-specific catalog id
    pub comicid: String,
    /// Comic name
    pub name: String,
    /// Cover image URL
    pub cover_image_url: String,
    /// URL of the comic page on the source site
    pub source_url: String,
    /// Publication status as reported by the site
    pub status: String,
}

/// One persisted cookie record
///
/// The on-disk cookie format is a JSON list of these records per site.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieRecord {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// Cookie domain
    pub domain: String,
    /// Cookie path
    pub path: String,
    /// Whether the cookie is restricted to secure transports
    pub secure: bool,
}
