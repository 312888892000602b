//! Site adapter plugin contract
//!
//! Each source website ships one [`SiteAdapter`] implementation outside the
//! core. The pipeline is polymorphic over this capability set and never
//! inspects adapter internals; a run selects one adapter instance by site
//! identifier through the [`AdapterRegistry`].

use crate::error::{Error, Result};
use crate::session::SessionRegistry;
use crate::types::{ChapterMetadata, ComicMetadata, SearchResultItem, TagCategory};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Capability set every site adapter must expose
///
/// All fetch operations fail with [`crate::SourceError::Unavailable`] on
/// network or parse failure; `fetch_chapter` fails with
/// [`crate::SourceError::ChapterNotFound`] for indices outside the known
/// range of the requested track.
#[async_trait]
pub trait SiteAdapter: Send + Sync + std::fmt::Debug {
    /// Site identifier this adapter serves (e.g., "qq")
    fn site(&self) -> &str;

    /// Human-readable source name for output directory naming
    fn source_name(&self) -> &str;

    /// Extract a catalog id from a comic page URL of this site, if the URL
    /// belongs to it
    fn comicid_from_url(&self, url: &str) -> Option<String>;

    /// Fetch comic-level metadata for a catalog id
    async fn fetch_comic(&self, comicid: &str) -> Result<ComicMetadata>;

    /// Fetch one chapter's metadata (title and ordered image URLs)
    ///
    /// `ext_name` selects the chapter track; the empty string is the
    /// default track.
    async fn fetch_chapter(
        &self,
        comicid: &str,
        chapter_number: u32,
        ext_name: &str,
    ) -> Result<ChapterMetadata>;

    /// Search the site's catalog by name
    async fn search(&self, name: &str, page: u32, size: u32) -> Result<Vec<SearchResultItem>>;

    /// The site's "recently updated" listing
    async fn latest(&self, page: u32) -> Result<Vec<SearchResultItem>>;

    /// Tag categories the site offers for browsing
    async fn tags(&self) -> Result<Vec<TagCategory>>;

    /// Catalog entries under one tag id
    async fn tag_result(&self, tag_id: &str, page: u32) -> Result<Vec<SearchResultItem>>;

    /// Interactive login, updating the site's session in `sessions`.
    ///
    /// The core only relies on the session state a successful login leaves
    /// behind. Adapters without a login flow keep the default.
    async fn login(&self, sessions: &SessionRegistry) -> Result<()> {
        let _ = sessions;
        Err(Error::NotSupported(format!(
            "adapter for site {:?} has no login flow",
            self.site()
        )))
    }
}

/// Factory producing one adapter instance per run
pub type AdapterFactory = Box<dyn Fn() -> Arc<dyn SiteAdapter> + Send + Sync>;

/// Registry mapping site identifiers to adapter factories
#[derive(Default)]
pub struct AdapterRegistry {
    factories: HashMap<String, AdapterFactory>,
}

impl AdapterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter factory under a site identifier.
    ///
    /// A later registration for the same site replaces the earlier one.
    pub fn register<F>(&mut self, site: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn SiteAdapter> + Send + Sync + 'static,
    {
        self.factories.insert(site.into(), Box::new(factory));
    }

    /// Instantiate the adapter for a site identifier
    ///
    /// # Errors
    ///
    /// [`Error::UnknownSite`] when no adapter is registered for `site`;
    /// a setup-time fatal error.
    pub fn create(&self, site: &str) -> Result<Arc<dyn SiteAdapter>> {
        self.factories
            .get(site)
            .map(|factory| factory())
            .ok_or_else(|| Error::UnknownSite(site.to_string()))
    }

    /// Registered site identifiers in sorted order
    pub fn sites(&self) -> Vec<&str> {
        let mut sites: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        sites.sort_unstable();
        sites
    }

    /// Resolve a comic page URL to `(site, comicid)` by asking every
    /// registered adapter
    ///
    /// # Errors
    ///
    /// [`crate::SourceError::UnresolvableComicId`] when the URL does not
    /// parse or no adapter claims it.
    pub fn resolve_url(&self, url: &str) -> Result<(String, String)> {
        if url::Url::parse(url).is_err() {
            return Err(crate::error::SourceError::UnresolvableComicId(url.to_string()).into());
        }
        for factory in self.factories.values() {
            let adapter = factory();
            if let Some(comicid) = adapter.comicid_from_url(url) {
                return Ok((adapter.site().to_string(), comicid));
            }
        }
        Err(crate::error::SourceError::UnresolvableComicId(url.to_string()).into())
    }
}

/// Once-initialized cache for a site's tag list
///
/// Tag lists are fetched at most once per adapter instance and reused for
/// name lookups; `reset` is the only way to invalidate.
#[derive(Default)]
pub struct TagCache {
    inner: RwLock<Option<Arc<Vec<TagCategory>>>>,
}

impl TagCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached tag list, fetching through `fetch` on first use
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<Arc<Vec<TagCategory>>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Vec<TagCategory>>>,
    {
        {
            let cached = self.inner.read().await;
            if let Some(tags) = cached.as_ref() {
                return Ok(Arc::clone(tags));
            }
        }
        let fetched = Arc::new(fetch().await?);
        let mut cached = self.inner.write().await;
        // A concurrent fetch may have won the race; keep the first result.
        if let Some(tags) = cached.as_ref() {
            return Ok(Arc::clone(tags));
        }
        *cached = Some(Arc::clone(&fetched));
        Ok(fetched)
    }

    /// Drop the cached list so the next access fetches again
    pub async fn reset(&self) {
        *self.inner.write().await = None;
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::ChapterMetadata;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Minimal in-memory adapter used across the crate's tests.
    #[derive(Debug)]
    pub(crate) struct StubAdapter {
        pub site: String,
        pub chapters: u32,
    }

    impl StubAdapter {
        pub(crate) fn new(site: &str, chapters: u32) -> Self {
            Self {
                site: site.to_string(),
                chapters,
            }
        }
    }

    #[async_trait]
    impl SiteAdapter for StubAdapter {
        fn site(&self) -> &str {
            &self.site
        }

        fn source_name(&self) -> &str {
            "Stub"
        }

        fn comicid_from_url(&self, url: &str) -> Option<String> {
            url.strip_prefix(&format!("https://{}.example.com/comic/", self.site))
                .map(str::to_string)
        }

        async fn fetch_comic(&self, comicid: &str) -> Result<ComicMetadata> {
            let mut comic = ComicMetadata::new(comicid, "Stub Comic");
            for n in 1..=self.chapters {
                comic.add_chapter("", n, format!("ch {n}"), format!("https://x/{n}"));
            }
            Ok(comic)
        }

        async fn fetch_chapter(
            &self,
            comicid: &str,
            chapter_number: u32,
            _ext_name: &str,
        ) -> Result<ChapterMetadata> {
            if chapter_number > self.chapters {
                return Err(crate::error::SourceError::ChapterNotFound {
                    chapter: chapter_number,
                    last: self.chapters,
                }
                .into());
            }
            Ok(ChapterMetadata {
                comicid: comicid.to_string(),
                chapter_number,
                title: format!("ch {chapter_number}"),
                source_url: format!("https://x/{chapter_number}"),
                image_urls: vec![],
            })
        }

        async fn search(&self, _: &str, _: u32, _: u32) -> Result<Vec<SearchResultItem>> {
            Ok(vec![])
        }

        async fn latest(&self, _: u32) -> Result<Vec<SearchResultItem>> {
            Ok(vec![])
        }

        async fn tags(&self) -> Result<Vec<TagCategory>> {
            Ok(vec![])
        }

        async fn tag_result(&self, _: &str, _: u32) -> Result<Vec<SearchResultItem>> {
            Ok(vec![])
        }
    }

    fn registry_with(site: &'static str, chapters: u32) -> AdapterRegistry {
        let mut registry = AdapterRegistry::new();
        registry.register(site, move || {
            Arc::new(StubAdapter::new(site, chapters)) as Arc<dyn SiteAdapter>
        });
        registry
    }

    #[test]
    fn create_returns_adapter_for_registered_site() {
        let registry = registry_with("qq", 5);
        let adapter = registry.create("qq").unwrap();
        assert_eq!(adapter.site(), "qq");
    }

    #[test]
    fn create_fails_for_unknown_site() {
        let registry = registry_with("qq", 5);
        let err = registry.create("nosuch").unwrap_err();
        assert!(matches!(err, Error::UnknownSite(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn sites_are_listed_sorted() {
        let mut registry = registry_with("qq", 5);
        registry.register("bilibili", || {
            Arc::new(StubAdapter::new("bilibili", 1)) as Arc<dyn SiteAdapter>
        });
        assert_eq!(registry.sites(), vec!["bilibili", "qq"]);
    }

    #[test]
    fn resolve_url_finds_the_owning_adapter() {
        let mut registry = registry_with("qq", 5);
        registry.register("bilibili", || {
            Arc::new(StubAdapter::new("bilibili", 1)) as Arc<dyn SiteAdapter>
        });

        let (site, comicid) = registry
            .resolve_url("https://bilibili.example.com/comic/505430")
            .unwrap();
        assert_eq!(site, "bilibili");
        assert_eq!(comicid, "505430");
    }

    #[test]
    fn resolve_url_fails_when_no_adapter_claims_it() {
        let registry = registry_with("qq", 5);
        let err = registry.resolve_url("https://other.com/x").unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn login_defaults_to_not_supported() {
        let adapter = StubAdapter::new("qq", 1);
        let sessions = SessionRegistry::new();
        let err = adapter.login(&sessions).await.unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
    }

    #[tokio::test]
    async fn tag_cache_fetches_once_until_reset() {
        let cache = TagCache::new();
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            let tags = cache
                .get_or_fetch(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let mut category = TagCategory::new("genre");
                    category.add_tag("action", "1");
                    Ok(vec![category])
                })
                .await
                .unwrap();
            assert_eq!(tags.len(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.reset().await;
        cache
            .get_or_fetch(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![])
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn tag_cache_does_not_cache_failures() {
        let cache = TagCache::new();
        let result = cache
            .get_or_fetch(|| async {
                Err(crate::error::SourceError::Unavailable {
                    url: "https://x/tags".into(),
                    reason: "500".into(),
                }
                .into())
            })
            .await;
        assert!(result.is_err());

        let tags = cache.get_or_fetch(|| async { Ok(vec![]) }).await.unwrap();
        assert!(tags.is_empty());
    }
}
