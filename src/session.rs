//! Per-site HTTP session state
//!
//! [`SessionRegistry`] is the process-wide map from site identifier to
//! session state (cookies, proxy, TLS-verify flag). Sessions are created
//! lazily on first access and live for the whole run.
//!
//! Concurrency contract: any number of fetch workers may hold and read a
//! session handle concurrently. Mutations (`set_proxy`, `set_verify`,
//! cookie loads and updates) are expected to happen during setup or login,
//! never interleaved with in-flight fetches for the same site; callers that
//! break that assumption must serialize externally. Mutations swap in a
//! fresh [`SessionState`], so readers keep the handle they already cloned
//! and the read path takes no lock beyond the registry map lookup.

use crate::error::{Error, Result};
use crate::types::CookieRecord;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Immutable per-site session state shared by fetch workers
#[derive(Debug)]
pub struct SessionState {
    client: reqwest::Client,
    cookies: Vec<CookieRecord>,
    proxy: Option<String>,
    verify_tls: bool,
}

impl SessionState {
    fn build(
        cookies: Vec<CookieRecord>,
        proxy: Option<String>,
        verify_tls: bool,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder().danger_accept_invalid_certs(!verify_tls);
        if let Some(proxy_url) = &proxy {
            let proxy_obj = reqwest::Proxy::all(proxy_url).map_err(|e| Error::Config {
                message: format!("invalid proxy url {proxy_url:?}: {e}"),
                key: Some("proxy".to_string()),
            })?;
            builder = builder.proxy(proxy_obj);
        }
        let client = builder.build()?;
        Ok(Self {
            client,
            cookies,
            proxy,
            verify_tls,
        })
    }

    /// The cookie records currently attached to this session
    pub fn cookies(&self) -> &[CookieRecord] {
        &self.cookies
    }

    /// The proxy URL applied to this session, if any
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    /// Whether TLS certificates are verified on this session
    pub fn verify_tls(&self) -> bool {
        self.verify_tls
    }

    /// `Cookie:` header value for the attached records, or `None` when
    /// the session holds no cookies
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Start a request carrying this session's cookies
    pub fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, url);
        if let Some(header) = self.cookie_header() {
            builder = builder.header(reqwest::header::COOKIE, header);
        }
        builder
    }

    /// GET a URL and return the response body, failing on non-2xx status
    pub async fn get_bytes(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        let response = self
            .request(reqwest::Method::GET, url)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Process-wide mapping from site identifier to HTTP session state
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sites: RwLock<HashMap<String, Arc<SessionState>>>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Session handle for a site, lazily created on first access
    pub fn session(&self, site: &str) -> Result<Arc<SessionState>> {
        {
            let sites = self.sites.read().unwrap_or_else(|e| e.into_inner());
            if let Some(state) = sites.get(site) {
                return Ok(Arc::clone(state));
            }
        }
        let state = Arc::new(SessionState::build(Vec::new(), None, true)?);
        let mut sites = self.sites.write().unwrap_or_else(|e| e.into_inner());
        // Another thread may have created the session meanwhile; keep theirs.
        Ok(Arc::clone(
            sites.entry(site.to_string()).or_insert(state),
        ))
    }

    /// Set the proxy for a site, rebuilding its session
    pub fn set_proxy(&self, site: &str, proxy: &str) -> Result<()> {
        self.rebuild(site, |cookies, _, verify| {
            SessionState::build(cookies, Some(proxy.to_string()), verify)
        })
    }

    /// Set TLS verification for a site, rebuilding its session
    pub fn set_verify(&self, site: &str, verify_tls: bool) -> Result<()> {
        self.rebuild(site, |cookies, proxy, _| {
            SessionState::build(cookies, proxy, verify_tls)
        })
    }

    /// Merge cookie records into a site's session.
    ///
    /// Records are keyed by `(name, domain, path)`; later writes win.
    pub fn update_cookies(&self, site: &str, updates: Vec<CookieRecord>) -> Result<()> {
        self.rebuild(site, move |mut cookies, proxy, verify| {
            for update in updates {
                match cookies
                    .iter_mut()
                    .find(|c| c.name == update.name && c.domain == update.domain && c.path == update.path)
                {
                    Some(existing) => *existing = update,
                    None => cookies.push(update),
                }
            }
            SessionState::build(cookies, proxy, verify)
        })
    }

    /// Load cookie records from a JSON file into a site's session.
    ///
    /// Returns the number of records loaded. Records merge with existing
    /// cookies under the same last-write-wins rule as [`update_cookies`].
    ///
    /// [`update_cookies`]: SessionRegistry::update_cookies
    pub fn load_cookies(&self, site: &str, path: &Path) -> Result<usize> {
        let data = std::fs::read_to_string(path)?;
        let records: Vec<CookieRecord> = serde_json::from_str(&data)?;
        let count = records.len();
        self.update_cookies(site, records)?;
        tracing::info!(site = %site, count = count, path = %path.display(), "cookies loaded");
        Ok(count)
    }

    /// Write a site's cookie records to a JSON file
    pub fn export_cookies(&self, site: &str, path: &Path) -> Result<()> {
        let state = self.session(site)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(state.cookies())?;
        std::fs::write(path, json)?;
        tracing::info!(site = %site, path = %path.display(), "cookies exported");
        Ok(())
    }

    fn rebuild<F>(&self, site: &str, f: F) -> Result<()>
    where
        F: FnOnce(Vec<CookieRecord>, Option<String>, bool) -> Result<SessionState>,
    {
        let current = self.session(site)?;
        let rebuilt = f(
            current.cookies.clone(),
            current.proxy.clone(),
            current.verify_tls,
        )?;
        let mut sites = self.sites.write().unwrap_or_else(|e| e.into_inner());
        sites.insert(site.to_string(), Arc::new(rebuilt));
        Ok(())
    }
}
