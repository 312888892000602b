//! Configuration types for comic-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for a download run
///
/// All fields have sensible defaults, so `Config::default()` works out of
/// the box. Proxy, TLS verification, and cookies apply per site through
/// the session registry at setup time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Root output directory (default: "./download")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Number of concurrent image fetch workers per chapter (default: 4)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Delay applied after each chapter, success or failure (None = no delay)
    ///
    /// Simple sleep-based backpressure against per-site rate limiting.
    #[serde(default, with = "opt_duration_secs")]
    pub chapter_delay: Option<Duration>,

    /// Timeout for adapter page fetches (default: 30s)
    ///
    /// The core only applies `image_timeout` itself; adapters read this
    /// through [`ComicDownloader::config`](crate::downloader::ComicDownloader::config)
    /// for their own catalog and chapter-page requests.
    #[serde(default = "default_crawler_timeout", with = "duration_secs")]
    pub crawler_timeout: Duration,

    /// Timeout for a single image fetch (default: 30s)
    #[serde(default = "default_image_timeout", with = "duration_secs")]
    pub image_timeout: Duration,

    /// JPEG quality for long-image re-encoding, 1-100 (default: 95)
    #[serde(default = "default_quality")]
    pub quality: u8,

    /// Maximum height of one long-image part in pixels (default: 65500)
    ///
    /// 65500 is the hard limit of baseline JPEG; taller chapters are split
    /// into multiple sequentially-numbered parts.
    #[serde(default = "default_max_height")]
    pub max_height: u32,

    /// Proxy URL applied to the site's session (e.g., "socks5://host:port")
    #[serde(default)]
    pub proxy: Option<String>,

    /// Whether to verify TLS certificates (default: true)
    #[serde(default = "default_true")]
    pub verify_tls: bool,

    /// Cookie persistence file, loaded into the site's session at setup
    #[serde(default)]
    pub cookies_path: Option<PathBuf>,

    /// Retry behavior for individual image fetches
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            workers: default_workers(),
            chapter_delay: None,
            crawler_timeout: default_crawler_timeout(),
            image_timeout: default_image_timeout(),
            quality: default_quality(),
            max_height: default_max_height(),
            proxy: None,
            verify_tls: true,
            cookies_path: None,
            retry: RetryConfig::default(),
        }
    }
}

/// Retry configuration for individual image fetches
///
/// Retry wraps the per-URL fetch function handed to the worker pool; the
/// pool itself performs a single attempt per slot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the initial try (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 500ms)
    #[serde(default = "default_initial_delay", with = "duration_millis")]
    pub initial_delay: Duration,

    /// Upper bound on any single retry delay (default: 10s)
    #[serde(default = "default_max_delay", with = "duration_millis")]
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each failed attempt (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to retry delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./download")
}

fn default_workers() -> usize {
    4
}

fn default_crawler_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_image_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_quality() -> u8 {
    95
}

fn default_max_height() -> u32 {
    65500
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

mod opt_duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
