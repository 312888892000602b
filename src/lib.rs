//! # comic-dl
//!
//! Backend library for comic and manga chapter downloaders.
//!
//! ## Design Philosophy
//!
//! comic-dl is designed to be:
//! - **Site-agnostic** - All site specifics live behind the [`SiteAdapter`]
//!   trait; the pipeline never inspects adapter internals
//! - **Sensible defaults** - Works out of the box with zero configuration
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Order-preserving** - Images and pages always come out in reading
//!   order, regardless of network completion timing
//!
//! ## Quick Start
//!
//! ```no_run
//! use comic_dl::{AdapterRegistry, ArtifactOptions, ComicDownloader, Config, SessionRegistry};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Site adapter crates register their factories here.
//!     let registry = AdapterRegistry::new();
//!     let adapter = registry.create("qq")?;
//!
//!     let downloader = ComicDownloader::new(
//!         adapter,
//!         Arc::new(SessionRegistry::new()),
//!         Config::default(),
//!     )?;
//!
//!     // Download the newest chapter and render it as a PDF too.
//!     let options = ArtifactOptions {
//!         pdf: true,
//!         ..ArtifactOptions::default()
//!     };
//!     let report = downloader
//!         .download_chapters("505430", "-1", false, "", &options)
//!         .await?;
//!     println!("downloaded {} chapter(s)", report.succeeded.len());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Site adapter plugin contract and registry
pub mod adapter;
/// Chapter assembly into folder, long-image, PDF, and zip artifacts
pub mod assemble;
/// Configuration types
pub mod config;
/// Download orchestration
pub mod downloader;
/// Error types
pub mod error;
/// Bounded worker pool for image fetches
pub mod fetch;
/// Multi-chapter merge with continuous renumbering
pub mod merge;
/// Retry logic with exponential backoff
pub mod retry;
/// Per-site HTTP session state
pub mod session;
/// Chapter specifier grammar and resolution
pub mod specifier;
/// Core metadata types
pub mod types;
/// Filename and directory helpers
pub mod utils;

// Re-export commonly used types
pub use adapter::{AdapterFactory, AdapterRegistry, SiteAdapter, TagCache};
pub use assemble::ChapterAssembler;
pub use config::{Config, RetryConfig};
pub use downloader::{ArtifactOptions, ComicDownloader, DownloadReport};
pub use error::{Error, Result, SourceError};
pub use merge::{merge_folders, merge_to_zip};
pub use retry::IsRetryable;
pub use session::{SessionRegistry, SessionState};
pub use types::{
    tag_id_by_name, ChapterMetadata, ChapterSummary, ComicMetadata, CookieRecord,
    SearchResultItem, Tag, TagCategory, DEFAULT_TRACK,
};
