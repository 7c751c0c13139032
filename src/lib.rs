//! # novel-dl
//!
//! Backend library for downloading serialized web novels chapter by chapter.
//!
//! ## Design Philosophy
//!
//! novel-dl is designed to be:
//! - **Polite by default** - Jittered pacing between requests and a gentle
//!   single-threaded retry pass
//! - **Resumable** - Failed chapters are recorded in an on-disk ledger that a
//!   later run can pick up
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Observable** - Consumers plug in a [`DownloadObserver`] for progress,
//!   logs, and retry decisions
//!
//! ## Quick Start
//!
//! ```no_run
//! use novel_dl::{BookDownloader, BookId, Config, DownloadOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let downloader = BookDownloader::new(config)?;
//!
//!     let report = downloader
//!         .download_book(&BookId("40253".to_string()), DownloadOptions::default())
//!         .await?;
//!
//!     if let Some(artifact) = report.artifact {
//!         println!("assembled: {}", artifact.display());
//!     } else {
//!         println!("{} chapters still failing", report.still_failed.len());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Final book assembly (txt and epub)
pub mod assemble;
/// Retry logic with exponential backoff and request pacing
pub mod backoff;
/// Configuration types
pub mod config;
/// Core download pipeline (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// HTML extraction and normalization
pub mod extract;
/// Content fetching over HTTP
pub mod fetcher;
/// Progress and log observation
pub mod observer;
/// Book search
pub mod search;
/// TTL cache for book status lookups
pub mod status_cache;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{CacheConfig, Config, DownloadConfig, RetryConfig, SourceConfig};
pub use downloader::BookDownloader;
pub use error::{Error, Result};
pub use fetcher::{ContentFetcher, HttpFetcher};
pub use observer::{DownloadObserver, NullObserver};
pub use search::{SearchClient, SearchHit, SearchPage};
pub use status_cache::{StatusCache, StatusEntry};
pub use types::{
    BatchResult, BookId, BookInfo, BookStatus, ChapterDescriptor, ChapterTask, DownloadOptions,
    DownloadReport, OutputFormat, Progress,
};
