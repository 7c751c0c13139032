//! The download pipeline: concurrent batch pass, sequential retry pass, and
//! final assembly, coordinated by [`BookDownloader`].

pub mod batch;
pub mod retry;
#[cfg(test)]
mod test_helpers;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::assemble;
use crate::backoff::with_backoff;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract;
use crate::fetcher::{ContentFetcher, HttpFetcher};
use crate::observer::{DownloadObserver, NullObserver};
use crate::search::SearchClient;
use crate::status_cache::StatusCache;
use crate::types::{
    BookId, BookInfo, ChapterTask, DownloadOptions, DownloadReport,
};

pub use batch::{BatchParams, run_batch};
pub use retry::{RetryParams, ledger_path, read_ledger, remove_ledger, retry_failed, write_ledger};

/// Coordinates the full pipeline for one book at a time.
///
/// A fresh cancellation token is issued per `download_book` call; [`stop`]
/// cancels whichever run is current. The downloader itself is cheap to share
/// behind an `Arc`.
///
/// [`stop`]: BookDownloader::stop
pub struct BookDownloader {
    fetcher: Arc<dyn ContentFetcher>,
    config: Arc<Config>,
    observer: Arc<dyn DownloadObserver>,
    cache: Arc<StatusCache>,
    cancel: tokio::sync::Mutex<CancellationToken>,
}

impl BookDownloader {
    /// Build a downloader backed by an HTTP fetcher and a silent observer.
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config.source)?);
        Ok(Self::with_fetcher(config, fetcher, Arc::new(NullObserver)))
    }

    /// Build a downloader with an explicit fetcher and observer.
    pub fn with_fetcher(
        config: Config,
        fetcher: Arc<dyn ContentFetcher>,
        observer: Arc<dyn DownloadObserver>,
    ) -> Self {
        let cache = Arc::new(StatusCache::new(config.cache.status_ttl));
        Self {
            fetcher,
            config: Arc::new(config),
            observer,
            cache,
            cancel: tokio::sync::Mutex::new(CancellationToken::new()),
        }
    }

    /// A search client sharing this downloader's fetcher and status cache.
    pub fn search_client(&self) -> SearchClient {
        SearchClient::new(Arc::clone(&self.fetcher), Arc::clone(&self.cache))
    }

    /// Fetch and parse a book's detail page.
    pub async fn book_info(&self, book_id: &BookId) -> Result<BookInfo> {
        let html = self.fetch_book_page(book_id).await?;
        extract::parse_book_info(&html)
    }

    /// Fetch a book's chapter list.
    pub async fn chapters(&self, book_id: &BookId) -> Result<Vec<crate::types::ChapterDescriptor>> {
        let html = self.fetch_book_page(book_id).await?;
        Ok(extract::parse_chapter_list(&html))
    }

    /// Cancel the current run, if any.
    ///
    /// In-flight chapter tasks finish or are dropped; no new task starts once
    /// the flag is observed.
    pub async fn stop(&self) {
        self.cancel.lock().await.cancel();
        tracing::info!("stop requested");
    }

    /// Run the full pipeline for one book.
    ///
    /// The detail page is fetched once and parsed for both metadata and the
    /// chapter list. Failed chapters go through one sequential retry pass when
    /// the observer asks for it; the book is assembled into its final artifact
    /// only when no failures remain and the run was not cancelled. A run with
    /// remaining failures still returns `Ok` — partial results are reported,
    /// not raised.
    pub async fn download_book(
        &self,
        book_id: &BookId,
        options: DownloadOptions,
    ) -> Result<DownloadReport> {
        let cancel = {
            let mut guard = self.cancel.lock().await;
            *guard = CancellationToken::new();
            guard.clone()
        };

        let html = self.fetch_book_page(book_id).await?;
        let info = extract::parse_book_info(&html)?;
        let chapters = extract::parse_chapter_list(&html);
        if chapters.is_empty() {
            return Err(Error::NoChapters(book_id.to_string()));
        }

        let total = chapters.len() as u32;
        let start = options.start_chapter.max(1);
        let end = options.end_chapter.unwrap_or(total).min(total);
        if start > end {
            return Err(Error::Config {
                message: format!(
                    "start chapter {start} is beyond end chapter {end} (book has {total})"
                ),
                key: Some("start_chapter".to_string()),
            });
        }

        let save_dir = self
            .config
            .download
            .output_dir
            .join(crate::utils::sanitize_filename(&info.title));
        tokio::fs::create_dir_all(&save_dir).await?;
        self.write_info_file(&save_dir, &info, start, end).await?;

        let tasks: Vec<ChapterTask> = chapters[(start - 1) as usize..end as usize]
            .iter()
            .map(|descriptor| ChapterTask {
                descriptor: descriptor.clone(),
                destination: save_dir.join(crate::utils::destination_name(
                    descriptor.index,
                    &descriptor.title,
                )),
            })
            .collect();

        tracing::info!(
            book_id = %book_id,
            title = %info.title,
            chapters = tasks.len(),
            "starting book download"
        );
        self.observer.on_log(&format!(
            "downloading {} ({} chapters)",
            info.title,
            tasks.len()
        ));

        let batch = run_batch(BatchParams {
            fetcher: Arc::clone(&self.fetcher),
            tasks,
            concurrency: self
                .config
                .download
                .effective_concurrency(options.concurrency),
            pacing: (
                self.config.download.chapter_delay_min,
                self.config.download.chapter_delay_max,
            ),
            cancel: cancel.clone(),
            observer: Arc::clone(&self.observer),
        })
        .await;

        let mut still_failed = batch.failed.clone();
        if !still_failed.is_empty() {
            write_ledger(&save_dir, &still_failed).await?;
            self.observer.on_log(&format!(
                "{} chapters failed, ledger written",
                still_failed.len()
            ));

            if !cancel.is_cancelled() && self.observer.ask_retry().await {
                still_failed = retry_failed(RetryParams {
                    fetcher: Arc::clone(&self.fetcher),
                    tasks: still_failed,
                    pause: self.config.download.retry_pause,
                    cancel: cancel.clone(),
                    observer: Arc::clone(&self.observer),
                })
                .await;
            }

            if still_failed.is_empty() {
                remove_ledger(&save_dir).await?;
            } else {
                write_ledger(&save_dir, &still_failed).await?;
            }
        }

        let artifact = if still_failed.is_empty() && !cancel.is_cancelled() {
            let path = assemble::assemble(&save_dir, &info, options.format)?;
            self.observer
                .on_log(&format!("assembled: {}", path.display()));
            Some(path)
        } else {
            None
        };

        Ok(DownloadReport {
            info,
            batch,
            still_failed,
            artifact,
        })
    }

    /// Resume a previous run from the failure ledger under `save_dir`.
    ///
    /// Reads the ledgered chapters, runs the sequential retry pass over them,
    /// and rewrites (or removes) the ledger to match what still fails.
    /// Returns the chapters that still failed; an empty result means the book
    /// directory is ready for [`assemble`](crate::assemble::assemble).
    pub async fn resume(&self, save_dir: &Path) -> Result<Vec<ChapterTask>> {
        let cancel = {
            let mut guard = self.cancel.lock().await;
            *guard = CancellationToken::new();
            guard.clone()
        };

        let tasks = read_ledger(save_dir).await?;
        if tasks.is_empty() {
            remove_ledger(save_dir).await?;
            return Ok(Vec::new());
        }

        tracing::info!(
            save_dir = %save_dir.display(),
            chapters = tasks.len(),
            "resuming from failure ledger"
        );
        self.observer
            .on_log(&format!("resuming {} ledgered chapters", tasks.len()));

        let still_failed = retry_failed(RetryParams {
            fetcher: Arc::clone(&self.fetcher),
            tasks,
            pause: self.config.download.retry_pause,
            cancel,
            observer: Arc::clone(&self.observer),
        })
        .await;

        if still_failed.is_empty() {
            remove_ledger(save_dir).await?;
        } else {
            write_ledger(save_dir, &still_failed).await?;
        }
        Ok(still_failed)
    }

    async fn fetch_book_page(&self, book_id: &BookId) -> Result<String> {
        let locator = format!("/book/{book_id}/");
        with_backoff(&self.config.retry, || self.fetcher.fetch(&locator)).await
    }

    async fn write_info_file(
        &self,
        save_dir: &std::path::Path,
        info: &BookInfo,
        start: u32,
        end: u32,
    ) -> Result<()> {
        let mut text = format!(
            "Title: {}\nAuthor: {}\nStatus: {}\n",
            info.title, info.author, info.status
        );
        if !info.latest_chapter.is_empty() {
            text.push_str(&format!("Latest chapter: {}\n", info.latest_chapter));
        }
        text.push_str(&format!("Chapters: {start}-{end}\n\n{}\n", info.synopsis));
        tokio::fs::write(save_dir.join("info.txt"), text).await?;
        Ok(())
    }
}

impl std::fmt::Debug for BookDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookDownloader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Find the save directory a book's artifacts would live in.
pub fn save_dir_for(config: &Config, title: &str) -> PathBuf {
    config
        .download
        .output_dir
        .join(crate::utils::sanitize_filename(title))
}
