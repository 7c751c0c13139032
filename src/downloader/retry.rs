//! The sequential retry pass and the on-disk failure ledger.
//!
//! Retries run one chapter at a time in ascending chapter order with a fixed
//! pause between attempts, trading throughput for gentleness after the
//! concurrent pass already upset the remote once.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::downloader::batch::download_chapter;
use crate::error::Result;
use crate::fetcher::ContentFetcher;
use crate::observer::DownloadObserver;
use crate::types::{ChapterDescriptor, ChapterTask, DownloadOutcome, ProgressCounter};
use crate::utils::chapter_number;

/// Name of the failure ledger kept next to the chapter artifacts.
const LEDGER_FILE: &str = "failed_chapters.txt";

/// Parameters for one retry pass.
pub struct RetryParams {
    /// Content fetcher, shared with the batch pass
    pub fetcher: Arc<dyn ContentFetcher>,
    /// Tasks that failed the concurrent pass, in any order
    pub tasks: Vec<ChapterTask>,
    /// Pause inserted before every attempt
    pub pause: Duration,
    /// Cooperative cancellation flag
    pub cancel: CancellationToken,
    /// Progress/log sink
    pub observer: Arc<dyn DownloadObserver>,
}

/// Retry previously failed chapters strictly one at a time.
///
/// Tasks are sorted ascending by the chapter number embedded in their
/// destination file name before any attempt is made; a destination that
/// carries no number sorts first. Returns the tasks that still failed,
/// including any that were never attempted because cancellation was observed.
pub async fn retry_failed(params: RetryParams) -> Vec<ChapterTask> {
    let RetryParams {
        fetcher,
        mut tasks,
        pause,
        cancel,
        observer,
    } = params;

    tasks.sort_by_key(|task| chapter_number(&task.destination).unwrap_or(0));

    let total = tasks.len();
    let progress = ProgressCounter::new(total);
    let mut still_failed = Vec::new();

    tracing::info!(chapters = total, "starting sequential retry pass");

    let mut remaining = tasks.into_iter();
    for task in remaining.by_ref() {
        if cancel.is_cancelled() {
            tracing::info!("cancellation observed, abandoning retry pass");
            still_failed.push(task);
            break;
        }

        tokio::time::sleep(pause).await;
        match download_chapter(fetcher.as_ref(), &task).await {
            DownloadOutcome::Success => {
                observer.on_log(&format!("retry recovered: {}", task.descriptor.title));
            }
            DownloadOutcome::Failure(reason) => {
                tracing::warn!(
                    chapter = %task.descriptor.title,
                    index = task.descriptor.index,
                    reason = %reason,
                    "retry failed"
                );
                observer.on_log(&format!(
                    "retry failed: {} ({reason})",
                    task.descriptor.title
                ));
                still_failed.push(task);
            }
        }

        let snapshot = progress.advance();
        observer.on_progress(snapshot.completed, snapshot.total);
    }
    still_failed.extend(remaining);

    tracing::info!(
        still_failed = still_failed.len(),
        "retry pass finished"
    );
    still_failed
}

/// Path of the failure ledger inside a book's output directory.
pub fn ledger_path(dir: &Path) -> PathBuf {
    dir.join(LEDGER_FILE)
}

/// Persist the failed tasks so a later run can resume the retry pass.
///
/// One tab-separated line per task: title, locator, destination. Lines are
/// written in ascending chapter order.
pub async fn write_ledger(dir: &Path, tasks: &[ChapterTask]) -> Result<()> {
    let mut sorted: Vec<&ChapterTask> = tasks.iter().collect();
    sorted.sort_by_key(|task| chapter_number(&task.destination).unwrap_or(0));

    let mut contents = String::new();
    for task in sorted {
        contents.push_str(&format!(
            "{}\t{}\t{}\n",
            task.descriptor.title,
            task.descriptor.locator,
            task.destination.display()
        ));
    }
    tokio::fs::write(ledger_path(dir), contents).await?;
    Ok(())
}

/// Load a previously written failure ledger.
///
/// Malformed lines are skipped with a warning rather than failing the whole
/// read. Chapter indices are recovered from the destination file name.
pub async fn read_ledger(dir: &Path) -> Result<Vec<ChapterTask>> {
    let contents = tokio::fs::read_to_string(ledger_path(dir)).await?;
    let mut tasks = Vec::new();
    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.splitn(3, '\t');
        match (fields.next(), fields.next(), fields.next()) {
            (Some(title), Some(locator), Some(destination)) => {
                let destination = PathBuf::from(destination);
                tasks.push(ChapterTask {
                    descriptor: ChapterDescriptor {
                        index: chapter_number(&destination).unwrap_or(0),
                        title: title.to_string(),
                        locator: locator.to_string(),
                    },
                    destination,
                });
            }
            _ => {
                tracing::warn!(line, "skipping malformed ledger line");
            }
        }
    }
    Ok(tasks)
}

/// Remove the failure ledger. Missing file is not an error.
pub async fn remove_ledger(dir: &Path) -> Result<()> {
    match tokio::fs::remove_file(ledger_path(dir)).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
