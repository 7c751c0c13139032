//! The concurrent batch pass — a fixed-width worker pool over chapter tasks.
//!
//! Outcomes are consumed in completion order; the failed set is re-ordered to
//! the original task order before the batch result is returned, so retry
//! reporting stays deterministic no matter how the pool interleaved.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::backoff::pacing_delay;
use crate::extract;
use crate::fetcher::ContentFetcher;
use crate::observer::DownloadObserver;
use crate::types::{BatchResult, ChapterTask, DownloadOutcome, ProgressCounter};

/// Parameters for one batch run.
pub struct BatchParams {
    /// Content fetcher shared by all workers
    pub fetcher: Arc<dyn ContentFetcher>,
    /// Tasks in download order
    pub tasks: Vec<ChapterTask>,
    /// Worker pool width (callers clamp to the supported range)
    pub concurrency: usize,
    /// Jittered pre-fetch pacing bounds `(min, max)`
    pub pacing: (Duration, Duration),
    /// Cooperative cancellation flag, checked after each completed task
    pub cancel: CancellationToken,
    /// Progress/log sink
    pub observer: Arc<dyn DownloadObserver>,
}

/// Download a batch of chapters through a fixed-size worker pool.
///
/// Every task gets exactly one attempt; failures are soft and recorded in the
/// result rather than aborting siblings. When the cancellation flag is
/// observed the loop stops consuming: tasks already dispatched may still run
/// in the background but their outcomes are discarded, and the returned
/// result reflects only what resolved before the flag was seen.
pub async fn run_batch(params: BatchParams) -> BatchResult {
    let BatchParams {
        fetcher,
        tasks,
        concurrency,
        pacing,
        cancel,
        observer,
    } = params;

    let total = tasks.len();
    let originals = tasks.clone();
    let progress = ProgressCounter::new(total);
    let mut outcomes: Vec<Option<DownloadOutcome>> = vec![None; total];

    tracing::info!(chapters = total, concurrency, "starting download batch");

    let mut completions = stream::iter(tasks.into_iter().enumerate())
        .map(|(pos, task)| {
            let fetcher = Arc::clone(&fetcher);
            // Jitter is drawn before the future is polled; thread-local RNG
            // must not be held across an await.
            let delay = pacing_delay(pacing.0, pacing.1);
            async move {
                tokio::time::sleep(delay).await;
                let outcome = download_chapter(fetcher.as_ref(), &task).await;
                (pos, task, outcome)
            }
        })
        .buffer_unordered(concurrency.max(1));

    while let Some((pos, task, outcome)) = completions.next().await {
        match &outcome {
            DownloadOutcome::Success => {
                observer.on_log(&format!("downloaded: {}", task.descriptor.title));
            }
            DownloadOutcome::Failure(reason) => {
                tracing::warn!(
                    chapter = %task.descriptor.title,
                    index = task.descriptor.index,
                    reason = %reason,
                    "chapter download failed"
                );
                observer.on_log(&format!(
                    "failed: {} ({reason})",
                    task.descriptor.title
                ));
            }
        }
        outcomes[pos] = Some(outcome);

        let snapshot = progress.advance();
        observer.on_progress(snapshot.completed, snapshot.total);

        if cancel.is_cancelled() {
            tracing::info!(
                completed = snapshot.completed,
                total,
                "cancellation observed, abandoning remaining tasks"
            );
            break;
        }
    }

    let mut result = BatchResult::default();
    for (task, outcome) in originals.into_iter().zip(outcomes) {
        match outcome {
            Some(DownloadOutcome::Success) => {
                result.attempted += 1;
                result.succeeded.push(task.descriptor.index);
            }
            Some(DownloadOutcome::Failure(_)) => {
                result.attempted += 1;
                result.failed.push(task);
            }
            None => {}
        }
    }

    tracing::info!(
        attempted = result.attempted,
        succeeded = result.succeeded.len(),
        failed = result.failed.len(),
        "batch finished"
    );
    result
}

/// One attempt at a single chapter: fetch, normalize, persist.
///
/// Used by both the concurrent batch pass and the sequential retry pass.
pub(crate) async fn download_chapter(
    fetcher: &dyn ContentFetcher,
    task: &ChapterTask,
) -> DownloadOutcome {
    let html = match fetcher.fetch(&task.descriptor.locator).await {
        Ok(html) => html,
        Err(e) => return DownloadOutcome::Failure(e.to_string()),
    };

    let Some(content) = extract::normalize_chapter(&html) else {
        return DownloadOutcome::Failure("no content found in chapter page".to_string());
    };

    let text = format_chapter(&task.descriptor.title, &content);
    if let Err(e) = tokio::fs::write(&task.destination, text).await {
        return DownloadOutcome::Failure(format!("failed to persist chapter: {e}"));
    }

    DownloadOutcome::Success
}

/// Render a persisted chapter artifact: title line, rule, body, rule.
pub(crate) fn format_chapter(title: &str, content: &str) -> String {
    let rule = "=".repeat(40);
    format!("{title}\n{rule}\n\n{content}\n\n{rule}\n")
}
