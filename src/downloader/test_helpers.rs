//! Shared test doubles for the downloader tests.

use crate::error::{Error, Result};
use crate::fetcher::ContentFetcher;
use crate::observer::DownloadObserver;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

/// Wrap plain text in the chapter-page markup the normalizer expects.
pub(crate) fn chapter_html(text: &str) -> String {
    format!("<div id=\"chaptercontent\">{text}</div>")
}

/// In-memory [`ContentFetcher`] with programmable failures and an optional
/// random per-request delay to shake out ordering assumptions.
pub(crate) struct MockFetcher {
    pages: HashMap<String, String>,
    failing: HashSet<String>,
    max_delay_ms: u64,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub(crate) fn new() -> Self {
        Self {
            pages: HashMap::new(),
            failing: HashSet::new(),
            max_delay_ms: 0,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_chapter(mut self, locator: &str, text: &str) -> Self {
        self.pages.insert(locator.to_string(), chapter_html(text));
        self
    }

    pub(crate) fn with_page(mut self, locator: &str, html: &str) -> Self {
        self.pages.insert(locator.to_string(), html.to_string());
        self
    }

    pub(crate) fn failing_on(mut self, locator: &str) -> Self {
        self.failing.insert(locator.to_string());
        self
    }

    /// Delay each fetch by a random duration up to `max` milliseconds.
    pub(crate) fn with_random_delay(mut self, max: u64) -> Self {
        self.max_delay_ms = max;
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        match self.calls.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl ContentFetcher for MockFetcher {
    async fn fetch(&self, locator: &str) -> Result<String> {
        if self.max_delay_ms > 0 {
            let delay = {
                use rand::Rng;
                rand::thread_rng().gen_range(0..self.max_delay_ms)
            };
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(locator.to_string());
        }
        if self.failing.contains(locator) {
            return Err(Error::Parse(format!("no content found at {locator}")));
        }
        self.pages
            .get(locator)
            .cloned()
            .ok_or_else(|| Error::Parse(format!("no page for {locator}")))
    }
}

/// Observer that records every progress notification and log line.
#[derive(Default)]
pub(crate) struct RecordingObserver {
    pub(crate) progress: Mutex<Vec<(usize, usize)>>,
    pub(crate) logs: Mutex<Vec<String>>,
    pub(crate) retry_answer: bool,
}

impl RecordingObserver {
    pub(crate) fn answering_retry(answer: bool) -> Self {
        Self {
            retry_answer: answer,
            ..Self::default()
        }
    }

    pub(crate) fn progress_events(&self) -> Vec<(usize, usize)> {
        match self.progress.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl DownloadObserver for RecordingObserver {
    fn on_progress(&self, completed: usize, total: usize) {
        if let Ok(mut progress) = self.progress.lock() {
            progress.push((completed, total));
        }
    }

    fn on_log(&self, message: &str) {
        if let Ok(mut logs) = self.logs.lock() {
            logs.push(message.to_string());
        }
    }

    async fn ask_retry(&self) -> bool {
        self.retry_answer
    }
}

/// Observer that cancels a token once a given number of tasks have resolved.
pub(crate) struct CancellingObserver {
    token: CancellationToken,
    cancel_after: usize,
    seen: AtomicUsize,
    pub(crate) progress: Mutex<Vec<(usize, usize)>>,
}

impl CancellingObserver {
    pub(crate) fn new(token: CancellationToken, cancel_after: usize) -> Self {
        Self {
            token,
            cancel_after,
            seen: AtomicUsize::new(0),
            progress: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn progress_events(&self) -> Vec<(usize, usize)> {
        match self.progress.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl DownloadObserver for CancellingObserver {
    fn on_progress(&self, completed: usize, total: usize) {
        if let Ok(mut progress) = self.progress.lock() {
            progress.push((completed, total));
        }
        if self.seen.fetch_add(1, Ordering::SeqCst) + 1 >= self.cancel_after {
            self.token.cancel();
        }
    }
}

/// Build the chapter tasks for `n` chapters rooted at `dir`.
pub(crate) fn make_tasks(dir: &Path, n: u32) -> Vec<crate::types::ChapterTask> {
    (1..=n)
        .map(|i| crate::types::ChapterTask {
            descriptor: crate::types::ChapterDescriptor {
                index: i,
                title: format!("chapter {i}"),
                locator: format!("/book/1/{i}.html"),
            },
            destination: dir.join(crate::utils::destination_name(i, &format!("chapter {i}"))),
        })
        .collect()
}
