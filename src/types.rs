//! Core types for novel-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Unique identifier for a book on the remote source
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(pub String);

impl BookId {
    /// Create a new BookId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BookId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for BookId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One addressable unit of content with a stable position index.
///
/// Immutable once produced by the chapter source. `index` is 1-based, dense,
/// and unique within a book.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterDescriptor {
    /// 1-based position within the book
    pub index: u32,
    /// Chapter title as listed by the source
    pub title: String,
    /// Opaque reference resolvable by the content fetcher (typically a path)
    pub locator: String,
}

/// A chapter scheduled for download, paired with its persistence destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChapterTask {
    /// The chapter to download
    pub descriptor: ChapterDescriptor,
    /// Where the persisted chapter artifact goes
    pub destination: PathBuf,
}

/// Terminal outcome of a single chapter task
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Chapter fetched, normalized, and persisted
    Success,
    /// Chapter failed with a human-readable reason
    Failure(String),
}

/// Aggregated result of one download batch.
///
/// Invariant: `succeeded` and the indices of `failed` partition the attempted
/// index set — every resolved task appears exactly once, in neither or both.
/// `failed` preserves the original task order regardless of completion order,
/// so downstream retry reporting stays deterministic.
#[derive(Clone, Debug, Default)]
pub struct BatchResult {
    /// Number of tasks that resolved before the batch ended
    pub attempted: usize,
    /// Chapter indices that succeeded, in original task order
    pub succeeded: Vec<u32>,
    /// Tasks that failed, in original task order
    pub failed: Vec<ChapterTask>,
}

impl BatchResult {
    /// True when every attempted task succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.succeeded.len() == self.attempted
    }
}

/// Serialized completion state of a book on the remote source
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    /// Still being published
    Ongoing,
    /// Finished
    Completed,
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookStatus::Ongoing => write!(f, "ongoing"),
            BookStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Book-level metadata extracted from the detail page
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookInfo {
    /// Book title
    pub title: String,
    /// Author name
    pub author: String,
    /// Completion state
    pub status: BookStatus,
    /// Synopsis text
    pub synopsis: String,
    /// Label of the most recently published chapter
    pub latest_chapter: String,
    /// Category/genre label, when listed
    pub category: Option<String>,
    /// Word count label, when listed
    pub word_count: Option<String>,
    /// Last-update label, when listed
    pub updated: Option<String>,
}

/// Snapshot of batch progress: `completed` is monotonically non-decreasing
/// for the lifetime of one batch and reaches `total` exactly when every task
/// has resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    /// Number of resolved tasks
    pub completed: usize,
    /// Number of tasks in the batch
    pub total: usize,
}

/// Serialized progress counter owned by one batch.
///
/// Guarded by an exclusive lock held only for the increment, never across a
/// network call, so `completed` is never double-counted or lost under
/// concurrent completions.
#[derive(Debug)]
pub struct ProgressCounter {
    inner: std::sync::Mutex<Progress>,
}

impl ProgressCounter {
    /// Create a counter for a batch of `total` tasks.
    pub fn new(total: usize) -> Self {
        Self {
            inner: std::sync::Mutex::new(Progress {
                completed: 0,
                total,
            }),
        }
    }

    /// Advance the completed count by one and return the new snapshot.
    pub fn advance(&self) -> Progress {
        let mut progress = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        progress.completed += 1;
        *progress
    }

    /// Current snapshot without advancing.
    pub fn snapshot(&self) -> Progress {
        match self.inner.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Terminal output format for the assembled book
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Single concatenated text file
    #[default]
    Txt,
    /// Paginated EPUB container
    Epub,
}

/// Per-call options for [`BookDownloader::download_book`](crate::BookDownloader::download_book)
#[derive(Clone, Debug)]
pub struct DownloadOptions {
    /// First chapter to download (1-based, default 1)
    pub start_chapter: u32,
    /// Last chapter to download, inclusive (None = through the end)
    pub end_chapter: Option<u32>,
    /// Worker pool width override (clamped to 1–10)
    pub concurrency: Option<usize>,
    /// Output format for assembly
    pub format: OutputFormat,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            start_chapter: 1,
            end_chapter: None,
            concurrency: None,
            format: OutputFormat::default(),
        }
    }
}

/// Explicit outcome of a full book download run.
///
/// A run with remaining failures is not an error — the pipeline continues
/// with partial results and reports them here.
#[derive(Clone, Debug)]
pub struct DownloadReport {
    /// Book metadata fetched at the start of the run
    pub info: BookInfo,
    /// Batch result after the main pass and any retry pass
    pub batch: BatchResult,
    /// Chapters still failing after the retry pass (empty when complete)
    pub still_failed: Vec<ChapterTask>,
    /// Final artifact path, present only when assembly ran and succeeded
    pub artifact: Option<PathBuf>,
}
