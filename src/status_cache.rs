//! Time-bounded memo of a book's derived status, used during search enrichment.
//!
//! The cache is deliberately simple: one exclusion lock around the map, lazy
//! expiry, no eviction thread. Concurrent misses for the same key may each
//! issue a fetch — an accepted race, since the second write just overwrites
//! the first with an equally fresh entry. The lock is never held across the
//! fetch itself.

use crate::error::Result;
use crate::types::{BookId, BookStatus};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Cached derived status of one book.
#[derive(Clone, Debug)]
pub struct StatusEntry {
    /// Completion state at fetch time
    pub status: BookStatus,
    /// Latest-chapter label at fetch time
    pub latest_chapter: String,
    /// Time of the fetch that produced this entry — never a cache-hit time
    pub recorded_at: Instant,
}

/// Thread-safe, TTL-bounded status cache keyed by book id.
#[derive(Debug)]
pub struct StatusCache {
    ttl: Duration,
    entries: Mutex<HashMap<BookId, StatusEntry>>,
}

impl StatusCache {
    /// Create a cache whose entries stay fresh for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up `book_id`; on a fresh hit return the cached entry without
    /// invoking `fetch`. Otherwise invoke `fetch`, store the result keyed by
    /// `book_id`, and return it.
    ///
    /// A failed fetch propagates to the caller and does not populate the
    /// cache. Stale entries are treated as absent and overwritten on the next
    /// successful fetch; they are never proactively evicted.
    pub async fn get_or_fetch<F, Fut>(&self, book_id: &BookId, fetch: F) -> Result<StatusEntry>
    where
        F: FnOnce(BookId) -> Fut,
        Fut: Future<Output = Result<(BookStatus, String)>>,
    {
        if let Some(entry) = self.lookup(book_id) {
            tracing::debug!(book_id = %book_id, "status cache hit");
            return Ok(entry);
        }

        tracing::debug!(book_id = %book_id, "status cache miss, fetching");
        let (status, latest_chapter) = fetch(book_id.clone()).await?;
        let entry = StatusEntry {
            status,
            latest_chapter,
            recorded_at: Instant::now(),
        };
        self.store(book_id.clone(), entry.clone());
        Ok(entry)
    }

    /// Fresh-entry lookup; stale entries are treated as absent.
    fn lookup(&self, book_id: &BookId) -> Option<StatusEntry> {
        let entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries
            .get(book_id)
            .filter(|entry| entry.recorded_at.elapsed() < self.ttl)
            .cloned()
    }

    fn store(&self, book_id: BookId, entry: StatusEntry) {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.insert(book_id, entry);
    }

    /// Number of entries currently held, fresh or stale.
    pub fn len(&self) -> usize {
        match self.entries.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// True when the cache holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
