//! Observer trait through which a presentation layer follows a download.
//!
//! The library never talks to a UI directly: the orchestrator calls
//! `on_progress` synchronously once per resolved task, `on_log` for
//! human-readable status lines, and `ask_retry` once per batch that ends with
//! failures, gating the sequential retry pass.

use async_trait::async_trait;

/// Callbacks invoked by the download pipeline.
///
/// Implementations must be cheap and non-blocking in `on_progress`/`on_log`;
/// they are called from the batch's completion loop.
#[async_trait]
pub trait DownloadObserver: Send + Sync {
    /// Called once per resolved chapter task, after the progress counter advances.
    fn on_progress(&self, _completed: usize, _total: usize) {}

    /// Called with human-readable status lines (per-chapter success/failure,
    /// stage transitions).
    fn on_log(&self, _message: &str) {}

    /// Called once per batch with nonzero failures. Returning `true` runs the
    /// sequential retry coordinator over the failed subset.
    async fn ask_retry(&self) -> bool {
        false
    }
}

/// Observer that discards everything and never requests a retry pass.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

#[async_trait]
impl DownloadObserver for NullObserver {}
