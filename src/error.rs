//! Error types for novel-dl
//!
//! The taxonomy mirrors how failures propagate through the pipeline:
//! - Transient network faults and structural parse faults are *soft* — they are
//!   recorded per chapter and never abort sibling tasks.
//! - `Cancelled` is operator-initiated and terminal for a batch, but not a fault.
//! - `NoChapters` and `NoArtifacts` are *fatal* — they abort the whole pipeline
//!   stage and surface to the caller as an explicit failure result.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for novel-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for novel-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Transient network failure (timeout, connection reset, non-2xx response)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Expected content absent from a fetched page
    ///
    /// Treated as retryable: the remote page may be transiently malformed or
    /// served from a broken mirror.
    #[error("structural parse error: {0}")]
    Parse(String),

    /// Operator-initiated cancellation — terminal for the batch, not a fault
    #[error("download cancelled")]
    Cancelled,

    /// The chapter source returned an empty chapter list
    #[error("no chapters found for book {0}")]
    NoChapters(String),

    /// The assembler found zero chapter artifacts to merge
    #[error("no chapter artifacts found under {0}")]
    NoArtifacts(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Zip archive error (EPUB container output)
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid URL
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "concurrency")
        key: Option<String>,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Returns true for the fatal conditions that abort the whole pipeline stage.
    ///
    /// Everything else is either a soft per-chapter failure or ambient plumbing
    /// that the caller handles case by case.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::NoChapters(_) | Error::NoArtifacts(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification_covers_only_the_two_abort_conditions() {
        assert!(Error::NoChapters("123".to_string()).is_fatal());
        assert!(Error::NoArtifacts(PathBuf::from("novels/x")).is_fatal());

        assert!(!Error::Cancelled.is_fatal());
        assert!(!Error::Parse("missing content div".to_string()).is_fatal());
        assert!(
            !Error::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, "t")).is_fatal(),
            "I/O faults are soft, handled per chapter"
        );
    }

    #[test]
    fn display_includes_context() {
        let err = Error::NoChapters("40253".to_string());
        assert_eq!(err.to_string(), "no chapters found for book 40253");

        let err = Error::Config {
            message: "start chapter beyond end chapter".to_string(),
            key: Some("start_chapter".to_string()),
        };
        assert!(err.to_string().contains("start chapter beyond end"));
    }
}
