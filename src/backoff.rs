//! Bounded retry with exponential backoff for the metadata/listing fetch.
//!
//! Chapter downloads inside a batch deliberately do not use this — a chapter
//! gets a single attempt, and recovery happens in the sequential retry pass.

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not.
///
/// Transient failures (timeouts, connection resets, transiently malformed
/// pages) should return `true`. Permanent failures should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Timeouts and connection-level faults are worth another try
            Error::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            // The remote page may be transiently malformed or mis-served
            Error::Parse(_) => true,
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            // Cancellation must never loop
            Error::Cancelled => false,
            // Fatal conditions abort the pipeline, retrying would mask them
            Error::NoChapters(_) | Error::NoArtifacts(_) => false,
            Error::Zip(_) => false,
            Error::Serialization(_) => false,
            Error::Url(_) => false,
            Error::Config { .. } => false,
            Error::Other(_) => false,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic.
///
/// `config.max_attempts` counts retries after the first try. Returns the
/// successful result, or the last error once attempts are exhausted or a
/// non-retryable error occurs.
pub async fn with_backoff<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut retries: u32 = 0;
    let mut delay = config.initial_delay;

    loop {
        let err = match operation().await {
            Ok(value) => {
                if retries > 0 {
                    tracing::info!(attempts = retries + 1, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !err.is_retryable() {
            tracing::error!(error = %err, "operation failed with non-retryable error");
            return Err(err);
        }
        if retries >= config.max_attempts {
            tracing::error!(error = %err, attempts = retries + 1, "retry attempts exhausted");
            return Err(err);
        }

        retries += 1;
        tracing::warn!(
            error = %err,
            attempt = retries,
            max_attempts = config.max_attempts,
            delay_ms = delay.as_millis(),
            "operation failed, retrying"
        );
        let sleep_for = if config.jitter { add_jitter(delay) } else { delay };
        tokio::time::sleep(sleep_for).await;
        delay = Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier)
            .min(config.max_delay);
    }
}

/// Add random jitter to a delay to avoid synchronized bursts against the
/// remote source. The result lies between `delay` and `2 * delay`.
pub(crate) fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}

/// A uniformly random duration in `[min, max]`, used for per-chapter pacing.
///
/// Falls back to `min` when the bounds are inverted.
pub(crate) fn pacing_delay(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let mut rng = rand::thread_rng();
    let span = (max - min).as_secs_f64();
    min + Duration::from_secs_f64(rng.gen_range(0.0..=span))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Serves a scripted sequence of outcomes, one per call, and counts calls.
    /// Calls past the end of the script keep returning parse failures.
    struct ScriptedFetch {
        script: std::sync::Mutex<std::collections::VecDeque<crate::error::Result<&'static str>>>,
        calls: AtomicU32,
    }

    impl ScriptedFetch {
        fn new(script: Vec<crate::error::Result<&'static str>>) -> Arc<Self> {
            Arc::new(Self {
                script: std::sync::Mutex::new(script.into()),
                calls: AtomicU32::new(0),
            })
        }

        fn next(&self) -> crate::error::Result<&'static str> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Parse("script exhausted".to_string())))
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    fn flaky_page() -> Error {
        Error::Parse("book page has no title".to_string())
    }

    #[tokio::test]
    async fn first_success_short_circuits() {
        let fetch = ScriptedFetch::new(vec![Ok("<h1>t</h1>")]);

        let page = with_backoff(&fast_config(3), || async { fetch.next() }).await;

        assert_eq!(page.unwrap(), "<h1>t</h1>");
        assert_eq!(fetch.calls(), 1, "a clean first try must not loop");
    }

    #[tokio::test]
    async fn transiently_malformed_page_is_refetched() {
        let fetch = ScriptedFetch::new(vec![
            Err(flaky_page()),
            Err(flaky_page()),
            Ok("<h1>t</h1>"),
        ]);

        let page = with_backoff(&fast_config(3), || async { fetch.next() }).await;

        assert_eq!(page.unwrap(), "<h1>t</h1>");
        assert_eq!(fetch.calls(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_the_configured_attempts() {
        let fetch = ScriptedFetch::new(Vec::new());

        let page = with_backoff(&fast_config(2), || async { fetch.next() }).await;

        assert!(matches!(page.unwrap_err(), Error::Parse(_)));
        assert_eq!(fetch.calls(), 3, "one initial try plus two retries");
    }

    #[tokio::test]
    async fn cancellation_is_never_retried() {
        let fetch = ScriptedFetch::new(vec![Err(Error::Cancelled), Ok("never reached")]);

        let page = with_backoff(&fast_config(3), || async { fetch.next() }).await;

        assert!(matches!(page.unwrap_err(), Error::Cancelled));
        assert_eq!(fetch.calls(), 1);
    }

    #[test]
    fn add_jitter_stays_within_bounds() {
        let delay = Duration::from_millis(50);
        for i in 0..100 {
            let jittered = add_jitter(delay);
            assert!(jittered >= delay, "iteration {i}: below base delay");
            assert!(jittered <= delay * 2, "iteration {i}: above 2x base delay");
        }
    }

    #[test]
    fn pacing_delay_stays_within_range() {
        let min = Duration::from_millis(500);
        let max = Duration::from_millis(1000);
        for _ in 0..100 {
            let delay = pacing_delay(min, max);
            assert!(delay >= min);
            assert!(delay <= max);
        }
    }

    #[test]
    fn pacing_delay_with_inverted_bounds_returns_min() {
        let delay = pacing_delay(Duration::from_millis(500), Duration::from_millis(100));
        assert_eq!(delay, Duration::from_millis(500));
    }

    #[test]
    fn parse_errors_are_retryable_fatal_errors_are_not() {
        assert!(Error::Parse("missing content div".to_string()).is_retryable());
        assert!(!Error::NoChapters("1".to_string()).is_retryable());
        assert!(!Error::Cancelled.is_retryable());
        assert!(
            Error::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, "t")).is_retryable()
        );
        assert!(
            !Error::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "d"))
                .is_retryable()
        );
    }
}
