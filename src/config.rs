//! Configuration types for novel-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for [`BookDownloader`](crate::BookDownloader)
///
/// Fields are organized into logical sub-configs:
/// - [`source`](SourceConfig) — remote site, user agents, request timeout
/// - [`download`](DownloadConfig) — output directory, concurrency, pacing
/// - [`retry`](RetryConfig) — bounded backoff for the metadata/listing fetch
/// - [`cache`](CacheConfig) — status cache TTL
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote source settings (base URL, user agents, timeout)
    #[serde(default)]
    pub source: SourceConfig,

    /// Download behavior settings (output directory, concurrency, pacing)
    #[serde(default)]
    pub download: DownloadConfig,

    /// Retry settings for the initial metadata/listing fetch
    ///
    /// Chapter downloads inside a batch are never retried here — the retry
    /// coordinator handles those in a separate sequential pass.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Status cache settings
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Remote source configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the remote site
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User-agent strings, rotated round-robin across requests
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agents: default_user_agents(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Download behavior configuration (output directory, concurrency, pacing)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory under which one sub-directory per book is created
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Worker pool width for the download batch (default: 3, bounded 1–10)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Lower bound of the jittered per-chapter pacing delay (default: 500 ms)
    #[serde(default = "default_delay_min", with = "duration_millis_serde")]
    pub chapter_delay_min: Duration,

    /// Upper bound of the jittered per-chapter pacing delay (default: 1 s)
    #[serde(default = "default_delay_max", with = "duration_millis_serde")]
    pub chapter_delay_max: Duration,

    /// Fixed pause between sequential retry attempts (default: 1 s)
    #[serde(default = "default_retry_pause", with = "duration_serde")]
    pub retry_pause: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            concurrency: default_concurrency(),
            chapter_delay_min: default_delay_min(),
            chapter_delay_max: default_delay_max(),
            retry_pause: default_retry_pause(),
        }
    }
}

impl DownloadConfig {
    /// Worker pool width bounded to the supported 1–10 range.
    ///
    /// `requested` (e.g. from per-call options) takes precedence over the
    /// configured default; both are clamped.
    pub fn effective_concurrency(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.concurrency).clamp(1, 10)
    }
}

/// Retry configuration for the metadata/listing fetch
///
/// This is a fixed bounded retry with exponential backoff, applied only to the
/// initial book-info and chapter-list requests.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try (default: 2)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 2 seconds)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Status cache configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a cached book status stays fresh (default: 1 hour)
    #[serde(default = "default_status_ttl", with = "duration_serde")]
    pub status_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            status_ttl: default_status_ttl(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.3bqg.cc".to_string()
}

fn default_user_agents() -> Vec<String> {
    [
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.131 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/93.0.4577.63 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Edge/91.0.864.59",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Edge/92.0.902.78",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./novels")
}

fn default_concurrency() -> usize {
    3
}

fn default_delay_min() -> Duration {
    Duration::from_millis(500)
}

fn default_delay_max() -> Duration {
    Duration::from_millis(1000)
}

fn default_retry_pause() -> Duration {
    Duration::from_secs(1)
}

fn default_max_attempts() -> u32 {
    2
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_status_ttl() -> Duration {
    Duration::from_secs(3600)
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds, for sub-second pacing delays)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_values() {
        let config = Config::default();
        assert_eq!(config.download.concurrency, 3);
        assert_eq!(config.download.output_dir, PathBuf::from("./novels"));
        assert_eq!(config.download.chapter_delay_min, Duration::from_millis(500));
        assert_eq!(config.download.chapter_delay_max, Duration::from_millis(1000));
        assert_eq!(config.download.retry_pause, Duration::from_secs(1));
        assert_eq!(config.cache.status_ttl, Duration::from_secs(3600));
        assert_eq!(config.retry.max_attempts, 2);
        assert!(!config.source.user_agents.is_empty());
    }

    #[test]
    fn effective_concurrency_clamps_to_supported_range() {
        let download = DownloadConfig::default();
        assert_eq!(download.effective_concurrency(None), 3);
        assert_eq!(download.effective_concurrency(Some(5)), 5);
        assert_eq!(download.effective_concurrency(Some(0)), 1);
        assert_eq!(download.effective_concurrency(Some(64)), 10);

        let wide = DownloadConfig {
            concurrency: 100,
            ..DownloadConfig::default()
        };
        assert_eq!(wide.effective_concurrency(None), 10);
    }

    #[test]
    fn empty_json_deserializes_with_full_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.download.concurrency, 3);
        assert_eq!(config.source.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn partial_overrides_keep_remaining_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"download": {"concurrency": 8, "chapter_delay_min": 100}}"#,
        )
        .unwrap();
        assert_eq!(config.download.concurrency, 8);
        assert_eq!(config.download.chapter_delay_min, Duration::from_millis(100));
        assert_eq!(config.download.chapter_delay_max, Duration::from_millis(1000));
        assert_eq!(config.retry.max_attempts, 2);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.download.concurrency, config.download.concurrency);
        assert_eq!(back.cache.status_ttl, config.cache.status_ttl);
        assert_eq!(back.source.base_url, config.source.base_url);
    }
}
