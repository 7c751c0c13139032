//! Content fetcher — the network boundary of the pipeline.
//!
//! Everything above this module deals in locators and page text; only the
//! [`HttpFetcher`] knows about HTTP, user-agent rotation, and the base URL.

use crate::config::SourceConfig;
use crate::error::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

/// Abstraction over raw page fetching, enabling testability.
///
/// `locator` is either an absolute URL or a path relative to the source's
/// base URL (the form chapter lists produce).
#[async_trait::async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch the raw text of the page behind `locator`.
    async fn fetch(&self, locator: &str) -> Result<String>;
}

/// Production [`ContentFetcher`] over `reqwest`, with round-robin
/// user-agent rotation and a Referer pinned to the base URL.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: Url,
    user_agents: Vec<String>,
    ua_index: AtomicUsize,
}

impl HttpFetcher {
    /// Build a fetcher from the source configuration.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url,
            user_agents: config.user_agents.clone(),
            ua_index: AtomicUsize::new(0),
        })
    }

    /// Next user agent in the rotation.
    fn next_user_agent(&self) -> &str {
        if self.user_agents.is_empty() {
            return "";
        }
        let idx = self.ua_index.fetch_add(1, Ordering::Relaxed) % self.user_agents.len();
        &self.user_agents[idx]
    }

    /// Resolve a locator against the base URL. Absolute URLs pass through.
    fn resolve(&self, locator: &str) -> Result<Url> {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            Ok(Url::parse(locator)?)
        } else {
            Ok(self.base_url.join(locator)?)
        }
    }
}

#[async_trait::async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, locator: &str) -> Result<String> {
        let url = self.resolve(locator)?;
        tracing::debug!(url = %url, "fetching page");

        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, self.next_user_agent())
            .header(reqwest::header::REFERER, self.base_url.as_str())
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        Ok(body)
    }
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("base_url", &self.base_url.as_str())
            .field("user_agents", &self.user_agents.len())
            .finish()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_source(base_url: &str) -> SourceConfig {
        SourceConfig {
            base_url: base_url.to_string(),
            user_agents: vec!["agent-a".to_string(), "agent-b".to_string()],
            request_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn fetches_relative_locator_against_base_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/book/1/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<h1>hello</h1>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&test_source(&server.uri())).unwrap();
        let body = fetcher.fetch("/book/1/").await.unwrap();
        assert_eq!(body, "<h1>hello</h1>");
    }

    #[tokio::test]
    async fn rotates_user_agents_round_robin() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&test_source(&server.uri())).unwrap();
        fetcher.fetch("/a").await.unwrap();
        fetcher.fetch("/b").await.unwrap();
        fetcher.fetch("/c").await.unwrap();

        let agents: Vec<String> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter_map(|r| r.headers.get("user-agent"))
            .map(|v| v.to_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(agents, vec!["agent-a", "agent-b", "agent-a"]);
    }

    #[tokio::test]
    async fn non_success_status_is_a_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&test_source(&server.uri())).unwrap();
        let err = fetcher.fetch("/missing").await.unwrap_err();
        assert!(matches!(err, Error::Network(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn absolute_locator_bypasses_base_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/direct"))
            .respond_with(ResponseTemplate::new(200).set_body_string("direct"))
            .mount(&server)
            .await;

        // Base URL points elsewhere; the absolute locator wins.
        let fetcher = HttpFetcher::new(&test_source("https://example.invalid")).unwrap();
        let body = fetcher
            .fetch(&format!("{}/direct", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "direct");
    }
}
