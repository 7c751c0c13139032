//! Book search with status enrichment.
//!
//! The remote site exposes a JSON search endpoint; results come back in one
//! unpaginated list, so pagination happens client-side. Enrichment (completion
//! state, latest-chapter label) goes through the [`StatusCache`] so repeated
//! lookups within the TTL cost nothing.

use crate::error::{Error, Result};
use crate::extract;
use crate::fetcher::ContentFetcher;
use crate::status_cache::{StatusCache, StatusEntry};
use crate::types::BookId;
use serde::Deserialize;
use std::sync::Arc;

/// Default number of results per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// One search result as the site's JSON endpoint reports it.
#[derive(Debug, Deserialize)]
struct RawSearchHit {
    articlename: String,
    author: String,
    #[serde(default)]
    intro: String,
    url_list: String,
    #[serde(default)]
    url_img: String,
}

/// One search result, normalized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchHit {
    /// Book id extracted from the listing locator
    pub book_id: BookId,
    /// Book title
    pub title: String,
    /// Author name
    pub author: String,
    /// Synopsis snippet
    pub synopsis: String,
    /// Locator of the book's detail page
    pub locator: String,
    /// Cover image locator, when present
    pub cover: String,
}

/// One page of search results.
#[derive(Clone, Debug, Default)]
pub struct SearchPage {
    /// Total number of hits across all pages
    pub total: usize,
    /// 1-based page number
    pub page: usize,
    /// Page size used for slicing
    pub page_size: usize,
    /// Total number of pages
    pub total_pages: usize,
    /// Hits on this page
    pub results: Vec<SearchHit>,
}

/// Search client over a shared content fetcher and status cache.
pub struct SearchClient {
    fetcher: Arc<dyn ContentFetcher>,
    cache: Arc<StatusCache>,
}

impl SearchClient {
    /// Create a client sharing the given fetcher and cache.
    pub fn new(fetcher: Arc<dyn ContentFetcher>, cache: Arc<StatusCache>) -> Self {
        Self { fetcher, cache }
    }

    /// Unified search: an all-digit keyword first tries a direct book-id
    /// lookup, falling back to a name search when the detail page is missing.
    pub async fn search(&self, keyword: &str, page: usize) -> Result<SearchPage> {
        if !keyword.is_empty() && keyword.chars().all(|c| c.is_ascii_digit()) {
            tracing::info!(book_id = keyword, "keyword is numeric, trying book-id lookup");
            match self.search_by_id(keyword).await {
                Ok(hit) => {
                    return Ok(SearchPage {
                        total: 1,
                        page: 1,
                        page_size: DEFAULT_PAGE_SIZE,
                        total_pages: 1,
                        results: vec![hit],
                    });
                }
                Err(e) => {
                    tracing::info!(error = %e, "book-id lookup failed, falling back to name search");
                }
            }
        }
        self.search_by_name(keyword, page, DEFAULT_PAGE_SIZE).await
    }

    /// Look a book up directly by id via its detail page.
    pub async fn search_by_id(&self, book_id: &str) -> Result<SearchHit> {
        let locator = format!("/book/{}/", book_id);
        let html = self.fetcher.fetch(&locator).await?;
        let info = extract::parse_book_info(&html)?;
        Ok(SearchHit {
            book_id: BookId::from(book_id),
            title: info.title,
            author: info.author,
            synopsis: info.synopsis,
            locator,
            cover: String::new(),
        })
    }

    /// Query the JSON search endpoint and slice the results into one page.
    pub async fn search_by_name(
        &self,
        keyword: &str,
        page: usize,
        page_size: usize,
    ) -> Result<SearchPage> {
        let locator = format!("/user/search.html?q={}", urlencoding::encode(keyword));
        let body = self.fetcher.fetch(&locator).await?;

        let raw: Vec<RawSearchHit> = serde_json::from_str(&body)
            .map_err(|e| Error::Parse(format!("search response is not a result list: {e}")))?;

        let page = page.max(1);
        let page_size = page_size.max(1);
        let total = raw.len();
        let total_pages = total.div_ceil(page_size);
        let start = (page - 1) * page_size;

        let results = raw
            .into_iter()
            .skip(start)
            .take(page_size)
            .filter_map(|hit| {
                let Some(book_id) = book_id_from_locator(&hit.url_list) else {
                    tracing::warn!(locator = %hit.url_list, "search hit without a book id, skipping");
                    return None;
                };
                Some(SearchHit {
                    book_id,
                    title: hit.articlename,
                    author: hit.author,
                    synopsis: hit.intro,
                    locator: hit.url_list,
                    cover: hit.url_img,
                })
            })
            .collect();

        Ok(SearchPage {
            total,
            page,
            page_size,
            total_pages,
            results,
        })
    }

    /// Fetch (or serve from cache) the completion state and latest-chapter
    /// label for a search hit.
    pub async fn enrich(&self, book_id: &BookId) -> Result<StatusEntry> {
        let fetcher = Arc::clone(&self.fetcher);
        self.cache
            .get_or_fetch(book_id, move |id| async move {
                let html = fetcher.fetch(&format!("/book/{}/", id)).await?;
                let info = extract::parse_book_info(&html)?;
                Ok((info.status, info.latest_chapter))
            })
            .await
    }
}

/// Extract the book id from a listing locator of the form `/book/<id>/`.
fn book_id_from_locator(locator: &str) -> Option<BookId> {
    locator
        .split('/')
        .filter(|segment| !segment.is_empty())
        .next_back()
        .filter(|segment| segment.chars().all(|c| c.is_ascii_digit()))
        .map(BookId::from)
}
