//! HTML structural extraction — turns raw pages into structured fields.
//!
//! Three entry points: book metadata from the detail page, the ordered chapter
//! list, and chapter body normalization. The selectors mirror the remote
//! site's markup; everything downstream sees only structured types.

use crate::error::{Error, Result};
use crate::types::{BookInfo, BookStatus, ChapterDescriptor};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

// Selectors and scrub patterns are fixed strings; a parse failure is a
// programming error, caught by the tests below.
#[allow(clippy::expect_used)]
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("selector"));
#[allow(clippy::expect_used)]
static META_SPANS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.small span").expect("selector"));
#[allow(clippy::expect_used)]
static SYNOPSIS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.intro").expect("selector"));
#[allow(clippy::expect_used)]
static NEWEST: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.newest a").expect("selector"));
#[allow(clippy::expect_used)]
static CHAPTER_LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.listmain dd a").expect("selector"));
#[allow(clippy::expect_used)]
static CHAPTER_BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#chaptercontent").expect("selector"));

// Boilerplate the site injects into chapter bodies: self-promotion lines,
// bookmarking prompts, and bare tracking links.
#[allow(clippy::expect_used)]
static SCRUBBERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(www|http:|https:).+?com",
        r"笔趣阁.*?最新章节！",
        r"手机用户请访问.*?阅读！",
        r"请收藏本站.*",
        r"『点此报错』",
        r"『加入书签』",
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("scrub pattern"))
    .collect()
});

fn element_text(el: scraper::ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join("").trim().to_string()
}

/// Parse book-level metadata from the detail page.
///
/// Fails with [`Error::Parse`] when the page carries no title — the marker
/// that the expected structure is absent entirely. Other fields degrade to
/// empty/`None` individually.
pub fn parse_book_info(html: &str) -> Result<BookInfo> {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::Parse("book page has no title".to_string()))?;

    let mut author = String::new();
    let mut status = BookStatus::Ongoing;
    let mut category = None;
    let mut word_count = None;
    let mut updated = None;

    for span in document.select(&META_SPANS) {
        let text = element_text(span);
        if let Some(value) = text.strip_prefix("作者：") {
            author = value.trim().to_string();
        } else if let Some(value) = text.strip_prefix("状态：") {
            // The site phrases completion several ways; both markers mean done.
            if value.contains('完') || value.contains('结') {
                status = BookStatus::Completed;
            }
        } else if let Some(value) = text.strip_prefix("分类：") {
            category = Some(value.trim().to_string());
        } else if let Some(value) = text.strip_prefix("字数：") {
            word_count = Some(value.trim().to_string());
        } else if let Some(value) = text.strip_prefix("更新：") {
            updated = Some(value.trim().to_string());
        }
    }

    let synopsis = document
        .select(&SYNOPSIS)
        .next()
        .map(element_text)
        .unwrap_or_default();

    let latest_chapter = document
        .select(&NEWEST)
        .next()
        .map(element_text)
        .unwrap_or_default();

    Ok(BookInfo {
        title,
        author,
        status,
        synopsis,
        latest_chapter,
        category,
        word_count,
        updated,
    })
}

/// Parse the ordered chapter list from the detail page.
///
/// Produces dense 1-based indices in listing order. Expander pseudo-links
/// (`javascript:` hrefs) are skipped. An empty result means "no chapters
/// found" — the caller treats that as a hard stop, not a per-chapter failure.
pub fn parse_chapter_list(html: &str) -> Vec<ChapterDescriptor> {
    let document = Html::parse_document(html);

    let mut chapters = Vec::new();
    for link in document.select(&CHAPTER_LINKS) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if href.contains("javascript:") {
            continue;
        }
        let title = element_text(link);
        if title.is_empty() {
            continue;
        }
        chapters.push(ChapterDescriptor {
            index: chapters.len() as u32 + 1,
            title,
            locator: href.to_string(),
        });
    }
    chapters
}

/// Normalize a raw chapter page into plain text.
///
/// Returns `None` when the content container is missing or scrubbing leaves
/// nothing — equivalent to a fetch failure for that chapter.
pub fn normalize_chapter(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let body = document.select(&CHAPTER_BODY).next()?;

    let raw = body.text().collect::<Vec<_>>().join("\n");
    let mut text = raw;
    for scrubber in SCRUBBERS.iter() {
        text = scrubber.replace_all(&text, "").into_owned();
    }

    let cleaned: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.join("\n"))
    }
}
