//! Site crawlers: the crawler capability trait, per-source URL declarations,
//! the built-in source table, and shared scraping helpers.
//!
//! Each source module self-declares the URL(s) it serves through a
//! [SourceDecl] returned by its `declaration()` function, and appears once in
//! [builtin]. The registry validates and registers every declaration at
//! startup; see [crate::registry].

mod client;
mod error;

pub mod mtlnovel;
pub mod novelsrock;

pub use client::{FetchClient, FetchClientBuilder};
pub use error::CrawlerError;

use crate::model::{Chapter, Novel, SearchResult, Volume};
use reqwest::Url;
use scraper::{ElementRef, Selector};

/// Declared base URL(s) for one crawler: a single URL or an ordered list.
///
/// A single URL is treated as a one-element list during registration. An
/// empty list is a fatal configuration error.
#[derive(Debug, Clone, Copy)]
pub enum BaseUrls {
    One(&'static str),
    Many(&'static [&'static str]),
}

impl BaseUrls {
    /// View the declaration as a slice, regardless of form.
    pub fn as_slice(&self) -> &[&'static str] {
        match self {
            BaseUrls::One(url) => std::slice::from_ref(url),
            BaseUrls::Many(urls) => urls,
        }
    }
}

/// One crawler's self-declaration: display name, served URL(s), and a factory
/// for the implementation. The registry treats the declaration as an opaque
/// handle once its URLs are validated.
#[derive(Debug)]
pub struct SourceDecl {
    pub name: &'static str,
    pub base_urls: BaseUrls,
    pub build: fn() -> Box<dyn Crawler>,
}

/// Capability implemented by every site crawler.
pub trait Crawler {
    /// Search the site by title. Best-effort; each site caps its own results.
    fn search(
        &self,
        client: &mut FetchClient,
        query: &str,
    ) -> Result<Vec<SearchResult>, CrawlerError>;

    /// Fetch novel metadata and the full chapter list. Bodies are not
    /// downloaded; see [Crawler::fetch_chapter].
    fn fetch_novel(&self, client: &mut FetchClient, url: &str) -> Result<Novel, CrawlerError>;

    /// Download one chapter's body as minimal HTML (`<p>...</p>` only).
    fn fetch_chapter(
        &self,
        client: &mut FetchClient,
        chapter: &Chapter,
    ) -> Result<String, CrawlerError>;
}

/// Every built-in source declaration, in table order. The registry sweep
/// registers them front to back; a later entry for the same URL wins.
pub(crate) fn builtin() -> Vec<SourceDecl> {
    vec![mtlnovel::declaration(), novelsrock::declaration()]
}

/// Parse a CSS selector or return a parse error (avoids panics from Selector::parse).
pub(crate) fn parse_selector(sel: &str) -> Result<Selector, CrawlerError> {
    Selector::parse(sel).map_err(|e| CrawlerError::ParseNovelPage {
        message: format!("invalid selector {:?}: {}", sel, e),
    })
}

/// Resolve a possibly-relative href against the page it appeared on.
pub(crate) fn absolute_url(page_url: &str, href: &str) -> Result<String, CrawlerError> {
    let base = Url::parse(page_url).map_err(|e| CrawlerError::InvalidUrl {
        input: page_url.to_string(),
        reason: e.to_string(),
    })?;
    let joined = base.join(href).map_err(|e| CrawlerError::InvalidUrl {
        input: href.to_string(),
        reason: e.to_string(),
    })?;
    Ok(joined.to_string())
}

/// Remove all HTML tags from a string, keeping text content.
pub(crate) fn strip_html_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("\n\n\n", "\n\n").trim().to_string()
}

/// Append a chapter to the list, opening a new volume every 100 chapters.
/// Ids are 1-based and follow TOC order.
pub(crate) fn push_chapter(
    volumes: &mut Vec<Volume>,
    chapters: &mut Vec<Chapter>,
    title: String,
    url: String,
) {
    let id = chapters.len() as u32 + 1;
    let volume = chapters.len() as u32 / 100 + 1;
    if chapters.len() % 100 == 0 {
        volumes.push(Volume { id: volume });
    }
    chapters.push(Chapter {
        id,
        volume,
        title,
        url,
        body: None,
    });
}

/// Collect the `<p>` paragraphs under `root` into minimal HTML, dropping
/// ad/junk nodes by tag name or CSS class (the per-site discard lists).
pub(crate) fn extract_paragraphs(
    root: ElementRef<'_>,
    discard_tags: &[&str],
    discard_classes: &[&str],
) -> Result<String, CrawlerError> {
    let p_sel = parse_selector("p")?;
    let mut body = String::new();
    for p in root.select(&p_sel) {
        let text = paragraph_text(p, discard_tags, discard_classes);
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        body.push_str("<p>");
        body.push_str(text);
        body.push_str("</p>");
    }
    Ok(body)
}

/// Text of one paragraph, skipping subtrees whose element matches a discard
/// tag or class.
fn paragraph_text(el: ElementRef<'_>, discard_tags: &[&str], discard_classes: &[&str]) -> String {
    let mut out = String::new();
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(e) = ElementRef::wrap(child) {
            if discard_tags.contains(&e.value().name())
                || e.value().classes().any(|c| discard_classes.contains(&c))
            {
                continue;
            }
            out.push_str(&paragraph_text(e, discard_tags, discard_classes));
        }
    }
    out
}
