//! MTL Novel (mtlnovel.com) crawler: WordPress autosuggest search, AMP novel
//! pages, and amp-list JSON chapter feeds. Serves four language mirrors.

use crate::model::{Author, AuthorKind, Chapter, Novel, SearchResult};
use crate::sources::{
    absolute_url, extract_paragraphs, parse_selector, push_chapter, strip_html_tags, BaseUrls,
    Crawler, CrawlerError, FetchClient, SourceDecl,
};
use reqwest::Url;
use scraper::Html;
use serde::Deserialize;

const BASE_URLS: &[&str] = &[
    "http://www.mtlnovel.com/",
    "http://id.mtlnovel.com/",
    "http://fr.mtlnovel.com/",
    "http://es.mtlnovel.com/",
];

const SEARCH_RESULT_LIMIT: usize = 10;

pub(crate) fn declaration() -> SourceDecl {
    SourceDecl {
        name: "MtlNovel",
        base_urls: BaseUrls::Many(BASE_URLS),
        build: || Box::new(MtlNovelCrawler),
    }
}

/// Crawler for mtlnovel.com and its language mirrors.
pub struct MtlNovelCrawler;

/// Autosuggest endpoint response; `items[0].results` carries the hits.
#[derive(Debug, Deserialize)]
struct Autosuggest {
    items: Vec<AutosuggestItem>,
}

#[derive(Debug, Deserialize)]
struct AutosuggestItem {
    results: Vec<AutosuggestHit>,
}

#[derive(Debug, Deserialize)]
struct AutosuggestHit {
    title: String,
    permalink: String,
}

/// One amp-list chapter feed; `items` is the chapter array.
#[derive(Debug, Deserialize)]
struct ChapterFeed {
    items: Vec<ChapterFeedEntry>,
}

#[derive(Debug, Deserialize)]
struct ChapterFeedEntry {
    no: String,
    title: String,
    permalink: String,
}

/// The mirrors serve both schemes but only the http origin is stable.
fn force_http(url: &str) -> String {
    url.replacen("https://", "http://", 1)
}

fn search_endpoint(base: &str, query: &str) -> Result<String, CrawlerError> {
    let mut url = Url::parse(base)
        .and_then(|u| u.join("wp-admin/admin-ajax.php"))
        .map_err(|e| CrawlerError::InvalidUrl {
            input: base.to_string(),
            reason: e.to_string(),
        })?;
    url.query_pairs_mut()
        .append_pair("action", "autosuggest")
        .append_pair("q", query);
    Ok(url.into())
}

/// Title, cover, and authors from a novel page.
fn parse_metadata(
    doc: &Html,
    page_url: &str,
) -> Result<(String, Option<String>, Vec<Author>), CrawlerError> {
    let title_sel = parse_selector("article .entry-title, h1")?;
    let title = doc
        .select(&title_sel)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CrawlerError::ParseNovelPage {
            message: "missing novel title".to_string(),
        })?;

    let cover_sel = parse_selector(".post-content amp-img[fallback]")?;
    let cover_url = doc
        .select(&cover_sel)
        .next()
        .and_then(|e| e.value().attr("src"))
        .and_then(|src| absolute_url(page_url, src).ok());
    if cover_url.is_none() {
        log::debug!("could not find novel cover on {}", page_url);
    }

    let author_sel = parse_selector(r#"table.info a[href*="/novel-author/"]"#)?;
    let authors: Vec<Author> = doc
        .select(&author_sel)
        .map(|a| Author::new(a.text().collect::<String>(), AuthorKind::Author))
        .collect();

    Ok((title, cover_url, authors))
}

/// Feed URLs of the amp-list chapter listings on a novel page.
fn chapter_feed_urls(doc: &Html, page_url: &str) -> Result<Vec<String>, CrawlerError> {
    let list_sel = parse_selector("div.ch-list amp-list")?;
    let mut feeds = Vec::new();
    for amp_list in doc.select(&list_sel) {
        let src = amp_list
            .value()
            .attr("src")
            .ok_or_else(|| CrawlerError::ChapterListParse {
                reason: "amp-list without src attribute".to_string(),
            })?;
        feeds.push(absolute_url(page_url, src)?);
    }
    Ok(feeds)
}

impl Crawler for MtlNovelCrawler {
    fn search(
        &self,
        client: &mut FetchClient,
        query: &str,
    ) -> Result<Vec<SearchResult>, CrawlerError> {
        let query = query.to_lowercase();
        let mut results = Vec::new();
        for base in BASE_URLS {
            let endpoint = search_endpoint(base, &query)?;
            let feed: Autosuggest = client.get_json(&endpoint)?;
            let Some(item) = feed.items.into_iter().next() else {
                continue;
            };
            for hit in item.results.into_iter().take(SEARCH_RESULT_LIMIT) {
                results.push(SearchResult {
                    title: strip_html_tags(&hit.title),
                    url: hit.permalink,
                    info: None,
                });
            }
        }
        Ok(results)
    }

    fn fetch_novel(&self, client: &mut FetchClient, url: &str) -> Result<Novel, CrawlerError> {
        let novel_url = force_http(url);
        log::debug!("visiting {}", novel_url);
        let doc = client.get_html(&novel_url)?;

        let (title, cover_url, authors) = parse_metadata(&doc, &novel_url)?;
        log::info!("novel title: {}", title);

        let mut volumes = Vec::new();
        let mut chapters = Vec::new();
        for feed_url in chapter_feed_urls(&doc, &novel_url)? {
            log::debug!("loading chapter feed {}", feed_url);
            let feed: ChapterFeed = client.get_json(&feed_url)?;
            for entry in feed.items {
                push_chapter(
                    &mut volumes,
                    &mut chapters,
                    format!("{} {}", entry.no, entry.title),
                    entry.permalink,
                );
            }
        }
        if chapters.is_empty() {
            return Err(CrawlerError::EmptyChapterList);
        }

        Ok(Novel {
            url: novel_url,
            title,
            authors,
            cover_url,
            volumes,
            chapters,
        })
    }

    fn fetch_chapter(
        &self,
        client: &mut FetchClient,
        chapter: &Chapter,
    ) -> Result<String, CrawlerError> {
        let url = force_http(&chapter.url);
        log::info!("downloading {}", url);
        let doc = client.get_html(&url)?;
        let content_sel = parse_selector(".post-content .par")?;
        let root = doc
            .select(&content_sel)
            .next()
            .ok_or_else(|| CrawlerError::MissingChapterContent {
                id: chapter.id,
                url: url.clone(),
            })?;
        let body = extract_paragraphs(root, &[], &[])?;
        if body.is_empty() {
            return Err(CrawlerError::MissingChapterContent {
                id: chapter.id,
                url,
            });
        }
        Ok(body)
    }
}
