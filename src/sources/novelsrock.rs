//! Novels Rock (novelsrock.com) crawler: Madara-theme search page, bookmark
//! button novel id, and an admin-ajax form POST for the chapter list.

use crate::model::{Author, AuthorKind, Chapter, Novel, SearchResult, Volume};
use crate::sources::{
    absolute_url, extract_paragraphs, parse_selector, push_chapter, BaseUrls, Crawler,
    CrawlerError, FetchClient, SourceDecl,
};
use reqwest::Url;
use scraper::Html;

const BASE_URL: &str = "https://novelsrock.com/";

const SEARCH_RESULT_LIMIT: usize = 10;

pub(crate) fn declaration() -> SourceDecl {
    SourceDecl {
        name: "NovelsRock",
        base_urls: BaseUrls::One(BASE_URL),
        build: || Box::new(NovelsRockCrawler),
    }
}

/// Crawler for novelsrock.com.
pub struct NovelsRockCrawler;

fn search_endpoint(query: &str) -> Result<String, CrawlerError> {
    let mut url = Url::parse(BASE_URL).map_err(|e| CrawlerError::InvalidUrl {
        input: BASE_URL.to_string(),
        reason: e.to_string(),
    })?;
    url.query_pairs_mut()
        .append_pair("s", query)
        .append_pair("post_type", "wp-manga")
        .append_pair("op", "")
        .append_pair("author", "")
        .append_pair("artist", "")
        .append_pair("release", "")
        .append_pair("adult", "");
    Ok(url.into())
}

fn parse_search_results(doc: &Html) -> Result<Vec<SearchResult>, CrawlerError> {
    let tab_sel = parse_selector(".c-tabs-item__content")?;
    let link_sel = parse_selector(".post-title .h4 a")?;
    let latest_sel = parse_selector(".latest-chap .chapter a")?;
    let votes_sel = parse_selector(".rating .total_votes")?;
    let mut results = Vec::new();
    for tab in doc.select(&tab_sel).take(SEARCH_RESULT_LIMIT) {
        let Some(link) = tab.select(&link_sel).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let title = link.text().collect::<String>().trim().to_string();
        let latest = tab
            .select(&latest_sel)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string());
        let votes = tab
            .select(&votes_sel)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string());
        let info = match (latest, votes) {
            (Some(latest), Some(votes)) => Some(format!("{} | Rating: {}", latest, votes)),
            (Some(latest), None) => Some(latest),
            (None, Some(votes)) => Some(format!("Rating: {}", votes)),
            (None, None) => None,
        };
        results.push(SearchResult {
            title,
            url: absolute_url(BASE_URL, href)?,
            info,
        });
    }
    Ok(results)
}

/// Title, cover, authors, and the numeric novel id from a novel page.
fn parse_novel_page(
    doc: &Html,
) -> Result<(String, Option<String>, Vec<Author>, String), CrawlerError> {
    // The heading mixes the title's own text with badge child elements, so
    // only direct text nodes count.
    let title_sel = parse_selector(".post-title h1")?;
    let heading = doc
        .select(&title_sel)
        .next()
        .ok_or_else(|| CrawlerError::ParseNovelPage {
            message: "missing novel title".to_string(),
        })?;
    let mut title = String::new();
    for child in heading.children() {
        if let Some(text) = child.value().as_text() {
            title.push_str(text);
        }
    }
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(CrawlerError::ParseNovelPage {
            message: "missing novel title".to_string(),
        });
    }

    let cover_sel = parse_selector(".summary_image img")?;
    let cover_url = doc
        .select(&cover_sel)
        .next()
        .and_then(|e| e.value().attr("data-src"))
        .and_then(|src| absolute_url(BASE_URL, src).ok());

    let author_sel = parse_selector(".author-content a")?;
    let names: Vec<String> = doc
        .select(&author_sel)
        .map(|a| a.text().collect::<String>().trim().to_string())
        .collect();
    let authors = match names.as_slice() {
        [name] => vec![Author::new(name.as_str(), AuthorKind::Author)],
        [name, translated] => vec![Author::new(
            format!("{} ({})", name, translated),
            AuthorKind::Author,
        )],
        _ => Vec::new(),
    };

    let id_sel = parse_selector(".wp-manga-action-button[data-action=bookmark]")?;
    let novel_id = doc
        .select(&id_sel)
        .next()
        .and_then(|e| e.value().attr("data-post"))
        .map(str::to_string)
        .ok_or_else(|| CrawlerError::ParseNovelPage {
            message: "missing novel id on bookmark button".to_string(),
        })?;

    Ok((title, cover_url, authors, novel_id))
}

/// Chapter anchors from the admin-ajax listing, oldest first.
fn parse_chapter_listing(doc: &Html) -> Result<(Vec<Volume>, Vec<Chapter>), CrawlerError> {
    let link_sel = parse_selector(".wp-manga-chapter > a")?;
    let mut volumes = Vec::new();
    let mut chapters = Vec::new();
    // The site lists newest first.
    let links: Vec<_> = doc.select(&link_sel).collect();
    for a in links.into_iter().rev() {
        let href = a
            .value()
            .attr("href")
            .ok_or_else(|| CrawlerError::ChapterListParse {
                reason: "chapter link without href".to_string(),
            })?;
        push_chapter(
            &mut volumes,
            &mut chapters,
            a.text().collect::<String>().trim().to_string(),
            absolute_url(BASE_URL, href)?,
        );
    }
    Ok((volumes, chapters))
}

impl Crawler for NovelsRockCrawler {
    fn search(
        &self,
        client: &mut FetchClient,
        query: &str,
    ) -> Result<Vec<SearchResult>, CrawlerError> {
        let endpoint = search_endpoint(&query.to_lowercase())?;
        let doc = client.get_html(&endpoint)?;
        parse_search_results(&doc)
    }

    fn fetch_novel(&self, client: &mut FetchClient, url: &str) -> Result<Novel, CrawlerError> {
        log::debug!("visiting {}", url);
        let doc = client.get_html(url)?;
        let (title, cover_url, authors, novel_id) = parse_novel_page(&doc)?;
        log::info!("novel title: {}", title);

        let ajax_url = absolute_url(BASE_URL, "wp-admin/admin-ajax.php")?;
        log::debug!("requesting chapter list from {}", ajax_url);
        let listing = client.post_form_html(
            &ajax_url,
            &[("action", "manga_get_chapters"), ("manga", &novel_id)],
        )?;
        let (volumes, chapters) = parse_chapter_listing(&listing)?;
        if chapters.is_empty() {
            return Err(CrawlerError::EmptyChapterList);
        }

        Ok(Novel {
            url: url.to_string(),
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
        log::info!("downloading {}", chapter.url);
        let doc = client.get_html(&chapter.url)?;
        let content_sel = parse_selector("div.reading-content")?;
        let root = doc
            .select(&content_sel)
            .next()
            .ok_or_else(|| CrawlerError::MissingChapterContent {
                id: chapter.id,
                url: chapter.url.clone(),
            })?;
        let body = extract_paragraphs(root, &["h3"], &["code-block", "adsense-code"])?;
        if body.is_empty() {
            return Err(CrawlerError::MissingChapterContent {
                id: chapter.id,
                url: chapter.url.clone(),
            });
        }
        Ok(body)
    }
}
