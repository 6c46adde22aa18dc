//! Shared error type for site crawlers: HTTP, JSON, and page-parsing cases.

use thiserror::Error;

/// Shared crawler error for URL handling, HTTP, and parsing.
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Invalid URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Network error: could not reach {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("HTTP {status} when fetching: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to read response body: {source}")]
    BodyRead { source: reqwest::Error },

    #[error("Invalid JSON from {url}: {source}")]
    Json {
        url: String,
        source: serde_json::Error,
    },

    #[error("Could not parse novel page: {message}")]
    ParseNovelPage { message: String },

    #[error("Could not parse chapter list: {reason}")]
    ChapterListParse { reason: String },

    #[error("Novel page has no chapters (possibly deleted or access restricted).")]
    EmptyChapterList,

    #[error("Chapter {id} has no content at {url}.")]
    MissingChapterContent { id: u32, url: String },
}
