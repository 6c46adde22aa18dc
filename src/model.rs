//! Canonical data model for scraped novels.
//!
//! All site crawlers produce these shapes; the CLI serializes them as JSON.

use serde::{Deserialize, Serialize};

/// Role of a person credited on a novel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorKind {
    Unknown,
    Author,
    Artist,
    Translator,
    Editor,
}

/// One credited person. An empty name is stored as `-`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub kind: AuthorKind,
}

impl Author {
    pub fn new(name: impl Into<String>, kind: AuthorKind) -> Self {
        let name = name.into();
        let name = if name.trim().is_empty() {
            "-".to_string()
        } else {
            name.trim().to_string()
        };
        Author { name, kind }
    }
}

/// One novel: metadata plus the full chapter list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Novel {
    /// Canonical page URL the metadata was read from.
    pub url: String,
    pub title: String,
    pub authors: Vec<Author>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    pub volumes: Vec<Volume>,
    pub chapters: Vec<Chapter>,
}

/// Volume marker. Crawlers open a new volume every 100 chapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    /// 1-based.
    pub id: u32,
}

/// One chapter in TOC order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    /// 1-based order from the TOC.
    pub id: u32,
    /// Id of the volume this chapter belongs to.
    pub volume: u32,
    pub title: String,
    pub url: String,
    /// Minimal HTML (`<p>...</p>` only). None until the body is downloaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// One hit from a site search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    /// Optional site-specific extra (latest chapter, rating).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn sample_novel() -> Novel {
        Novel {
            url: "https://novelsrock.com/novel/awakening/".to_string(),
            title: "Awakening".to_string(),
            authors: vec![Author::new("Dark Blue Coconut Milk", AuthorKind::Author)],
            cover_url: Some("https://novelsrock.com/cover.jpg".to_string()),
            volumes: vec![Volume { id: 1 }],
            chapters: vec![Chapter {
                id: 1,
                volume: 1,
                title: "Chapter 1".to_string(),
                url: "https://novelsrock.com/novel/awakening/chapter-1/".to_string(),
                body: Some("<p>First paragraph.</p>".to_string()),
            }],
        }
    }

    #[test]
    fn empty_author_name_becomes_dash() {
        assert_eq!(Author::new("", AuthorKind::Author).name, "-");
        assert_eq!(Author::new("   ", AuthorKind::Translator).name, "-");
        assert_eq!(Author::new(" nobody103 ", AuthorKind::Author).name, "nobody103");
    }

    #[test]
    fn author_kind_serializes_lowercase() -> Result<(), Box<dyn Error>> {
        let author = Author::new("x", AuthorKind::Translator);
        let json = serde_json::to_string(&author)?;
        assert!(json.contains("\"kind\":\"translator\""));
        Ok(())
    }

    #[test]
    fn novel_serializes_chapters_and_skips_absent_body() -> Result<(), Box<dyn Error>> {
        let mut novel = sample_novel();
        novel.chapters[0].body = None;
        novel.cover_url = None;
        let json = serde_json::to_string(&novel)?;
        let value: serde_json::Value = serde_json::from_str(&json)?;
        let obj = value.as_object().ok_or("root must be object")?;
        assert_eq!(obj["title"].as_str(), Some("Awakening"));
        assert!(!obj.contains_key("cover_url"));
        let chapters = obj["chapters"].as_array().ok_or("chapters must be array")?;
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0]["id"].as_u64(), Some(1));
        assert!(!chapters[0].as_object().ok_or("chapter")?.contains_key("body"));
        Ok(())
    }

    #[test]
    fn novel_round_trips_through_json() -> Result<(), Box<dyn Error>> {
        let novel = sample_novel();
        let json = serde_json::to_string(&novel)?;
        let parsed: Novel = serde_json::from_str(&json)?;
        assert_eq!(parsed.title, novel.title);
        assert_eq!(parsed.authors, novel.authors);
        assert_eq!(parsed.chapters.len(), novel.chapters.len());
        assert_eq!(parsed.chapters[0].body, novel.chapters[0].body);
        Ok(())
    }
}
