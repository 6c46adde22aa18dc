//! URL-to-crawler registry.
//!
//! Validates each source's self-declared base URLs and owns the routing table
//! from normalized URL to crawler declaration. To be registered, a
//! declaration must satisfy:
//!   - at least one base URL is declared;
//!   - every URL is a fully-qualified http/https/ftp URL with no whitespace;
//!   - the URL is not on the operator denylist ([rejection_reason]).
//! URLs are normalized to end with a trailing slash before insertion. A URL
//! registered twice keeps the later declaration.

use crate::sources::{self, SourceDecl};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

/// Accepted base URL shape: `scheme://host...` with scheme http, https, or
/// ftp, a sane first host character, and no whitespace anywhere.
static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(https?|ftp)://[^\s/$.?#][^\s]*$").unwrap());

/// Sites whose crawlers must never be registered, with the reason they were
/// pulled. Maintained by hand as sites die or ask to be removed. Keys are
/// fully qualified and end with a trailing slash.
static REJECTED_SOURCES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        (
            "https://chrysanthemumgarden.com/",
            "Removed on request of the owner (Issue #649)",
        ),
        ("https://novelplanet.com/", "Site is closed"),
        ("http://gravitytales.com/", "Domain is expired"),
        ("http://fullnovel.live/", "This site can't be reached"),
        ("http://moonbunnycafe.com/", "Does not follow uniform format"),
        ("https://anythingnovel.com/", "Site broken"),
        ("https://indomtl.com/", "Does not like to be crawled"),
        ("https://lnindo.org/", "Does not like to be crawled"),
        (
            "https://myoniyonitranslations.com/",
            "522 - Connection timed out",
        ),
        ("https://www.jieruihao.cn/", "Unavailable"),
        ("https://www.noveluniverse.com/", "Site is down"),
        ("https://www.novelupdates.com/", "Does not host any novels"),
        ("https://www.novelv.com/", "Site is down"),
        ("https://www.rebirth.online/", "Site moved"),
        ("https://mtled-novels.com/", "Domain is expired"),
        ("http://4scanlation.xyz/", "Site moved"),
        ("https://pery.info/", "Site is down"),
        ("http://writerupdates.com/", "Site is down"),
        ("https://www.centinni.com/", "Site is down"),
        ("https://fsapk.com/", "Site is not working"),
        ("https://bestoflightnovels.com/", "Site moved"),
        ("https://novelcrush.com/", "Site is down"),
        ("https://888novel.com/", "Gets IP banned for using crawler"),
        ("https://novelraw.blogspot.com/", "Site closed down"),
        ("https://www.novelspread.com/", "Site is down"),
        ("https://www.translateindo.com/", "Site is down"),
        ("https://dsrealmtranslations.com/", "Site is down"),
    ])
});

/// Reason a base URL is denylisted, if it is. Expects a normalized
/// (trailing-slash) URL.
pub fn rejection_reason(url: &str) -> Option<&'static str> {
    REJECTED_SOURCES.get(url).copied()
}

/// The full denylist, for operator-facing listings.
pub fn rejected_sources() -> impl Iterator<Item = (&'static str, &'static str)> {
    REJECTED_SOURCES.iter().map(|(url, reason)| (*url, *reason))
}

/// Fatal problems in a crawler's self-declaration. Any of these aborts the
/// whole registration sweep: a half-populated registry hides broken sources.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("No base_url declared for `{name}`")]
    MissingBaseUrl { name: &'static str },

    #[error("Invalid base_url in `{name}`: {url}")]
    InvalidBaseUrl { name: &'static str, url: String },
}

/// Routing table from normalized base URL to crawler declaration.
///
/// Built once at startup (see [Registry::with_builtin_sources]) and read-only
/// afterwards; consumers look crawlers up by exact base URL or resolve a
/// novel URL to the crawler serving it.
pub struct Registry {
    crawlers: HashMap<String, Arc<SourceDecl>>,
}

impl Registry {
    /// Empty registry. Most callers want [Registry::with_builtin_sources].
    pub fn new() -> Self {
        Registry {
            crawlers: HashMap::new(),
        }
    }

    /// Register every built-in source. The first invalid declaration aborts
    /// the sweep with an error naming the crawler.
    pub fn with_builtin_sources() -> Result<Self, RegistryError> {
        let mut registry = Registry::new();
        for decl in sources::builtin() {
            registry.register(decl)?;
        }
        Ok(registry)
    }

    /// Validate one declaration and insert its URLs into the table.
    ///
    /// URLs lacking a trailing slash get one appended. A URL on the denylist
    /// is skipped without error; the declaration's remaining URLs are still
    /// registered. A URL already present is overwritten (last declaration
    /// wins).
    pub fn register(&mut self, decl: SourceDecl) -> Result<(), RegistryError> {
        let urls = decl.base_urls.as_slice();
        if urls.is_empty() {
            return Err(RegistryError::MissingBaseUrl { name: decl.name });
        }
        let mut normalized = Vec::with_capacity(urls.len());
        for url in urls {
            if !URL_REGEX.is_match(url) {
                return Err(RegistryError::InvalidBaseUrl {
                    name: decl.name,
                    url: (*url).to_string(),
                });
            }
            let mut url = (*url).to_string();
            if !url.ends_with('/') {
                url.push('/');
            }
            normalized.push(url);
        }
        let decl = Arc::new(decl);
        for url in normalized {
            if let Some(reason) = rejection_reason(&url) {
                log::debug!("not registering {} for `{}`: {}", url, decl.name, reason);
                continue;
            }
            self.crawlers.insert(url, Arc::clone(&decl));
        }
        Ok(())
    }

    /// Exact lookup by normalized base URL.
    pub fn get(&self, base_url: &str) -> Option<&SourceDecl> {
        self.crawlers.get(base_url).map(Arc::as_ref)
    }

    /// Route a novel URL to the crawler registered under the longest matching
    /// base URL prefix. The scheme is ignored when matching: sites answer on
    /// both schemes, and each crawler normalizes to the one it prefers.
    pub fn resolve(&self, novel_url: &str) -> Option<(&str, &SourceDecl)> {
        let target = strip_scheme(novel_url);
        self.crawlers
            .iter()
            .filter(|(base, _)| target.starts_with(strip_scheme(base)))
            .max_by_key(|(base, _)| strip_scheme(base).len())
            .map(|(base, decl)| (base.as_str(), decl.as_ref()))
    }

    /// All registered (base URL, declaration) pairs, in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SourceDecl)> + '_ {
        self.crawlers
            .iter()
            .map(|(url, decl)| (url.as_str(), decl.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.crawlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crawlers.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// The `scheme://` prefix removed, for scheme-insensitive prefix matching.
fn strip_scheme(url: &str) -> &str {
    url.split_once("://").map_or(url, |(_, rest)| rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Chapter, Novel, SearchResult};
    use crate::sources::{BaseUrls, Crawler, CrawlerError, FetchClient};

    struct NullCrawler;

    impl Crawler for NullCrawler {
        fn search(
            &self,
            _client: &mut FetchClient,
            _query: &str,
        ) -> Result<Vec<SearchResult>, CrawlerError> {
            Ok(Vec::new())
        }

        fn fetch_novel(
            &self,
            _client: &mut FetchClient,
            url: &str,
        ) -> Result<Novel, CrawlerError> {
            Err(CrawlerError::ParseNovelPage {
                message: format!("stub crawler asked to fetch {}", url),
            })
        }

        fn fetch_chapter(
            &self,
            _client: &mut FetchClient,
            _chapter: &Chapter,
        ) -> Result<String, CrawlerError> {
            Ok(String::new())
        }
    }

    fn decl(name: &'static str, base_urls: BaseUrls) -> SourceDecl {
        SourceDecl {
            name,
            base_urls,
            build: || Box::new(NullCrawler),
        }
    }

    #[test]
    fn url_without_trailing_slash_is_normalized() -> Result<(), RegistryError> {
        let mut registry = Registry::new();
        registry.register(decl("Foo", BaseUrls::One("http://foo.example")))?;
        assert_eq!(registry.len(), 1);
        assert!(registry.get("http://foo.example/").is_some());
        assert!(registry.get("http://foo.example").is_none());
        Ok(())
    }

    #[test]
    fn url_with_trailing_slash_is_registered_unchanged() -> Result<(), RegistryError> {
        let mut registry = Registry::new();
        registry.register(decl("Foo", BaseUrls::One("http://foo.example/")))?;
        assert_eq!(registry.len(), 1);
        assert!(registry.get("http://foo.example/").is_some());
        Ok(())
    }

    #[test]
    fn list_declaration_registers_each_url() -> Result<(), RegistryError> {
        let mut registry = Registry::new();
        registry.register(decl(
            "Multi",
            BaseUrls::Many(&["http://a.example/", "http://b.example/"]),
        ))?;
        assert_eq!(registry.len(), 2);
        let a = registry.get("http://a.example/").map(|d| d.name);
        let b = registry.get("http://b.example/").map(|d| d.name);
        assert_eq!(a, Some("Multi"));
        assert_eq!(b, Some("Multi"));
        Ok(())
    }

    #[test]
    fn empty_declaration_is_fatal() {
        let mut registry = Registry::new();
        let result = registry.register(decl("Empty", BaseUrls::Many(&[])));
        match result {
            Err(RegistryError::MissingBaseUrl { name }) => assert_eq!(name, "Empty"),
            other => panic!("expected MissingBaseUrl, got {:?}", other.err()),
        }
    }

    #[test]
    fn malformed_url_is_fatal_and_names_crawler_and_value() {
        let mut registry = Registry::new();
        let result = registry.register(decl("Bad", BaseUrls::One("not-a-url")));
        match result {
            Err(RegistryError::InvalidBaseUrl { name, url }) => {
                assert_eq!(name, "Bad");
                assert_eq!(url, "not-a-url");
            }
            other => panic!("expected InvalidBaseUrl, got {:?}", other.err()),
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn url_with_whitespace_is_fatal() {
        let mut registry = Registry::new();
        let result = registry.register(decl("Bad", BaseUrls::One("http://foo.example/a b")));
        assert!(matches!(
            result,
            Err(RegistryError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn unsupported_scheme_is_fatal() {
        let mut registry = Registry::new();
        let result = registry.register(decl("Bad", BaseUrls::One("file:///etc/passwd")));
        assert!(matches!(
            result,
            Err(RegistryError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn scheme_match_is_case_insensitive() -> Result<(), RegistryError> {
        let mut registry = Registry::new();
        registry.register(decl("Shout", BaseUrls::One("HTTPS://foo.example")))?;
        assert!(registry.get("HTTPS://foo.example/").is_some());
        Ok(())
    }

    #[test]
    fn ftp_scheme_is_accepted() -> Result<(), RegistryError> {
        let mut registry = Registry::new();
        registry.register(decl("Ftp", BaseUrls::One("ftp://foo.example/pub")))?;
        assert!(registry.get("ftp://foo.example/pub/").is_some());
        Ok(())
    }

    #[test]
    fn rejected_url_is_skipped_silently_in_any_form() -> Result<(), RegistryError> {
        let mut registry = Registry::new();
        // Normalization applies before the denylist check, so the bare form
        // is caught too.
        registry.register(decl("Closed", BaseUrls::One("https://novelplanet.com")))?;
        registry.register(decl("Closed2", BaseUrls::One("https://novelplanet.com/")))?;
        assert!(registry.is_empty());
        Ok(())
    }

    #[test]
    fn rejected_url_does_not_invalidate_other_urls() -> Result<(), RegistryError> {
        let mut registry = Registry::new();
        registry.register(decl(
            "Mixed",
            BaseUrls::Many(&["https://novelplanet.com/", "http://foo.example"]),
        ))?;
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("http://foo.example/").map(|d| d.name), Some("Mixed"));
        assert!(registry.get("https://novelplanet.com/").is_none());
        Ok(())
    }

    #[test]
    fn duplicate_url_keeps_the_later_declaration() -> Result<(), RegistryError> {
        let mut registry = Registry::new();
        registry.register(decl("First", BaseUrls::One("http://foo.example/")))?;
        registry.register(decl("Second", BaseUrls::One("http://foo.example")))?;
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("http://foo.example/").map(|d| d.name), Some("Second"));
        Ok(())
    }

    #[test]
    fn builtin_sweep_registers_all_site_crawlers() -> Result<(), RegistryError> {
        let registry = Registry::with_builtin_sources()?;
        assert_eq!(registry.len(), 5);
        assert_eq!(
            registry.get("http://www.mtlnovel.com/").map(|d| d.name),
            Some("MtlNovel")
        );
        assert_eq!(
            registry.get("http://es.mtlnovel.com/").map(|d| d.name),
            Some("MtlNovel")
        );
        assert_eq!(
            registry.get("https://novelsrock.com/").map(|d| d.name),
            Some("NovelsRock")
        );
        Ok(())
    }

    #[test]
    fn resolve_routes_by_longest_matching_prefix() -> Result<(), RegistryError> {
        let mut registry = Registry::new();
        registry.register(decl("Root", BaseUrls::One("http://foo.example/")))?;
        registry.register(decl("Deep", BaseUrls::One("http://foo.example/novels")))?;
        let (base, hit) = registry
            .resolve("http://foo.example/novels/awakening/")
            .expect("url should route");
        assert_eq!(base, "http://foo.example/novels/");
        assert_eq!(hit.name, "Deep");
        let (base, hit) = registry
            .resolve("http://foo.example/about")
            .expect("url should route");
        assert_eq!(base, "http://foo.example/");
        assert_eq!(hit.name, "Root");
        assert!(registry.resolve("http://other.example/x").is_none());
        Ok(())
    }

    #[test]
    fn resolve_ignores_scheme_differences() -> Result<(), RegistryError> {
        // mtlnovel registers http keys but real novel links are https.
        let registry = Registry::with_builtin_sources()?;
        let (base, hit) = registry
            .resolve("https://www.mtlnovel.com/trash-of-the-counts-family/")
            .expect("https url should route to the http-keyed crawler");
        assert_eq!(base, "http://www.mtlnovel.com/");
        assert_eq!(hit.name, "MtlNovel");

        let mut registry = Registry::new();
        registry.register(decl("Secure", BaseUrls::One("https://foo.example/")))?;
        let (base, hit) = registry
            .resolve("http://foo.example/novel/1/")
            .expect("http url should route to the https-keyed crawler");
        assert_eq!(base, "https://foo.example/");
        assert_eq!(hit.name, "Secure");
        Ok(())
    }

    #[test]
    fn rejection_reason_reports_denylisted_urls_only() {
        assert!(rejection_reason("https://www.novelupdates.com/").is_some());
        assert!(rejection_reason("https://novelsrock.com/").is_none());
    }
}
