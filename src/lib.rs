//! lnscrape: site crawlers for light-novel aggregation sites, with a
//! URL-to-crawler registry for routing novel URLs to the right crawler.

pub mod cli;
pub mod config;
pub mod model;
pub mod registry;
pub mod sources;

// Re-exports for CLI and consumers.
pub use model::{Author, AuthorKind, Chapter, Novel, SearchResult, Volume};
pub use registry::{rejected_sources, rejection_reason, Registry, RegistryError};
pub use sources::{
    BaseUrls, Crawler, CrawlerError, FetchClient, FetchClientBuilder, SourceDecl,
};
