//! CLI parsing and orchestration. Lists sources, runs searches, fetches
//! novels to JSON. Maps errors to exit codes.

use crate::config;
use crate::model::{Novel, SearchResult};
use crate::registry::{rejected_sources, Registry, RegistryError};
use crate::sources::{CrawlerError, FetchClient, SourceDecl};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Registry(#[from] RegistryError),

    #[error("{0}")]
    Crawler(#[from] CrawlerError),

    #[error("{0}")]
    Output(String),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) | CliRunError::Registry(_) => 1,
            CliRunError::Crawler(_) => 2,
            CliRunError::Output(_) => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "lnscrape")]
#[command(about = "Search and download light novels from supported aggregation sites")]
#[command(
    after_help = "Config file keys (output_dir, user_agent, request_delay_secs, timeout_secs) are documented in the README. CLI flags override config."
)]
pub struct Args {
    /// Suppress progress output (errors only).
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print verbose error chain.
    #[arg(long, global = true)]
    pub verbose: bool,

    /// HTTP User-Agent (overrides config).
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    /// Delay between requests in seconds (overrides config; default 2).
    #[arg(long, global = true)]
    pub delay: Option<u64>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List registered sources and the URLs they serve.
    Sources {
        /// Also list denylisted sites with the reason they were removed.
        #[arg(long)]
        rejected: bool,
    },

    /// Search supported sites by title.
    Search {
        /// Title or part of a title.
        query: String,

        /// Restrict the search to the crawler registered under this base URL.
        #[arg(long)]
        source: Option<String>,
    },

    /// Fetch a novel's metadata and chapters and write them as JSON.
    Fetch {
        /// Novel URL on a supported site.
        url: String,

        /// Output path. Default: ./{sanitized-title}.json.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fetch only chapters in this range (1-based inclusive), e.g. 1-10.
        #[arg(long, value_parser = parse_chapter_range)]
        chapters: Option<(u32, u32)>,

        /// Fetch metadata and chapter list only; skip chapter bodies.
        #[arg(long)]
        info_only: bool,
    },
}

fn parse_chapter_range(s: &str) -> Result<(u32, u32), String> {
    let s = s.trim();
    let (from_str, to_str) = s.split_once('-').ok_or_else(|| {
        format!(
            "Invalid --chapters: expected 'from-to' (e.g. 1-10), got '{}'",
            s
        )
    })?;
    let from_str = from_str.trim();
    let to_str = to_str.trim();
    let from: u32 = from_str.parse().map_err(|_| {
        format!(
            "Invalid --chapters: '{}' is not a valid start chapter number",
            from_str
        )
    })?;
    let to: u32 = to_str.parse().map_err(|_| {
        format!(
            "Invalid --chapters: '{}' is not a valid end chapter number",
            to_str
        )
    })?;
    if from > to {
        return Err(format!(
            "Invalid --chapters: start ({}) must be <= end ({})",
            from, to
        ));
    }
    Ok((from, to))
}

/// Sanitize novel title to a safe filename: lowercase, replace spaces/special with `-`.
fn sanitize_title(title: &str) -> String {
    let mut s = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>();
    while s.contains("--") {
        s = s.replace("--", "-");
    }
    s = s.trim_matches('-').to_string();
    if s.is_empty() {
        s = "novel".to_string();
    }
    s
}

/// Ensure output path parent exists; return error otherwise.
fn validate_output_path(path: &Path) -> Result<(), CliRunError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(CliRunError::Output(format!(
                "Cannot write output: {}: parent directory does not exist.",
                path.display()
            )));
        }
    }
    Ok(())
}

/// Normalize a --source argument the way the registry keys are normalized.
fn normalize_source_key(source: &str) -> String {
    if source.ends_with('/') {
        source.to_string()
    } else {
        format!("{}/", source)
    }
}

fn print_results(results: &[SearchResult]) {
    for result in results {
        println!("{}", result.title);
        println!("    {}", result.url);
        if let Some(info) = &result.info {
            println!("    {}", info);
        }
    }
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let registry = Registry::with_builtin_sources()?;

    match &args.command {
        Command::Sources { rejected } => run_sources(&registry, *rejected),
        Command::Search { query, source } => {
            let mut client = build_client(args)?;
            run_search(&registry, &mut client, query, source.as_deref())
        }
        Command::Fetch {
            url,
            output,
            chapters,
            info_only,
        } => {
            let mut client = build_client(args)?;
            run_fetch(
                &registry,
                &mut client,
                args,
                url,
                output.as_deref(),
                *chapters,
                *info_only,
            )
        }
    }
}

fn build_client(args: &Args) -> Result<FetchClient, CliRunError> {
    const DEFAULT_DELAY_SECS: u64 = 2;
    const DEFAULT_TIMEOUT_SECS: u64 = 30;

    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    let delay_secs = args
        .delay
        .or_else(|| config.as_ref().and_then(|c| c.request_delay_secs))
        .unwrap_or(DEFAULT_DELAY_SECS);
    let timeout_secs = args
        .timeout
        .or_else(|| config.as_ref().and_then(|c| c.timeout_secs))
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let user_agent = args
        .user_agent
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.user_agent.clone()));

    let mut builder = FetchClient::builder()
        .delay_secs(delay_secs)
        .timeout_secs(timeout_secs);
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))
}

fn run_sources(registry: &Registry, include_rejected: bool) -> Result<(), CliRunError> {
    let mut entries: Vec<(&str, &str)> = registry
        .iter()
        .map(|(url, decl)| (url, decl.name))
        .collect();
    entries.sort();
    for (url, name) in entries {
        println!("{}  {}", url, name);
    }
    if include_rejected {
        let mut rejected: Vec<(&str, &str)> = rejected_sources().collect();
        rejected.sort();
        println!();
        println!("Rejected sources:");
        for (url, reason) in rejected {
            println!("{}  {}", url, reason);
        }
    }
    Ok(())
}

fn run_search(
    registry: &Registry,
    client: &mut FetchClient,
    query: &str,
    source: Option<&str>,
) -> Result<(), CliRunError> {
    // One declaration can be registered under several URLs; search each
    // crawler once.
    let mut crawlers: BTreeMap<&str, &SourceDecl> = BTreeMap::new();
    match source {
        Some(source) => {
            let key = normalize_source_key(source);
            let decl = registry.get(&key).ok_or_else(|| {
                CliRunError::InvalidInput(format!(
                    "No crawler registered for {}. Run `lnscrape sources` to list supported sites.",
                    key
                ))
            })?;
            crawlers.insert(decl.name, decl);
        }
        None => {
            for (_, decl) in registry.iter() {
                crawlers.insert(decl.name, decl);
            }
        }
    }

    let mut total = 0usize;
    for decl in crawlers.values() {
        let crawler = (decl.build)();
        match crawler.search(client, query) {
            Ok(results) => {
                total += results.len();
                print_results(&results);
            }
            Err(e) => eprintln!("Warning: search failed for {}: {}", decl.name, e),
        }
    }
    if total == 0 {
        eprintln!("No results for '{}'.", query);
    }
    Ok(())
}

fn run_fetch(
    registry: &Registry,
    client: &mut FetchClient,
    args: &Args,
    url: &str,
    output: Option<&Path>,
    chapters: Option<(u32, u32)>,
    info_only: bool,
) -> Result<(), CliRunError> {
    let (base, decl) = registry.resolve(url).ok_or_else(|| {
        CliRunError::InvalidInput(format!(
            "Unsupported novel URL: {}. Run `lnscrape sources` to list supported sites.",
            url
        ))
    })?;
    log::debug!("routing {} to {} (registered under {})", url, decl.name, base);

    let crawler = (decl.build)();
    let mut novel = crawler.fetch_novel(client, url)?;
    if let Some((from, to)) = chapters {
        novel.chapters.retain(|c| c.id >= from && c.id <= to);
    }

    if !info_only {
        let total = novel.chapters.len() as u64;
        let bar = if args.quiet || total == 0 {
            None
        } else {
            let bar = indicatif::ProgressBar::new(total);
            bar.set_style(
                indicatif::ProgressStyle::default_bar()
                    .template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
                    .unwrap()
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                    .progress_chars("█▉▊▋▌▍▎▏ "),
            );
            bar.enable_steady_tick(Duration::from_millis(80));
            Some(bar)
        };
        for i in 0..novel.chapters.len() {
            if let Some(bar) = &bar {
                bar.set_position(i as u64);
                bar.set_message(format!("Fetching chapter {}/{}", i + 1, total));
            }
            let body = crawler.fetch_chapter(client, &novel.chapters[i])?;
            novel.chapters[i].body = Some(body);
        }
        if let Some(bar) = bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }

    let output_path = resolve_output_path(output, &novel)?;
    validate_output_path(&output_path)?;
    let f = std::fs::File::create(&output_path).map_err(|e| {
        CliRunError::Output(format!("Cannot create {}: {}", output_path.display(), e))
    })?;
    serde_json::to_writer(f, &novel)
        .map_err(|e| CliRunError::Output(format!("Failed to write JSON: {}", e)))?;

    if !args.quiet {
        eprintln!("Wrote {}", output_path.display());
    }
    Ok(())
}

fn resolve_output_path(output: Option<&Path>, novel: &Novel) -> Result<PathBuf, CliRunError> {
    if let Some(path) = output {
        return Ok(path.to_path_buf());
    }
    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    let output_dir: PathBuf = config
        .and_then(|c| c.output_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok(output_dir.join(format!("{}.json", sanitize_title(&novel.title))))
}
