//! Blocking HTTP client shared by all crawlers: HTML GET, JSON GET, and form
//! POST, with a cookie jar and a configurable delay between requests.

use crate::sources::error::CrawlerError;
use scraper::Html;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; lnscrape/0.1; +https://github.com/lnscrape)";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DELAY_SECS: u64 = 2;
const MAX_REDIRECTS: usize = 10;

/// Blocking HTTP client that enforces a delay between requests.
#[derive(Debug)]
pub struct FetchClient {
    inner: reqwest::blocking::Client,
    delay: Duration,
    last_request: Option<Instant>,
}

impl FetchClient {
    /// Build a client with default User-Agent, timeout, and delay.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::builder().build()
    }

    /// Builder for custom User-Agent, delay, and timeout.
    pub fn builder() -> FetchClientBuilder {
        FetchClientBuilder::default()
    }

    /// GET a page and parse it as an HTML document.
    pub fn get_html(&mut self, url: &str) -> Result<Html, CrawlerError> {
        let body = self.get_text(url)?;
        Ok(Html::parse_document(&body))
    }

    /// GET a URL and deserialize the response body as JSON.
    pub fn get_json<T: DeserializeOwned>(&mut self, url: &str) -> Result<T, CrawlerError> {
        let body = self.get_text(url)?;
        serde_json::from_str(&body).map_err(|e| CrawlerError::Json {
            url: url.to_string(),
            source: e,
        })
    }

    /// POST form data and parse the response as an HTML document.
    pub fn post_form_html(
        &mut self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<Html, CrawlerError> {
        self.wait_delay();
        log::debug!("POST {}", url);
        let response = self
            .inner
            .post(url)
            .form(form)
            .send()
            .map_err(|e| CrawlerError::Network {
                url: url.to_string(),
                source: e,
            })?;
        self.last_request = Some(Instant::now());
        let body = check_response(response, url)?;
        Ok(Html::parse_document(&body))
    }

    fn get_text(&mut self, url: &str) -> Result<String, CrawlerError> {
        self.wait_delay();
        log::debug!("GET {}", url);
        let response = self
            .inner
            .get(url)
            .send()
            .map_err(|e| CrawlerError::Network {
                url: url.to_string(),
                source: e,
            })?;
        self.last_request = Some(Instant::now());
        check_response(response, url)
    }

    fn wait_delay(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                std::thread::sleep(self.delay - elapsed);
            }
        }
    }
}

/// Check response status and read the body as UTF-8.
fn check_response(
    response: reqwest::blocking::Response,
    url: &str,
) -> Result<String, CrawlerError> {
    let status = response.status();
    if !status.is_success() {
        return Err(CrawlerError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    response
        .text()
        .map_err(|e| CrawlerError::BodyRead { source: e })
}

/// Builder for FetchClient with optional User-Agent, delay, and timeout.
#[derive(Debug)]
pub struct FetchClientBuilder {
    user_agent: Option<String>,
    delay_secs: u64,
    timeout_secs: u64,
}

impl Default for FetchClientBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            delay_secs: DEFAULT_DELAY_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl FetchClientBuilder {
    /// Set a custom User-Agent. If not set, a browser-like default is used.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set delay between requests in seconds. Default 2.
    pub fn delay_secs(mut self, secs: u64) -> Self {
        self.delay_secs = secs;
        self
    }

    /// Set request timeout in seconds. Default 30.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Build the blocking client and wrapper.
    pub fn build(self) -> Result<FetchClient, reqwest::Error> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let inner = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(FetchClient {
            inner,
            delay: Duration::from_secs(self.delay_secs),
            last_request: None,
        })
    }
}
