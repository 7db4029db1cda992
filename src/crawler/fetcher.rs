//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the pipeline, including:
//! - Building session-bound clients (proxy route + cookie store)
//! - Building the direct client used for redirect resolution
//! - Single fetch attempts with a per-attempt timeout
//! - Error classification into a structured attempt result
//!
//! A fetch attempt never retries and never returns `Err`; retry policy
//! belongs to the item processor.

use crate::session::{ProxyRoute, Session};
use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION};
use reqwest::{redirect::Policy, Client, Proxy};
use std::sync::Arc;
use std::time::Duration;

/// Desktop browser user agent sent with every request
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Default per-attempt fetch timeout in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;

const MAX_REDIRECTS: usize = 10;

/// Result of a single fetch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttemptResult {
    /// True only for a response with status in [200, 400) and a readable body
    pub succeeded: bool,

    /// HTTP status code, if a response was received
    pub status: Option<u16>,

    /// Final URL after redirects (the requested URL if no response)
    pub final_url: String,

    /// Response body on success
    pub body: Option<String>,

    /// Description of what went wrong
    pub error_message: Option<String>,
}

impl FetchAttemptResult {
    fn success(final_url: String, status: u16, body: String) -> Self {
        Self {
            succeeded: true,
            status: Some(status),
            final_url,
            body: Some(body),
            error_message: None,
        }
    }

    /// Builds a failed attempt result
    pub fn failure(final_url: impl Into<String>, status: Option<u16>, error: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            status,
            final_url: final_url.into(),
            body: None,
            error_message: Some(error.into()),
        }
    }
}

/// Returns true for status codes counted as a successful retrieval
pub fn is_success_status(status: u16) -> bool {
    (200..400).contains(&status)
}

/// Headers sent with every request
pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.8"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers
}

/// Builds the HTTP client for one session
///
/// The client routes through the session's proxy (or directly) and reads
/// and writes the session's cookie store.
///
/// # Arguments
///
/// * `route` - Egress route of the session
/// * `cookie_store` - Cookie jar shared with the session
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Invalid proxy URL or TLS backend failure
pub fn build_session_client(
    route: &ProxyRoute,
    cookie_store: Arc<Jar>,
) -> Result<Client, reqwest::Error> {
    let builder = Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .default_headers(browser_headers())
        .cookie_provider(cookie_store)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true);

    let builder = match route {
        ProxyRoute::Direct => builder.no_proxy(),
        ProxyRoute::Proxied(url) => builder.proxy(Proxy::all(url.as_str())?),
    };

    builder.build()
}

/// Builds the direct client used to resolve redirects
///
/// No proxy and no cookie store; resolution must not spend a session.
pub fn build_resolver_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .default_headers(browser_headers())
        .connect_timeout(Duration::from_secs(5))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .no_proxy()
        .build()
}

/// Performs exactly one GET against `url`
///
/// # Outcome Mapping
///
/// | Condition | Result |
/// |-----------|--------|
/// | Status in [200, 400), body read | `succeeded`, body set |
/// | Status outside [200, 400) | failure, `HTTP <code>` |
/// | Body read fails | failure, status kept |
/// | Timeout | failure, `Request timeout after ..` |
/// | Connection error | failure, `Connection failed: ..` |
///
/// # Arguments
///
/// * `client` - The HTTP client to use (carries route and cookies)
/// * `url` - The URL to fetch
/// * `timeout` - Budget for the whole attempt, body included
pub async fn fetch_page(client: &Client, url: &str, timeout: Duration) -> FetchAttemptResult {
    let response = match client.get(url).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => return FetchAttemptResult::failure(url, None, describe_error(&e, timeout)),
    };

    let status = response.status().as_u16();
    let final_url = response.url().to_string();

    if !is_success_status(status) {
        return FetchAttemptResult::failure(final_url, Some(status), format!("HTTP {}", status));
    }

    match response.text().await {
        Ok(body) => FetchAttemptResult::success(final_url, status, body),
        Err(e) => FetchAttemptResult::failure(final_url, Some(status), describe_error(&e, timeout)),
    }
}

fn describe_error(error: &reqwest::Error, timeout: Duration) -> String {
    if error.is_timeout() {
        format!("Request timeout after {:?}", timeout)
    } else if error.is_connect() {
        format!("Connection failed: {}", error)
    } else if error.is_redirect() {
        format!("Redirect error: {}", error)
    } else {
        error.to_string()
    }
}

/// One fetch attempt on behalf of a session
///
/// This is the seam between the retry machine and the network.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, session: &Session, url: &str) -> FetchAttemptResult;
}

/// Fetcher that goes over the network through the session's client
#[derive(Debug, Clone, Copy)]
pub struct HttpFetcher {
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, session: &Session, url: &str) -> FetchAttemptResult {
        tracing::debug!("Fetching {} on {}", url, session.name());
        fetch_page(session.client(), url, self.timeout).await
    }
}
