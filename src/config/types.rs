use crate::crawler::{DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_TARGET_TYPES};
use crate::session::DEFAULT_SESSION_PAGE_LIMIT;
use crate::url::{collect_input_urls, DEFAULT_RESOLVE_TIMEOUT_SECS};
use crate::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default number of concurrent workers
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Default lower bound of the politeness delay (milliseconds)
pub const DEFAULT_DELAY_MS_MIN: u64 = 250;

/// Default upper bound of the politeness delay (milliseconds)
pub const DEFAULT_DELAY_MS_MAX: u64 = 750;

/// Main configuration structure for ld-harvest
///
/// Input URLs may be given as a `urls` list, as `[[start-urls]]` tables, or
/// as a single `url`. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub urls: Vec<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub start_urls: Vec<StartUrl>,

    #[serde(default)]
    pub scraper: ScraperConfig,

    #[serde(default)]
    pub proxy: ProxyConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Raw input URLs in the order they will be processed
    ///
    /// `[[start-urls]]` entries come first, then `urls`. The single `url`
    /// key is only consulted when both lists are empty.
    pub fn input_urls(&self) -> Vec<String> {
        let mut raw: Vec<String> = self
            .start_urls
            .iter()
            .map(|entry| entry.url.clone())
            .chain(self.urls.iter().cloned())
            .collect();

        if raw.is_empty() {
            raw.extend(self.url.iter().cloned());
        }

        raw
    }

    /// Validated input URLs, invalid entries dropped
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<String>)` - At least one usable URL
    /// * `Err(ConfigError::NoUrls)` - Nothing usable remained
    pub fn work_urls(&self) -> ConfigResult<Vec<String>> {
        let urls = collect_input_urls(&self.input_urls());
        if urls.is_empty() {
            return Err(ConfigError::NoUrls);
        }
        Ok(urls)
    }
}

/// One `[[start-urls]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct StartUrl {
    pub url: String,
}

/// Scraper behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScraperConfig {
    /// Number of concurrent workers
    pub concurrency: usize,

    /// Pages served by one session before it is rotated
    pub session_pages: u32,

    /// Timeout of one fetch attempt (seconds)
    pub timeout_secs: u64,

    /// Budget of each redirect resolution strategy (seconds)
    pub resolve_timeout_secs: u64,

    /// Resolve redirecting input URLs before fetching
    pub resolve_redirects: bool,

    /// Lower bound of the delay after each item (milliseconds)
    pub delay_ms_min: u64,

    /// Upper bound of the delay after each item (milliseconds)
    pub delay_ms_max: u64,
}

impl ScraperConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            session_pages: DEFAULT_SESSION_PAGE_LIMIT,
            timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            resolve_timeout_secs: DEFAULT_RESOLVE_TIMEOUT_SECS,
            resolve_redirects: true,
            delay_ms_min: DEFAULT_DELAY_MS_MIN,
            delay_ms_max: DEFAULT_DELAY_MS_MAX,
        }
    }
}

/// Proxy configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProxyConfig {
    /// Proxy URL with a `{session}` placeholder; direct egress when unset
    pub url_template: Option<String>,
}

/// Entity selection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExtractionConfig {
    /// `@type` names accepted as the target entity, case-sensitive
    pub target_types: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            target_types: DEFAULT_TARGET_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database file
    pub database_path: Option<PathBuf>,

    /// Path to the JSON lines dataset file
    pub jsonl_path: Option<PathBuf>,
}
