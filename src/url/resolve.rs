//! Redirect canonicalization
//!
//! Input URLs are frequently short links or tracking redirects. Before a
//! proxy session is spent on a page, the canonicalizer follows the redirect
//! chain on a direct connection and hands the final destination downstream.

use crate::crawler::build_resolver_client;
use async_trait::async_trait;
use reqwest::{Client, Method};
use std::fmt;
use std::time::Duration;

/// One way of asking a server where a URL ends up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStrategy {
    /// HEAD request, no body transferred
    Head,
    /// Full GET request, used when HEAD is refused or times out
    Get,
}

impl ResolveStrategy {
    /// The default chain: HEAD first, GET as fallback
    pub fn default_chain() -> Vec<Self> {
        vec![Self::Head, Self::Get]
    }

    fn method(&self) -> Method {
        match self {
            Self::Head => Method::HEAD,
            Self::Get => Method::GET,
        }
    }
}

impl fmt::Display for ResolveStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Head => write!(f, "HEAD"),
            Self::Get => write!(f, "GET"),
        }
    }
}

/// Resolves an input URL to the URL that should actually be fetched
///
/// Implementations never fail: when resolution is impossible they return
/// the input unchanged.
#[async_trait]
pub trait UrlResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> String;
}

/// Follows redirects with an ordered list of strategies
///
/// Each strategy gets the same time budget. The first strategy that obtains
/// any HTTP response wins and its final URL (after redirects) is returned.
pub struct Canonicalizer {
    client: Client,
    strategies: Vec<ResolveStrategy>,
    budget: Duration,
}

impl Canonicalizer {
    /// Creates a canonicalizer with the default HEAD-then-GET chain
    ///
    /// # Arguments
    ///
    /// * `budget` - Timeout applied to every individual strategy
    pub fn new(budget: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_resolver_client()?,
            strategies: ResolveStrategy::default_chain(),
            budget,
        })
    }

    /// Replaces the strategy chain
    pub fn with_strategies(mut self, strategies: Vec<ResolveStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    async fn try_strategy(
        &self,
        strategy: ResolveStrategy,
        url: &str,
    ) -> Result<String, reqwest::Error> {
        let response = self
            .client
            .request(strategy.method(), url)
            .timeout(self.budget)
            .send()
            .await?;

        Ok(response.url().to_string())
    }
}

#[async_trait]
impl UrlResolver for Canonicalizer {
    async fn resolve(&self, url: &str) -> String {
        for strategy in &self.strategies {
            match self.try_strategy(*strategy, url).await {
                Ok(final_url) => {
                    if final_url != url {
                        tracing::info!("Resolved ({}) {} -> {}", strategy, url, final_url);
                    }
                    return final_url;
                }
                Err(e) if e.is_timeout() => {
                    tracing::warn!(
                        "{} resolve for {} exceeded {:?}",
                        strategy,
                        url,
                        self.budget
                    );
                }
                Err(e) => {
                    tracing::warn!("{} resolve failed for {}: {}", strategy, url, e);
                }
            }
        }

        url.to_string()
    }
}

/// Resolver that hands every URL through untouched
///
/// Used when redirect resolution is switched off in the configuration.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughResolver;

#[async_trait]
impl UrlResolver for PassthroughResolver {
    async fn resolve(&self, url: &str) -> String {
        url.to_string()
    }
}
