// src/crawl/fetch.rs
// =============================================================================
// The crawler's Extractor: URL in, URLs out.
//
// extract() downloads one page and returns the links found on it. Errors
// (timeouts, DNS failures, 404s, non-UTF-8 bodies) are returned to the
// engine, which logs them and moves on.
//
// One reqwest::Client is built up front and shared by every task. It pools
// connections, so cloning it or sharing it by reference is cheap.
// =============================================================================

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::info;
use url::Url;

use super::links::{extract_links, Scope};
use crate::worklist::Extractor;

/// Settings for the HTTP side of the crawl.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Per-request timeout. The engine imposes none of its own.
    pub timeout: Duration,
    /// Which links to follow.
    pub scope: Scope,
    /// Redirects followed before giving up on a page.
    pub max_redirects: usize,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            scope: Scope::Anywhere,
            max_redirects: 5,
        }
    }
}

/// Fetches pages and extracts their links.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    client: Client,
    scope: Scope,
}

impl LinkExtractor {
    pub fn new(options: CrawlOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .redirect(reqwest::redirect::Policy::limited(options.max_redirects))
            .user_agent(concat!("linkwalk/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            scope: options.scope,
        })
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    // Fetches a web page and returns its HTML content along with the final
    // URL after redirects, which is what relative links resolve against
    async fn fetch_page(&self, url: &str) -> Result<(Url, String)> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP {}", response.status()));
        }

        let final_url = response.url().clone();
        let html = response.text().await?;
        Ok((final_url, html))
    }
}

#[async_trait]
impl Extractor<String> for LinkExtractor {
    async fn extract(&self, url: &String) -> Result<Vec<String>> {
        info!(url = %url, "Crawling");

        let (page_url, html) = self
            .fetch_page(url)
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        Ok(extract_links(&html, &page_url, &self.scope))
    }
}
