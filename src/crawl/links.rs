// src/crawl/links.rs
// =============================================================================
// This module turns an HTML page into the list of URLs it links to.
//
// Steps:
// 1. Parse the HTML with scraper and select every <a href>
// 2. Skip anchors and non-web schemes (mailto:, tel:, javascript:)
// 3. Resolve relative links against the page URL
// 4. Normalize: drop the #fragment so "page#a" and "page#b" are one item
// 5. Keep only http/https links that fall inside the crawl scope
//
// Normalizing here matters: the worklist engine deduplicates by exact
// equality, so two spellings of the same page would otherwise be crawled
// twice.
// =============================================================================

use std::collections::HashSet;
use std::sync::OnceLock;

use anyhow::{anyhow, Result};
use scraper::{Html, Selector};
use url::Url;

/// Which links the crawler is allowed to follow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Scope {
    /// Follow every http/https link.
    #[default]
    Anywhere,
    /// Only follow links whose host is in this set.
    Domains(HashSet<String>),
}

impl Scope {
    /// A scope limited to the hosts of the given seed URLs.
    pub fn from_seeds<'a>(seeds: impl IntoIterator<Item = &'a str>) -> Self {
        let domains = seeds
            .into_iter()
            .filter_map(|seed| Url::parse(seed).ok())
            .filter_map(|url| url.host_str().map(str::to_string))
            .collect();
        Scope::Domains(domains)
    }

    pub fn allows(&self, url: &Url) -> bool {
        match self {
            Scope::Anywhere => true,
            Scope::Domains(domains) => url
                .host_str()
                .map(|host| domains.contains(host))
                .unwrap_or(false),
        }
    }
}

/// Validates and normalizes a seed URL given on the command line.
///
/// Seeds must be absolute http/https URLs with a host.
pub fn normalize_seed(raw: &str) -> Result<String> {
    let mut url = Url::parse(raw).map_err(|e| anyhow!("Invalid URL '{}': {}", raw, e))?;

    if !is_web_url(&url) {
        return Err(anyhow!("Not an http(s) URL: {}", raw));
    }
    if url.host_str().is_none() {
        return Err(anyhow!("URL has no host: {}", raw));
    }

    url.set_fragment(None);
    Ok(url.to_string())
}

/// Extracts every followable link from `html`.
///
/// Links keep page order. Duplicates within one page are removed.
pub fn extract_links(html: &str, page_url: &Url, scope: &Scope) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(anchor_selector()) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_link(page_url, href) else {
            continue;
        };

        if is_web_url(&url) && scope.allows(&url) {
            let link = url.to_string();
            if seen.insert(link.clone()) {
                links.push(link);
            }
        }
    }

    links
}

// Parsed once; the selector text is a constant
fn anchor_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => unreachable!("a[href] is a valid selector"),
    })
}

// Resolves a link (possibly relative) to an absolute URL without a fragment
fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();

    // Skip anchors and special protocols
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:")
    {
        return None;
    }

    // join() handles both absolute and relative hrefs
    let mut url = base.join(href).ok()?;
    url.set_fragment(None);
    Some(url)
}

fn is_web_url(url: &Url) -> bool {
    url.scheme() == "http" || url.scheme() == "https"
}
