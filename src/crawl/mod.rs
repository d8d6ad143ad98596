// src/crawl/mod.rs
// =============================================================================
// This module handles website crawling.
//
// The crawl itself is run by the worklist engine; this module only supplies
// the pieces that know about the web:
// - fetch: the Extractor that downloads a page and returns its links
// - links: HTML link extraction, URL normalization, and crawl scope
//
// Features:
// - Relative links resolved against the final (post-redirect) page URL
// - Optional same-domain restriction
// - Fragments stripped so one page is one item
// =============================================================================

mod fetch;
mod links;

pub use fetch::{CrawlOptions, LinkExtractor};
pub use links::{extract_links, normalize_seed, Scope};
