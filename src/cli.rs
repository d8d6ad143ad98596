// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
// =============================================================================

use clap::Parser;
use linkwalk::worklist::DEFAULT_CONCURRENCY;

// This struct represents our entire CLI application
//
// #[derive(Parser)] tells clap to automatically generate parsing code
// The #[command(...)] attributes configure how the CLI behaves
#[derive(Parser, Debug)]
#[command(
    name = "linkwalk",
    version,
    about = "Crawl the web concurrently from one or more seed URLs",
    long_about = "linkwalk crawls outward from the given URLs, fetching each page exactly once, \
                  with a fixed ceiling on how many pages are fetched at the same time. \
                  It stops when every reachable page has been visited."
)]
pub struct Cli {
    /// Seed URLs to start crawling from (e.g., https://example.com)
    ///
    /// Passing none is allowed: the crawl finishes immediately
    pub urls: Vec<String>,

    /// Maximum number of pages fetched at the same time (must be at least 1)
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Stop after this many pages have been admitted
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Only follow links that stay on the seeds' domains
    #[arg(long)]
    pub same_domain: bool,

    /// Per-request timeout in seconds (must be at least 1)
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,

    /// Output the crawl report in JSON format instead of a list
    #[arg(long)]
    pub json: bool,
}
