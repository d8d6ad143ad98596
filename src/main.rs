// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Validate the seed URLs (a bad seed stops us before anything is fetched)
// 3. Build the link extractor and the worklist engine
// 4. Run the crawl until no pages are left, or until Ctrl-C
// 5. Print the report and exit (0 = done, 2 = error, 130 = interrupted)
//
// Pages that fail to load are logged and reported, but they never change the
// exit code: only problems with the run itself do.
// =============================================================================

mod cli;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser; // Parser trait enables the parse() method
use cli::Cli;
use linkwalk::crawl::{normalize_seed, CrawlOptions, LinkExtractor, Scope};
use linkwalk::worklist::{Engine, EngineConfig, RunReport};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EXIT_OK: i32 = 0;
const EXIT_ERROR: i32 = 2;
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    // Logs go to stderr so --json output on stdout stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linkwalk=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    let seeds = cli
        .urls
        .iter()
        .map(|url| normalize_seed(url))
        .collect::<Result<Vec<_>>>()?;

    let scope = if cli.same_domain {
        Scope::from_seeds(seeds.iter().map(String::as_str))
    } else {
        Scope::Anywhere
    };

    let extractor = LinkExtractor::new(CrawlOptions {
        timeout: Duration::from_secs(cli.timeout_secs),
        scope,
        ..CrawlOptions::default()
    })?;

    let mut config = EngineConfig::default().with_concurrency(cli.concurrency);
    if let Some(max_pages) = cli.max_pages {
        config = config.with_max_items(max_pages);
    }
    let engine = Engine::new(extractor, config).context("Invalid crawl settings")?;

    // First Ctrl-C: stop starting pages and let running fetches finish.
    // Second Ctrl-C: exit right away.
    let cancel = engine.cancellation_token();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupted, waiting for in-flight pages to finish (Ctrl-C again to quit)");
        signal_cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted again, exiting");
            std::process::exit(EXIT_INTERRUPTED);
        }
    });

    let report = engine.run(seeds).await;
    print_report(&report, cli.json)?;

    Ok(exit_code(&report, cancel.is_cancelled()))
}

// A Ctrl-C that arrived after the last page was admitted still counts
fn exit_code(report: &RunReport<String>, interrupted: bool) -> i32 {
    if report.cancelled || interrupted {
        EXIT_INTERRUPTED
    } else {
        EXIT_OK
    }
}

// Prints the report either as a list or JSON
fn print_report(report: &RunReport<String>, json: bool) -> Result<()> {
    if json {
        let json_output = serde_json::to_string_pretty(report)?;
        println!("{}", json_output);
    } else {
        print_list(report);
    }
    Ok(())
}

fn print_list(report: &RunReport<String>) {
    for url in &report.visited {
        println!("{}", url);
    }

    if !report.failures.is_empty() {
        println!();
        println!("Failed:");
        for failure in &report.failures {
            println!("  {:<60} {}", truncate(&failure.item, 57), failure.error);
        }
    }

    println!();
    println!("📊 Summary:");
    println!("   📄 Visited: {}", report.visited.len());
    println!("   ❌ Failed: {}", report.failures.len());
    if !report.skipped.is_empty() {
        println!("   ⏭️  Skipped: {}", report.skipped.len());
    }
    if report.truncated {
        println!("   ✂️  Stopped at the page limit");
    }
    if report.cancelled {
        println!("   ⏹️  Interrupted");
    }
}

// Truncate long URLs for display, on a char boundary
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 4), "abcd...");
    }

    #[test]
    fn test_exit_code_reflects_interruption() {
        let mut report: RunReport<String> = RunReport::default();
        report.visited.push("https://a.example/".to_string());
        assert_eq!(exit_code(&report, false), EXIT_OK);
        assert_eq!(exit_code(&report, true), EXIT_INTERRUPTED);

        let mut skipped = report.clone();
        skipped.skipped.push("https://b.example/".to_string());
        skipped.cancelled = true;
        assert_eq!(exit_code(&skipped, false), EXIT_INTERRUPTED);
    }
}
