//! Google Scholar crawler CLI
//!
//! Drives a WebDriver-controlled Chrome through co-author exploration and
//! author search, and offers offline commands over the collected logs.

mod browser;
mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use scholar_crawler::{
    author_names, explore_profiles, profile_urls, remove_stale_lock, repair_profiles,
    search_authors, ExploreConfig, ItemFailurePolicy, OutputLayout, OutputLock, SearchConfig,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::browser::WebDriverPage;
use crate::config::Config;

#[derive(Parser)]
#[command(name = "scholar")]
#[command(about = "Resumable Google Scholar crawler")]
struct Cli {
    /// Output directory (overrides SCHOLAR_OUT_DIR)
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk co-author links breadth-first from seed profile URLs
    Explore {
        /// Deepest level to visit; seeds are level 0
        #[arg(long, default_value_t = 1)]
        depth_limit: usize,
        /// Keep the site's default article order
        #[arg(long)]
        no_order_by_year: bool,
        #[arg(long, value_enum, default_value_t = FailurePolicy::Abort)]
        on_error: FailurePolicy,
        /// Profile URLs; read from stdin when omitted
        seeds: Vec<String>,
    },

    /// Search each author and export result citations
    Search {
        #[arg(long, default_value_t = 3)]
        page_limit: usize,
        /// Extra search term appended to every query
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long, value_enum, default_value_t = FailurePolicy::Skip)]
        on_error: FailurePolicy,
        /// Author names; read from stdin when omitted
        authors: Vec<String>,
    },

    /// Re-extract articles and tags from saved HTML into a new profile log
    Repair {
        /// Output file suffix (defaults to a timestamp)
        #[arg(long)]
        suffix: Option<String>,
    },

    /// Print unique profile URLs found in a search-result log
    ProfileUrls { file: Option<PathBuf> },

    /// Print unique citation authors found in a search-result log
    Authors { file: Option<PathBuf> },

    /// Remove a lock left behind by a crashed run
    Unlock,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FailurePolicy {
    Abort,
    Skip,
}

impl From<FailurePolicy> for ItemFailurePolicy {
    fn from(policy: FailurePolicy) -> Self {
        match policy {
            FailurePolicy::Abort => ItemFailurePolicy::Abort,
            FailurePolicy::Skip => ItemFailurePolicy::Skip,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout is reserved for listings
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scholar_crawler=debug,scholar=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(out_dir) = cli.out_dir {
        config.out_dir = out_dir;
    }
    let layout = OutputLayout::new(&config.out_dir);

    match cli.command {
        Commands::Explore {
            depth_limit,
            no_order_by_year,
            on_error,
            seeds,
        } => {
            let seeds = inputs_or_stdin(seeds).await?;
            let explore = ExploreConfig::new(depth_limit)
                .with_base_url(&config.base_url)
                .with_order_by_year(!no_order_by_year)
                .with_failure_policy(on_error.into());

            let lock = lock_output(&layout, "explore").await?;
            let browser = launch(&config).await?;
            let outcome = explore_profiles(browser.clone(), &layout, &seeds, explore).await;
            close(browser).await;
            let stats = outcome.context("Profile exploration failed")?;
            lock.release()?;

            tracing::info!(?stats, "Done");
        }

        Commands::Search {
            page_limit,
            keyword,
            on_error,
            authors,
        } => {
            let authors = inputs_or_stdin(authors).await?;
            let mut search = SearchConfig::new(page_limit)
                .with_search_url(&config.search_url)
                .with_failure_policy(on_error.into());
            if let Some(keyword) = keyword {
                search = search.with_keyword(keyword);
            }

            let lock = lock_output(&layout, "search").await?;
            let browser = launch(&config).await?;
            let outcome =
                search_authors(browser.clone(), layout.results_log(), &authors, search).await;
            close(browser).await;
            let stats = outcome.context("Author search failed")?;
            lock.release()?;

            tracing::info!(?stats, "Done");
        }

        Commands::Repair { suffix } => {
            let lock = lock_output(&layout, "repair").await?;
            let report = repair_profiles(&layout, suffix.as_deref())
                .await
                .context("Profile repair failed")?;
            lock.release()?;

            println!("{}", report.destination.display());
        }

        Commands::ProfileUrls { file } => {
            let path = file.unwrap_or_else(|| layout.results_log());
            for url in profile_urls(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?
            {
                println!("{url}");
            }
        }

        Commands::Authors { file } => {
            let path = file.unwrap_or_else(|| layout.results_log());
            for name in author_names(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?
            {
                println!("{name}");
            }
        }

        Commands::Unlock => {
            if remove_stale_lock(&layout)? {
                tracing::info!(path = ?layout.lock_path(), "Removed stale lock");
            } else {
                tracing::info!(path = ?layout.lock_path(), "No lock present");
            }
        }
    }

    Ok(())
}

async fn lock_output(layout: &OutputLayout, command: &str) -> Result<OutputLock> {
    layout
        .ensure_dirs()
        .await
        .with_context(|| format!("Failed to create {}", layout.root().display()))?;
    OutputLock::acquire(layout, command).context("Output directory is busy")
}

async fn launch(config: &Config) -> Result<WebDriverPage> {
    WebDriverPage::launch(
        &config.webdriver_url,
        config.download_dir(),
        config.headless,
        config.wait_timeout,
    )
    .await
    .with_context(|| format!("Failed to start a browser via {}", config.webdriver_url))
}

async fn close(browser: WebDriverPage) {
    if let Err(err) = browser.close().await {
        tracing::warn!(error = %err, "Failed to close browser session");
    }
}

/// Positional inputs, or non-blank stdin lines when none were given.
async fn inputs_or_stdin(inputs: Vec<String>) -> Result<Vec<String>> {
    if !inputs.is_empty() {
        return Ok(inputs);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut inputs = Vec::new();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if !line.is_empty() {
            inputs.push(line.to_string());
        }
    }
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explore_defaults() {
        let cli = Cli::try_parse_from(["scholar", "explore", "/citations?user=A"]).unwrap();

        match cli.command {
            Commands::Explore {
                depth_limit,
                no_order_by_year,
                on_error,
                seeds,
            } => {
                assert_eq!(depth_limit, 1);
                assert!(!no_order_by_year);
                assert!(matches!(on_error, FailurePolicy::Abort));
                assert_eq!(seeds, vec!["/citations?user=A"]);
            }
            _ => panic!("expected explore"),
        }
    }

    #[test]
    fn test_search_flags() {
        let cli = Cli::try_parse_from([
            "scholar",
            "search",
            "--page-limit",
            "5",
            "--keyword",
            "optics",
            "--on-error",
            "abort",
            "--out-dir",
            "/tmp/out",
            "Jane Doe",
        ])
        .unwrap();

        assert_eq!(cli.out_dir, Some(PathBuf::from("/tmp/out")));
        match cli.command {
            Commands::Search {
                page_limit,
                keyword,
                on_error,
                authors,
            } => {
                assert_eq!(page_limit, 5);
                assert_eq!(keyword.as_deref(), Some("optics"));
                assert_eq!(ItemFailurePolicy::from(on_error), ItemFailurePolicy::Abort);
                assert_eq!(authors, vec!["Jane Doe"]);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_listing_file_is_optional() {
        let cli = Cli::try_parse_from(["scholar", "profile-urls"]).unwrap();
        assert!(matches!(cli.command, Commands::ProfileUrls { file: None }));
    }
}
