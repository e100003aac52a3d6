//! Domain Crawler main entry point
//!
//! This is the command-line interface for the single-domain crawler.

use anyhow::{Context, Result};
use clap::Parser;
use domain_crawler::config::{load_config_with_hash, Config};
use domain_crawler::crawler::crawl;
use domain_crawler::output::{load_statistics, print_report, print_statistics};
use domain_crawler::storage::{SqliteStorage, Storage};
use domain_crawler::url::parse_start_url;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Domain Crawler: a polite single-domain breadth-first crawler
///
/// Crawls one site and its subdomains under a global rate limit, storing
/// every fetched page exactly once in SQLite.
#[derive(Parser, Debug)]
#[command(name = "domain-crawler")]
#[command(version)]
#[command(about = "A polite single-domain breadth-first crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Do not preload URLs stored by earlier runs; known pages are fetched again
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config, cli.fresh)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config, &config_hash, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("domain_crawler=info,warn"),
            1 => EnvFilter::new("domain_crawler=debug,info"),
            2 => EnvFilter::new("domain_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, fresh: bool) -> Result<()> {
    println!("=== Domain Crawler Dry Run ===\n");

    let (start_url, target_domain) =
        parse_start_url(&config.crawler.start_url).context("Invalid start URL")?;

    println!("Crawler Configuration:");
    println!("  Start URL: {}", start_url);
    println!("  Target domain: {} (subdomains included)", target_domain);
    println!("  Page limit: {}", config.crawler.page_limit);
    println!("  Workers: {}", config.crawler.workers);
    println!("  Rate interval: {}ms", config.crawler.rate_interval_ms);
    println!("  Fetch timeout: {}s", config.crawler.fetch_timeout_secs);
    println!(
        "  Intake capacity: {}",
        config.crawler.effective_intake_capacity()
    );
    println!("  Idle backoff: {}ms", config.crawler.idle_backoff_ms);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    let db_path = Path::new(&config.output.database_path);
    let known = if fresh || !db_path.exists() {
        0
    } else {
        SqliteStorage::new(db_path)
            .context("Failed to open database")?
            .get_all_urls()
            .context("Failed to read stored URLs")?
            .len()
    };

    println!("\n✓ Configuration is valid");
    println!("✓ Would preload {} known URLs", known);

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))
        .context("Failed to open database")?;
    let stats = load_statistics(&storage).context("Failed to load statistics")?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str, fresh: bool) -> Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl of {}", config.crawler.start_url);
    } else {
        tracing::info!("Starting crawl of {}", config.crawler.start_url);
    }

    let report = crawl(config, config_hash, fresh)
        .await
        .context("Crawl failed")?;

    print_report(&report);
    Ok(())
}
