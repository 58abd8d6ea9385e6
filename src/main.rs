//! Pipermail-Harvester main entry point
//!
//! This is the command-line interface for the pipermail archive harvester.

use chrono::{DateTime, Utc};
use clap::Parser;
use pipermail_harvester::config::{load_config_with_hash, validate, Config};
use pipermail_harvester::crawler::{parse_archive_timestamp, run_crawl};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Pipermail-Harvester: an incremental mailing-list archive crawler
///
/// Walks every list of a pipermail archive, rebuilds the thread structure of each
/// page and upserts every message into a SQLite database. Re-running refreshes
/// the database; `--update` only revisits recent pages.
#[derive(Parser, Debug)]
#[command(name = "pipermail-harvester")]
#[command(version)]
#[command(about = "An incremental mailing-list archive crawler", long_about = None)]
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

    /// Number of enrichment workers per page
    #[arg(long, value_name = "N")]
    parallelism: Option<u32>,

    /// Skip lists whose id sorts before this one
    #[arg(long, value_name = "LIST")]
    start_at: Option<String>,

    /// Only crawl pages from the configured update window
    #[arg(long)]
    update: bool,

    /// Only crawl pages starting after this timestamp (wins over --update)
    #[arg(long, value_name = "TIMESTAMP", value_parser = parse_since)]
    since: Option<DateTime<Utc>>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

fn parse_since(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_archive_timestamp(raw).ok_or_else(|| format!("unrecognised timestamp '{}'", raw))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    apply_overrides(&mut config, &cli);
    validate(&config)?;

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pipermail_harvester=info,warn"),
            1 => EnvFilter::new("pipermail_harvester=debug,info"),
            2 => EnvFilter::new("pipermail_harvester=trace,debug"),
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

/// Command-line flags win over the file
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(parallelism) = cli.parallelism {
        config.crawler.parallelism = parallelism;
    }
    if let Some(start_at) = &cli.start_at {
        config.crawler.start_at = Some(start_at.trim().to_lowercase());
    }
    if cli.update {
        config.crawler.update = true;
    }
    if let Some(since) = cli.since {
        config.crawler.since = Some(since);
    }
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Pipermail-Harvester Dry Run ===\n");

    println!("Archive:");
    println!("  Base URL: {}", config.archive.base_url);
    println!("  Catalog: {}", config.archive.catalog_url);

    println!("\nCrawler Configuration:");
    println!("  Parallelism: {}", config.crawler.parallelism);
    println!("  Commit every: {} messages", config.crawler.commit_every);
    println!(
        "  Start at: {}",
        config.crawler.start_at.as_deref().unwrap_or("(first list)")
    );
    match config.cutoff(Utc::now()) {
        Some(cutoff) => println!("  Cutoff: pages starting before {} are skipped", cutoff),
        None => println!("  Cutoff: none (full crawl)"),
    }
    println!(
        "  Retry backoff: {}ms, x{} per attempt, capped at {}ms",
        config.retry.initial_delay_ms, config.retry.multiplier, config.retry.max_delay_ms
    );

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\nExcluded Lists ({}):", config.lists.exclude.len());
    for pattern in &config.lists.exclude {
        println!("  - {}", pattern);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use pipermail_harvester::output::{load_statistics, print_statistics};
    use pipermail_harvester::storage::open_storage;
    use std::path::Path;

    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str) -> Result<(), Box<dyn std::error::Error>> {
    use pipermail_harvester::output::print_crawl_summary;

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    match run_crawl(config, config_hash, Some(cancel)).await {
        Ok(summary) => {
            if !summary.interrupted {
                tracing::info!("Crawl completed successfully");
            }
            print_crawl_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// First Ctrl-C stops after the current page; a second one exits immediately
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("Interrupt received, finishing the current page (Ctrl-C again to abort)");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::error!("Second interrupt, aborting");
            std::process::exit(130);
        }
    });
}
