//! Umbra main entry point
//!
//! This is the command-line interface for the Umbra anonymous crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use umbra_crawler::config::{compute_config_hash, parse_config, validate, Config, ConfigOverrides};
use umbra_crawler::crawler::run_crawl;
use umbra_crawler::history::open_history;
use umbra_crawler::output::print_statistics;

/// Umbra: a depth-bounded anonymous web crawler
///
/// Umbra crawls a site from a seed URL through a local Tor proxy, records
/// the text pages and media it finds as JSON, and remembers visited URLs so
/// later runs only fetch what is new.
#[derive(Parser, Debug)]
#[command(name = "umbra")]
#[command(version)]
#[command(about = "A depth-bounded anonymous web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seed URL to start crawling from
    #[arg(short, long, value_name = "URL")]
    url: Option<String>,

    /// Maximum link depth from the seed
    #[arg(short, long, value_name = "N")]
    depth: Option<u32>,

    /// Where to write the JSON results
    #[arg(short, long, value_name = "FILE")]
    output: Option<String>,

    /// History file of already visited URLs
    #[arg(long, value_name = "FILE")]
    history_file: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Forget previously visited URLs before crawling
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show how many URLs the history holds and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let config = parse_config(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            let hash = compute_config_hash(path)?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    ConfigOverrides {
        seed_url: cli.url,
        max_depth: cli.depth,
        output_path: cli.output,
        history_path: cli.history_file,
    }
    .apply(&mut config);

    if cli.stats {
        return handle_stats(&config);
    }

    validate(&config).context("invalid configuration")?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, cli.fresh).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("umbra_crawler=info,umbra=info,warn"),
            1 => EnvFilter::new("umbra_crawler=debug,umbra=debug,info"),
            2 => EnvFilter::new("umbra_crawler=trace,umbra=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Umbra Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Seed URL: {}",
        config.crawler.seed_url.as_deref().unwrap_or("<none>")
    );
    println!("  Max depth: {}", config.crawler.max_depth);
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Same host only: {}", config.crawler.same_host_only);
    match config.crawler.max_pages {
        Some(max) => println!("  Max pages: {}", max),
        None => println!("  Max pages: unlimited"),
    }

    println!("\nTor:");
    println!("  SOCKS proxy: {}", config.tor.proxy_url());
    println!("  Control port: {}", config.tor.control_endpoint());
    let auth = if config.tor.control_password.is_some() {
        "password"
    } else if config.tor.cookie_path.is_some() {
        "cookie"
    } else {
        "none"
    };
    println!("  Control auth: {}", auth);

    println!("\nFetching:");
    println!("  Max attempts: {}", config.fetch.max_attempts);
    println!("  Retry backoff: {}ms", config.fetch.retry_backoff_ms);
    println!(
        "  Rotate after failures: {}",
        config.fetch.rotate_after_failures
    );
    println!("  Request timeout: {}s", config.fetch.request_timeout_secs);

    println!("\nClassifier:");
    println!("  Min media size: {} bytes", config.classifier.min_media_size);

    println!("\nTransforms:");
    println!("  Simplify: {:?}", config.transforms.simplify);
    println!("  Describe: {:?}", config.transforms.describe);

    println!("\nOutput:");
    println!(
        "  History: {} ({:?})",
        config.history.path, config.history.backend
    );
    println!("  Results: {}", config.output.path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows what the history store holds
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let history = open_history(&config.history)
        .with_context(|| format!("failed to open history at {}", config.history.path))?;

    println!("History: {}", history.location());
    println!("Visited URLs: {}", history.len());

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (forgetting visited URLs)");
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing in-flight fetches");
            on_interrupt.cancel();
        }
    });

    match run_crawl(config, fresh, cancel).await {
        Ok(report) => {
            println!();
            print_statistics(&report.statistics);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
