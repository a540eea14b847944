//! Crawler module for anonymized, depth-bounded crawling
//!
//! This module contains the core crawling logic, including:
//! - Tor-routed HTTP fetching with retry and circuit rotation
//! - Content classification into text pages and media
//! - HTML link, media and text extraction
//! - The depth-bounded frontier
//! - Overall crawl coordination

mod classifier;
mod coordinator;
mod fetcher;
mod frontier;
mod parser;

pub use classifier::{Classification, Classifier, IgnoreReason};
pub use coordinator::{Coordinator, CrawlReport, CrawlSettings};
pub use fetcher::{build_tor_client, FetchError, FetchedResource, Fetcher, RetryPolicy, TorFetcher};
pub use frontier::{CrawlUnit, Frontier};
pub use parser::{ExtractedPage, HtmlExtractor, LinkExtractor};

use crate::config::Config;
use crate::history::open_history;
use crate::output::write_json;
use crate::tor::{probe_proxy, verify_tor_routing, CircuitRotator, TorControl};
use crate::transform::Transforms;
use crate::UmbraError;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Check that the Tor SOCKS proxy is reachable
/// 2. Open the history store, clearing it when `fresh` is set
/// 3. Build the Tor-routed fetcher and the circuit rotator
/// 4. Crawl until the frontier drains or `cancel` fires
/// 5. Write the aggregate as JSON, partial results included
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl finished or was cancelled
/// * `Err(UmbraError)` - Proxy unavailable, history unusable, or output
///   could not be written
pub async fn run_crawl(
    config: Config,
    fresh: bool,
    cancel: CancellationToken,
) -> Result<CrawlReport, UmbraError> {
    let settings = CrawlSettings::from_config(&config)?;

    let socks_endpoint = config.tor.socks_endpoint();
    probe_proxy(
        &socks_endpoint,
        Duration::from_secs(config.fetch.connect_timeout_secs),
    )
    .await?;
    tracing::info!("Tor SOCKS proxy reachable at {}", socks_endpoint);

    let mut history = open_history(&config.history)?;
    if fresh {
        tracing::info!("Clearing {} visited URLs from {}", history.len(), history.location());
        history.clear()?;
    }

    let control = TorControl::from_config(&config.tor);
    let rotator = Arc::new(CircuitRotator::new(Arc::new(control)));
    let fetcher = TorFetcher::new(&config.fetch, &config.tor, rotator.clone())?;

    if let Some(verify_url) = &config.tor.verify_url {
        match verify_tor_routing(fetcher.client(), verify_url).await {
            Ok(true) => tracing::info!("Confirmed requests are routed through Tor"),
            Ok(false) => tracing::warn!("{} did not confirm Tor routing", verify_url),
            Err(e) => tracing::warn!("Could not verify Tor routing via {}: {}", verify_url, e),
        }
    }

    let mut coordinator = Coordinator::new(settings, Arc::new(fetcher), history)
        .with_classifier(Classifier::new(config.classifier.min_media_size))
        .with_transforms(Transforms::from_config(&config.transforms))
        .with_rotator(rotator.clone());

    let report = coordinator.run(cancel).await?;
    if rotator.failed_rotations() > 0 {
        tracing::warn!(
            "{} of {} circuit rotations were not accepted by the control port",
            rotator.failed_rotations(),
            rotator.rotations()
        );
    }

    let output_path = Path::new(&config.output.path);
    write_json(&report.content, output_path)?;
    tracing::info!(
        "Wrote {} text pages and {} media entries to {}",
        report.content.text_pages.len(),
        report.content.media.len(),
        output_path.display()
    );

    Ok(report)
}
