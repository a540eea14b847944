//! Crawler coordinator - main crawl orchestration logic
//!
//! One task owns the frontier, the visited set, the history store and the
//! aggregate. Fetching, classification, extraction and transforms run in a
//! bounded pool of spawned workers whose outcomes flow back to the owner.
//! Claiming a URL and recording it therefore never race.

use crate::config::Config;
use crate::crawler::classifier::{Classification, Classifier, IgnoreReason};
use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::crawler::frontier::{CrawlUnit, Frontier};
use crate::crawler::parser::{HtmlExtractor, LinkExtractor};
use crate::history::HistoryStore;
use crate::output::{CrawlStatistics, MediaRecord, SiteContent, TextPageRecord};
use crate::state::UnitState;
use crate::tor::CircuitRotator;
use crate::transform::Transforms;
use crate::url::{normalize_url, same_host};
use crate::{ConfigError, UmbraError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Traversal limits for one crawl
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Canonical seed URL
    pub seed: Url,
    pub max_depth: u32,
    pub max_concurrent_fetches: usize,

    /// Pause before every request
    pub request_delay: Duration,

    /// Only follow page links on the seed's host
    pub same_host_only: bool,

    /// Stop dispatching after this many fetches
    pub max_pages: Option<u64>,
}

impl CrawlSettings {
    pub fn new(seed: Url, max_depth: u32) -> Self {
        Self {
            seed,
            max_depth,
            max_concurrent_fetches: 4,
            request_delay: Duration::ZERO,
            same_host_only: true,
            max_pages: None,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, UmbraError> {
        let seed = config
            .crawler
            .seed_url
            .as_deref()
            .ok_or_else(|| ConfigError::Validation("crawler.seed-url is required".to_string()))?;

        Ok(Self {
            seed: normalize_url(seed)?,
            max_depth: config.crawler.max_depth,
            max_concurrent_fetches: config.crawler.max_concurrent_fetches.max(1) as usize,
            request_delay: Duration::from_millis(config.crawler.request_delay_ms),
            same_host_only: config.crawler.same_host_only,
            max_pages: config.crawler.max_pages,
        })
    }
}

/// Result of a crawl that was not stopped by a fatal error
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Everything classified, complete or partial if cancelled
    pub content: SiteContent,
    pub statistics: CrawlStatistics,
}

impl CrawlReport {
    pub fn failed(&self) -> u64 {
        self.statistics.failed()
    }
}

/// What a worker learned about one unit
#[derive(Debug)]
enum Outcome {
    Text {
        record: TextPageRecord,
        links: Vec<Url>,
        media: Vec<Url>,
    },
    Media(MediaRecord),
    Ignored(IgnoreReason),
    Failed(FetchError),
}

impl Outcome {
    fn state(&self) -> UnitState {
        match self {
            Self::Text { .. } | Self::Media(_) => UnitState::Classified,
            Self::Ignored(_) => UnitState::Ignored,
            Self::Failed(_) => UnitState::Failed,
        }
    }
}

/// Everything a worker task needs, shared across the pool
struct WorkerContext {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
    classifier: Classifier,
    transforms: Transforms,
    request_delay: Duration,
}

impl WorkerContext {
    /// Fetches and classifies one unit
    async fn process(&self, unit: &CrawlUnit) -> Outcome {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        let resource = match self.fetcher.fetch(&unit.url).await {
            Ok(resource) => resource,
            Err(e) => return Outcome::Failed(e),
        };

        let content_type = resource.content_type().map(str::to_string);
        let parent_url = unit.parent_url.as_ref().map(Url::to_string);

        let classification = match self
            .classifier
            .classify(&unit.url, content_type.as_deref(), &resource.body)
        {
            Classification::TextPage if unit.media_only => {
                Classification::Ignored(IgnoreReason::OffSitePage)
            }
            classification => classification,
        };

        match classification {
            Classification::TextPage => {
                let html = String::from_utf8_lossy(&resource.body).into_owned();
                let page = self.extractor.extract(&html, &resource.final_url);
                let content = self.transforms.simplify(&unit.url, page.text).await;

                Outcome::Text {
                    record: TextPageRecord {
                        url: unit.url.to_string(),
                        parent_url,
                        depth: unit.depth,
                        title: page.title,
                        content,
                    },
                    links: page.links,
                    media: page.media,
                }
            }
            Classification::Media {
                media_type,
                size_bytes,
            } => {
                let content_type =
                    content_type.unwrap_or_else(|| "application/octet-stream".to_string());
                let description = self
                    .transforms
                    .describe(&unit.url, &content_type, &resource.body)
                    .await;

                Outcome::Media(MediaRecord {
                    url: unit.url.to_string(),
                    parent_url,
                    depth: unit.depth,
                    media_type,
                    content_type,
                    size_bytes,
                    description,
                })
            }
            Classification::Ignored(reason) => Outcome::Ignored(reason),
        }
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    settings: CrawlSettings,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
    classifier: Classifier,
    transforms: Transforms,
    history: Box<dyn HistoryStore>,
    rotator: Option<Arc<CircuitRotator>>,
}

impl Coordinator {
    /// Creates a coordinator with the default extractor, classifier and
    /// transforms
    pub fn new(
        settings: CrawlSettings,
        fetcher: Arc<dyn Fetcher>,
        history: Box<dyn HistoryStore>,
    ) -> Self {
        Self {
            settings,
            fetcher,
            extractor: Arc::new(HtmlExtractor),
            classifier: Classifier::new(crate::config::ClassifierConfig::default().min_media_size),
            transforms: Transforms::default(),
            history,
            rotator: None,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn LinkExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_transforms(mut self, transforms: Transforms) -> Self {
        self.transforms = transforms;
        self
    }

    /// Reports rotations made through this rotator in the statistics
    pub fn with_rotator(mut self, rotator: Arc<CircuitRotator>) -> Self {
        self.rotator = Some(rotator);
        self
    }

    pub fn history(&self) -> &dyn HistoryStore {
        self.history.as_ref()
    }

    /// Runs the crawl until the frontier drains or `cancel` fires
    ///
    /// Cancellation stops dispatching new units; fetches already in flight
    /// are finished and recorded before returning the partial result.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - Complete or partial aggregate with statistics
    /// * `Err(UmbraError)` - The history store could not be read or written
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<CrawlReport, UmbraError> {
        let start_time = Instant::now();
        let mut visited = self.history.load()?;
        let mut content = SiteContent::new();
        let mut stats = CrawlStatistics::new();
        stats.history_before = visited.len();
        let rotations_before = self.rotator.as_ref().map_or(0, |r| r.rotations());

        tracing::info!(
            "Starting crawl of {} to depth {} ({} URLs already visited)",
            self.settings.seed,
            self.settings.max_depth,
            visited.len()
        );

        let context = Arc::new(WorkerContext {
            fetcher: self.fetcher.clone(),
            extractor: self.extractor.clone(),
            classifier: self.classifier.clone(),
            transforms: self.transforms.clone(),
            request_delay: self.settings.request_delay,
        });

        let mut frontier = Frontier::new(self.settings.max_depth);
        frontier.push(CrawlUnit::seed(self.settings.seed.clone()));

        let mut tasks: JoinSet<(CrawlUnit, Outcome)> = JoinSet::new();
        let mut dispatched: u64 = 0;
        let mut processed: u64 = 0;

        loop {
            while !cancel.is_cancelled()
                && tasks.len() < self.settings.max_concurrent_fetches
                && !self.page_cap_reached(dispatched)
            {
                let Some(unit) = frontier.pop() else {
                    break;
                };

                if visited.contains(unit.url.as_str()) {
                    tracing::debug!("Skipping already visited {}", unit.url);
                    stats.record(UnitState::Skipped);
                    continue;
                }

                visited.insert(unit.url.to_string());
                dispatched += 1;
                stats.max_depth_reached = stats.max_depth_reached.max(unit.depth);
                tracing::debug!("Fetching {} (depth {})", unit.url, unit.depth);

                let context = context.clone();
                tasks.spawn(async move {
                    let outcome = context.process(&unit).await;
                    (unit, outcome)
                });
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };

            let (unit, outcome) = match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!("Worker task failed: {}", e);
                    continue;
                }
            };

            self.handle_outcome(unit, outcome, &mut frontier, &mut content, &mut stats)?;
            processed += 1;

            if processed % 10 == 0 {
                let rate = processed as f64 / start_time.elapsed().as_secs_f64();
                tracing::info!(
                    "Progress: {} units processed, {} in frontier, {} in flight, {:.2} units/sec",
                    processed,
                    frontier.len(),
                    tasks.len(),
                    rate
                );
            }
        }

        self.history.flush()?;

        stats.enqueued = frontier.enqueued();
        stats.abandoned = frontier.len() as u64;
        stats.cancelled = cancel.is_cancelled();
        stats.history_after = self.history.len();
        stats.circuit_rotations = self
            .rotator
            .as_ref()
            .map_or(0, |r| r.rotations() - rotations_before);
        stats.elapsed = start_time.elapsed();

        if stats.cancelled {
            tracing::warn!(
                "Crawl cancelled: {} units processed, {} left in frontier",
                processed,
                frontier.len()
            );
        } else if self.page_cap_reached(dispatched) && !frontier.is_empty() {
            tracing::info!(
                "Page limit reached: {} units processed, {} left in frontier",
                processed,
                frontier.len()
            );
        } else {
            tracing::info!(
                "Crawl completed: {} units processed in {:?}",
                processed,
                stats.elapsed
            );
        }

        Ok(CrawlReport {
            content,
            statistics: stats,
        })
    }

    fn page_cap_reached(&self, dispatched: u64) -> bool {
        self.settings.max_pages.is_some_and(|max| dispatched >= max)
    }

    /// Applies a worker's outcome: aggregate, frontier, then history
    fn handle_outcome(
        &mut self,
        unit: CrawlUnit,
        outcome: Outcome,
        frontier: &mut Frontier,
        content: &mut SiteContent,
        stats: &mut CrawlStatistics,
    ) -> Result<(), UmbraError> {
        let state = outcome.state();
        debug_assert!(UnitState::Fetching.can_transition_to(state));

        match outcome {
            Outcome::Text {
                record,
                links,
                media,
            } => {
                tracing::debug!(
                    "Text page {}: {} links, {} media sources",
                    unit.url,
                    links.len(),
                    media.len()
                );
                self.enqueue_children(&unit, &links, false, frontier);
                self.enqueue_children(&unit, &media, true, frontier);
                content.push_text(record);
            }
            Outcome::Media(record) => {
                tracing::debug!("Media {} ({} bytes)", record.url, record.size_bytes);
                content.push_media(record);
            }
            Outcome::Ignored(reason) => {
                tracing::debug!("Ignoring {}: {}", unit.url, reason);
            }
            Outcome::Failed(e) => {
                tracing::warn!("Failed to fetch {}: {}", unit.url, e);
                stats.record_failure(e.kind());
            }
        }

        stats.record(state);
        if state.is_recorded() {
            self.history.record(unit.url.as_str())?;
        }
        Ok(())
    }

    /// Queues discovered URLs one level deeper than their parent
    ///
    /// Page links can be restricted to the seed host. Media sources are
    /// followed wherever they are hosted, but an off-site one is only kept
    /// if it really is media.
    fn enqueue_children(
        &self,
        parent: &CrawlUnit,
        urls: &[Url],
        from_media: bool,
        frontier: &mut Frontier,
    ) {
        if parent.depth >= self.settings.max_depth {
            return;
        }

        for url in urls {
            let canonical = match normalize_url(url.as_str()) {
                Ok(canonical) => canonical,
                Err(e) => {
                    tracing::debug!("Failed to normalize URL {}: {}", url, e);
                    continue;
                }
            };

            let off_site = self.settings.same_host_only && !same_host(&canonical, &self.settings.seed);
            if off_site && !from_media {
                tracing::trace!("Not following off-site link {}", canonical);
                continue;
            }

            frontier.push(CrawlUnit {
                url: canonical,
                depth: parent.depth + 1,
                parent_url: Some(parent.url.clone()),
                media_only: off_site,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::FetchedResource;
    use crate::crawler::parser::ExtractedPage;
    use crate::history::FileHistory;
    use async_trait::async_trait;
    use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serves canned responses and remembers what was requested
    #[derive(Default)]
    struct StubFetcher {
        responses: HashMap<String, (&'static str, Vec<u8>)>,
        requests: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        fn page(mut self, url: &str, html: &str) -> Self {
            self.responses
                .insert(url.to_string(), ("text/html", html.as_bytes().to_vec()));
            self
        }

        fn media(mut self, url: &str, content_type: &'static str, size: usize) -> Self {
            self.responses
                .insert(url.to_string(), (content_type, vec![0u8; size]));
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, url: &Url) -> Result<FetchedResource, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            let (content_type, body) = self
                .responses
                .get(url.as_str())
                .cloned()
                .ok_or(FetchError::HttpStatus(404))?;

            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
            Ok(FetchedResource {
                final_url: url.clone(),
                status: 200,
                headers,
                body,
            })
        }
    }

    fn history(dir: &TempDir) -> Box<dyn HistoryStore> {
        Box::new(FileHistory::open(&dir.path().join("history")).unwrap())
    }

    fn settings(max_depth: u32) -> CrawlSettings {
        CrawlSettings::new(Url::parse("http://site.onion/").unwrap(), max_depth)
    }

    #[tokio::test]
    async fn test_depth_bound() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(
            StubFetcher::default()
                .page("http://site.onion/", r#"<a href="/b">B</a><a href="/c">C</a>"#)
                .page("http://site.onion/b", r#"<a href="/d">D</a>"#)
                .page("http://site.onion/c", "<p>leaf</p>")
                .page("http://site.onion/d", "<p>too deep</p>"),
        );

        let mut coordinator = Coordinator::new(settings(1), fetcher.clone(), history(&dir));
        let report = coordinator.run(CancellationToken::new()).await.unwrap();

        assert_eq!(report.content.text_pages.len(), 3);
        assert!(!report.content.contains_url("http://site.onion/d"));
        assert!(!fetcher.requested().contains(&"http://site.onion/d".to_string()));
        assert!(!coordinator.history().contains("http://site.onion/d"));
        assert_eq!(report.statistics.max_depth_reached, 1);
    }

    #[tokio::test]
    async fn test_parent_and_depth_recorded() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(
            StubFetcher::default()
                .page("http://site.onion/", r#"<title>Home</title><a href="/b#top">B</a>"#)
                .page("http://site.onion/b", "<p>child</p>"),
        );

        let mut coordinator = Coordinator::new(settings(2), fetcher, history(&dir));
        let report = coordinator.run(CancellationToken::new()).await.unwrap();

        let pages = &report.content.text_pages;
        assert_eq!(pages[0].url, "http://site.onion/");
        assert_eq!(pages[0].title.as_deref(), Some("Home"));
        assert_eq!(pages[0].parent_url, None);
        assert_eq!(pages[1].url, "http://site.onion/b");
        assert_eq!(pages[1].depth, 1);
        assert_eq!(pages[1].parent_url.as_deref(), Some("http://site.onion/"));
        assert_eq!(pages[1].content, "child");
    }

    #[tokio::test]
    async fn test_media_classified_and_filtered() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(
            StubFetcher::default()
                .page(
                    "http://site.onion/",
                    r#"<img src="/big.png"><img src="/small.png"><img src="http://cdn.onion/far.jpg">"#,
                )
                .media("http://site.onion/big.png", "image/png", 100)
                .media("http://site.onion/small.png", "image/png", 99)
                .media("http://cdn.onion/far.jpg", "image/jpeg", 500),
        );

        let mut coordinator = Coordinator::new(settings(1), fetcher, history(&dir))
            .with_classifier(Classifier::new(100));
        let report = coordinator.run(CancellationToken::new()).await.unwrap();

        let media: Vec<_> = report.content.media.iter().map(|m| m.url.as_str()).collect();
        assert_eq!(media.len(), 2);
        assert!(media.contains(&"http://site.onion/big.png"));
        assert!(media.contains(&"http://cdn.onion/far.jpg"));
        assert_eq!(report.statistics.count(UnitState::Ignored), 1);
        assert!(coordinator.history().contains("http://site.onion/small.png"));
    }

    #[tokio::test]
    async fn test_off_site_links_not_followed() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(
            StubFetcher::default()
                .page("http://site.onion/", r#"<a href="http://other.onion/">elsewhere</a>"#)
                .page("http://other.onion/", "<p>other</p>"),
        );

        let mut coordinator = Coordinator::new(settings(2), fetcher.clone(), history(&dir));
        coordinator.run(CancellationToken::new()).await.unwrap();

        assert_eq!(fetcher.requested(), vec!["http://site.onion/".to_string()]);
    }

    #[tokio::test]
    async fn test_off_site_iframe_page_not_retained() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(
            StubFetcher::default()
                .page(
                    "http://site.onion/",
                    r#"<iframe src="http://other.onion/tracker"></iframe><iframe src="/embed"></iframe>"#,
                )
                .page(
                    "http://other.onion/tracker",
                    r#"<a href="http://other.onion/more">more</a><img src="http://third.onion/x.png">"#,
                )
                .page("http://site.onion/embed", "<p>same host</p>")
                .media("http://third.onion/x.png", "image/png", 500),
        );

        let mut coordinator = Coordinator::new(settings(2), fetcher.clone(), history(&dir))
            .with_classifier(Classifier::new(100));
        let report = coordinator.run(CancellationToken::new()).await.unwrap();

        assert!(!report.content.contains_url("http://other.onion/tracker"));
        assert!(report.content.contains_url("http://site.onion/embed"));
        assert_eq!(report.content.text_pages.len(), 2);

        // Nothing embedded in the off-site page is followed
        let requested = fetcher.requested();
        assert!(!requested.contains(&"http://other.onion/more".to_string()));
        assert!(!requested.contains(&"http://third.onion/x.png".to_string()));

        assert_eq!(report.statistics.count(UnitState::Ignored), 1);
        assert!(coordinator.history().contains("http://other.onion/tracker"));
    }

    #[tokio::test]
    async fn test_off_site_iframe_followed_when_unrestricted() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(
            StubFetcher::default()
                .page("http://site.onion/", r#"<iframe src="http://other.onion/embed"></iframe>"#)
                .page("http://other.onion/embed", "<p>other</p>"),
        );

        let mut settings = settings(1);
        settings.same_host_only = false;
        let mut coordinator = Coordinator::new(settings, fetcher, history(&dir));
        let report = coordinator.run(CancellationToken::new()).await.unwrap();

        assert!(report.content.contains_url("http://other.onion/embed"));
    }

    #[tokio::test]
    async fn test_failed_fetch_recorded_and_crawl_continues() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(
            StubFetcher::default()
                .page("http://site.onion/", r#"<a href="/gone">x</a><a href="/ok">y</a>"#)
                .page("http://site.onion/ok", "<p>ok</p>"),
        );

        let mut coordinator = Coordinator::new(settings(1), fetcher, history(&dir));
        let report = coordinator.run(CancellationToken::new()).await.unwrap();

        assert_eq!(report.failed(), 1);
        assert_eq!(report.statistics.failures_by_kind["http"], 1);
        assert!(!report.content.contains_url("http://site.onion/gone"));
        assert!(report.content.contains_url("http://site.onion/ok"));
        assert!(coordinator.history().contains("http://site.onion/gone"));
    }

    /// Ignores the markup and reports a fixed set of links
    struct FixedExtractor(Vec<&'static str>);

    impl LinkExtractor for FixedExtractor {
        fn extract(&self, _html: &str, _base_url: &Url) -> ExtractedPage {
            ExtractedPage {
                links: self.0.iter().map(|l| Url::parse(l).unwrap()).collect(),
                text: "fixed".to_string(),
                ..ExtractedPage::default()
            }
        }
    }

    #[tokio::test]
    async fn test_custom_extractor() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(
            StubFetcher::default()
                .page("http://site.onion/", "<p>opaque</p>")
                .page("http://site.onion/hidden", "<p>found</p>"),
        );

        let mut coordinator = Coordinator::new(settings(1), fetcher.clone(), history(&dir))
            .with_extractor(Arc::new(FixedExtractor(vec!["http://site.onion/hidden/"])));
        let report = coordinator.run(CancellationToken::new()).await.unwrap();

        assert_eq!(
            fetcher.requested(),
            vec!["http://site.onion/".to_string(), "http://site.onion/hidden".to_string()]
        );
        assert!(report.content.text_pages.iter().all(|p| p.content == "fixed"));
    }

    #[tokio::test]
    async fn test_max_pages_cap() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(
            StubFetcher::default()
                .page("http://site.onion/", r#"<a href="/1">1</a><a href="/2">2</a><a href="/3">3</a>"#)
                .page("http://site.onion/1", "")
                .page("http://site.onion/2", "")
                .page("http://site.onion/3", ""),
        );

        let mut limited = settings(1);
        limited.max_pages = Some(2);
        let mut coordinator = Coordinator::new(limited, fetcher.clone(), history(&dir));
        let report = coordinator.run(CancellationToken::new()).await.unwrap();

        assert_eq!(fetcher.requested().len(), 2);
        assert_eq!(report.statistics.abandoned, 2);
    }
}
