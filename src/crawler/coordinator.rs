//! Harvest coordinator - main run orchestration logic
//!
//! This module wires the configured collaborators into one run:
//! - Validating the configuration and building the work list
//! - Building the proxy provider, session manager, resolver and fetcher
//! - Driving the worker pool over the item processor
//! - Feeding results to the aggregator and every sink
//! - Emitting the run statistics

use crate::config::{validate, Config};
use crate::crawler::fetcher::{HttpFetcher, PageFetcher};
use crate::crawler::parser::EntitySelector;
use crate::crawler::processor::ItemProcessor;
use crate::crawler::scheduler::{PolitenessDelay, Scheduler, WorkItem, WorkQueue};
use crate::output::{sinks_from_config, ExtractionResult, ResultSink, RunAggregator, RunStats};
use crate::session::{provider_from_config, SessionManager};
use crate::url::{Canonicalizer, PassthroughResolver, UrlResolver};
use crate::HarvestError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    /// One result per input URL, in input order
    pub results: Vec<ExtractionResult>,

    pub stats: RunStats,

    /// Sink writes that failed and were skipped
    pub sink_errors: u64,

    /// Input entries rejected as invalid URLs; these have no result
    pub rejected_urls: u64,
}

/// Main harvest coordinator structure
pub struct Coordinator {
    urls: Vec<String>,
    processor: Arc<ItemProcessor>,
    scheduler: Scheduler,
    sinks: Vec<Arc<dyn ResultSink>>,
    rejected_urls: u64,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Fails before any request is made if the configuration is invalid or
    /// leaves no usable input URL.
    ///
    /// # Arguments
    ///
    /// * `config` - The harvest configuration
    /// * `config_hash` - Recorded with the run in the database sink
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - Failed to initialize
    pub fn new(config: Config, config_hash: &str) -> Result<Self, HarvestError> {
        validate(&config)?;
        let urls = config.work_urls()?;
        let rejected_urls = config.input_urls().len().saturating_sub(urls.len()) as u64;
        if rejected_urls > 0 {
            tracing::warn!("{} input URLs rejected as invalid", rejected_urls);
        }

        let resolver: Arc<dyn UrlResolver> = if config.scraper.resolve_redirects {
            Arc::new(Canonicalizer::new(config.scraper.resolve_timeout())?)
        } else {
            Arc::new(PassthroughResolver)
        };
        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(config.scraper.timeout()));
        let sinks = sinks_from_config(&config.output, config_hash)?;

        let mut coordinator = Self::with_parts(config, urls, resolver, fetcher, sinks)?;
        coordinator.rejected_urls = rejected_urls;
        Ok(coordinator)
    }

    /// Creates a coordinator around caller-supplied resolver and fetcher
    ///
    /// The work list is taken as given; no validation of `urls` happens here.
    pub fn with_parts(
        config: Config,
        urls: Vec<String>,
        resolver: Arc<dyn UrlResolver>,
        fetcher: Arc<dyn PageFetcher>,
        sinks: Vec<Arc<dyn ResultSink>>,
    ) -> Result<Self, HarvestError> {
        let provider = provider_from_config(&config.proxy)?;
        let sessions = Arc::new(SessionManager::new(provider, config.scraper.session_pages));
        let selector = EntitySelector::new(config.extraction.target_types.iter().cloned());

        let scheduler = Scheduler::new(
            config.scraper.concurrency,
            PolitenessDelay::new(config.scraper.delay_ms_min, config.scraper.delay_ms_max),
        );

        Ok(Self {
            urls,
            processor: Arc::new(ItemProcessor::new(resolver, sessions, fetcher, selector)),
            scheduler,
            sinks,
            rejected_urls: 0,
        })
    }

    /// Adds a sink that receives every result and the run statistics
    pub fn add_sink(&mut self, sink: Arc<dyn ResultSink>) {
        self.sinks.push(sink);
    }

    /// The validated input URLs, in processing order
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        self.processor.sessions()
    }

    /// Runs the harvest to completion
    ///
    /// Per-item failures never abort the run; they are recorded in the
    /// item's result. Sink write failures are logged and counted.
    pub async fn run(&self) -> Result<RunReport, HarvestError> {
        let queue = Arc::new(WorkQueue::new(self.urls.iter().cloned()));
        let aggregator = Arc::new(RunAggregator::start(queue.len()));
        let sink_errors = Arc::new(AtomicU64::new(0));

        tracing::info!(
            "Harvesting {} URLs with {} workers",
            queue.len(),
            self.scheduler.concurrency()
        );

        let handler = {
            let processor = Arc::clone(&self.processor);
            let aggregator = Arc::clone(&aggregator);
            let sinks = Arc::new(self.sinks.clone());
            let sink_errors = Arc::clone(&sink_errors);

            move |item: WorkItem| {
                let processor = Arc::clone(&processor);
                let aggregator = Arc::clone(&aggregator);
                let sinks = Arc::clone(&sinks);
                let sink_errors = Arc::clone(&sink_errors);

                async move {
                    let result = processor.process(&item).await;
                    aggregator.record(result.is_success());

                    for sink in sinks.iter() {
                        if let Err(e) = sink.record_result(&result) {
                            tracing::error!("Failed to record {}: {}", result.original_url, e);
                            sink_errors.fetch_add(1, Ordering::Relaxed);
                        }
                    }

                    result
                }
            }
        };

        let results = match self.scheduler.run(queue, handler).await {
            Ok(results) => results,
            Err(e) => {
                for sink in &self.sinks {
                    if let Err(abort_error) = sink.abort() {
                        tracing::error!("Failed to abort sink: {}", abort_error);
                    }
                }
                return Err(e);
            }
        };

        let stats = aggregator.finish();

        for sink in &self.sinks {
            if let Err(e) = sink.record_stats(&stats).and_then(|_| sink.finalize()) {
                tracing::error!("Failed to record run statistics: {}", e);
                sink_errors.fetch_add(1, Ordering::Relaxed);
            }
        }

        let sink_errors = sink_errors.load(Ordering::SeqCst);
        if sink_errors > 0 {
            tracing::warn!("{} sink writes failed", sink_errors);
        }

        tracing::info!(
            "Run finished: {} succeeded, {} failed, {} sessions used, {:.2}s",
            stats.successes,
            stats.failures,
            self.sessions().session_count(),
            stats.duration_seconds
        );
        if self.rejected_urls > 0 {
            tracing::warn!(
                "{} of {} input URLs were rejected before the run and have no result",
                self.rejected_urls,
                stats.total_urls + self.rejected_urls
            );
        }

        Ok(RunReport {
            results,
            stats,
            sink_errors,
            rejected_urls: self.rejected_urls,
        })
    }
}

/// Runs a complete harvest
///
/// This is the main entry point. It will:
/// 1. Validate the configuration and build the work list
/// 2. Open the configured sinks
/// 3. Process every URL with the worker pool
/// 4. Record the run statistics
///
/// # Arguments
///
/// * `config` - The harvest configuration
/// * `config_hash` - Hash recorded with the run
///
/// # Returns
///
/// * `Ok(RunReport)` - Harvest completed
/// * `Err(HarvestError)` - Harvest could not start or a worker died
///
/// # Example
///
/// ```no_run
/// use ld_harvest::config::load_config_with_hash;
/// use ld_harvest::crawler::run_harvest;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("harvest.toml"))?;
/// let report = run_harvest(config, &hash).await?;
/// println!("{} entities", report.stats.successes);
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(config: Config, config_hash: &str) -> Result<RunReport, HarvestError> {
    let coordinator = Coordinator::new(config, config_hash)?;
    coordinator.run().await
}
