use crate::enrich::{DEFAULT_LANGUAGES, Enricher, NoopEnricher, count_language_mentions};
use crate::error::{Result, ScanError};
use crate::extract::{HtmlLinkExtractor, LinkExtractor};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::frontier::Frontier;
use crate::normalize::{UrlNormalizer, normalize_seed};
use crate::result::{CrawlRecord, CrawlStatus, PageMetadata};
use crate::store::CrawlStore;
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

/// Called with `(tasks in flight, url)` each time a URL is submitted.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;
/// Called with each record as its task completes.
pub type ResultCallback = Arc<dyn Fn(CrawlRecord) + Send + Sync>;

pub const DEFAULT_LIMIT: usize = 50;
pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// What a worker hands back to the control loop.
struct TaskOutcome {
    url: Url,
    result: Result<PageOutcome>,
}

struct PageOutcome {
    final_url: Url,
    status_code: u16,
    content_type: Option<String>,
    response_time: Duration,
    links: Vec<String>,
    metadata: PageMetadata,
}

/// Everything a worker needs, shared across all tasks of one crawl.
struct TaskContext {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
    enricher: Arc<dyn Enricher>,
    languages: Arc<Vec<String>>,
    permits: Arc<Semaphore>,
}

/// Same-host crawler.
///
/// Workers only fetch and parse. Discovery, normalization, admission and
/// submission all happen in the single control loop inside [`Crawler::crawl`],
/// which consumes completions as they arrive.
pub struct Crawler {
    fetcher: Option<Arc<dyn Fetcher>>,
    extractor: Arc<dyn LinkExtractor>,
    enricher: Arc<dyn Enricher>,
    normalizer: Arc<UrlNormalizer>,
    languages: Arc<Vec<String>>,
    limit: usize,
    workers: usize,
    timeout_secs: u64,
    deadline: Option<Duration>,
    progress_callback: Option<ProgressCallback>,
    result_callback: Option<ResultCallback>,
}

impl Crawler {
    pub fn new() -> Self {
        Self {
            fetcher: None,
            extractor: Arc::new(HtmlLinkExtractor),
            enricher: Arc::new(NoopEnricher),
            normalizer: Arc::new(UrlNormalizer::default()),
            languages: Arc::new(DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect()),
            limit: DEFAULT_LIMIT,
            workers: DEFAULT_WORKERS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            deadline: None,
            progress_callback: None,
            result_callback: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Per-request timeout for the default HTTP fetcher.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Stop admitting and abandon outstanding tasks once `deadline` has
    /// passed since the crawl started.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn LinkExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enricher = enricher;
        self
    }

    pub fn with_normalizer(mut self, normalizer: UrlNormalizer) -> Self {
        self.normalizer = Arc::new(normalizer);
        self
    }

    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        self.languages = Arc::new(languages);
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_result_callback(mut self, callback: ResultCallback) -> Self {
        self.result_callback = Some(callback);
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Crawl from `seed`, returning one record per admitted URL.
    ///
    /// Fails only at startup: a bad seed, `limit < 1`, zero workers, or an
    /// HTTP client that cannot be built. Page-level failures end up as
    /// `Failed` records.
    pub async fn crawl(&self, seed: &str) -> Result<CrawlStore> {
        let seed = normalize_seed(seed)?;

        if self.workers == 0 {
            return Err(ScanError::InvalidConfig(
                "worker pool needs at least one worker".to_string(),
            ));
        }
        if self.workers > Semaphore::MAX_PERMITS {
            return Err(ScanError::InvalidConfig(format!(
                "worker pool is capped at {} workers",
                Semaphore::MAX_PERMITS
            )));
        }

        let fetcher: Arc<dyn Fetcher> = match &self.fetcher {
            Some(fetcher) => fetcher.clone(),
            None => Arc::new(HttpFetcher::new(self.timeout_secs)?),
        };

        let frontier = Frontier::new(self.limit);
        if !frontier.try_admit(&seed) {
            return Err(ScanError::SeedRejected(format!(
                "{} not admitted with limit {}",
                seed, self.limit
            )));
        }

        let seed_str = seed.to_string();
        info!(
            "Starting crawl of {} (limit {}, {} workers)",
            seed_str, self.limit, self.workers
        );

        let ctx = Arc::new(TaskContext {
            fetcher,
            extractor: self.extractor.clone(),
            enricher: self.enricher.clone(),
            languages: self.languages.clone(),
            permits: Arc::new(Semaphore::new(self.workers)),
        });

        let mut store = CrawlStore::new();
        let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();

        store.insert(CrawlRecord::new(seed_str.clone(), None));
        self.submit(&mut tasks, &ctx, seed);

        let deadline = self
            .deadline
            .map(|d| tokio::time::Instant::now() + d);

        loop {
            let joined = match deadline {
                Some(at) => {
                    tokio::select! {
                        joined = tasks.join_next() => joined,
                        _ = tokio::time::sleep_until(at) => {
                            warn!(
                                "Crawl deadline reached with {} task(s) outstanding",
                                tasks.len()
                            );
                            tasks.abort_all();
                            Self::fail_pending(&mut store, &ScanError::DeadlineExceeded);
                            break;
                        }
                    }
                }
                None => tasks.join_next().await,
            };

            // An empty set means nothing is outstanding and nothing new was
            // admitted, so the crawl is done.
            let Some(joined) = joined else {
                break;
            };

            match joined {
                Ok(outcome) => self.complete(outcome, &frontier, &mut store, &mut tasks, &ctx),
                Err(e) => warn!("Crawl task did not finish: {}", e),
            }
        }

        Self::fail_pending(
            &mut store,
            &ScanError::Other("task did not complete".to_string()),
        );

        info!("Crawl of {} complete. {} page(s) recorded", seed_str, store.len());

        Ok(store)
    }

    fn submit(&self, tasks: &mut JoinSet<TaskOutcome>, ctx: &Arc<TaskContext>, url: Url) {
        debug!("Submitting {}", url);
        let ctx = ctx.clone();
        let url_str = url.to_string();
        tasks.spawn(Self::run_task(ctx, url));

        if let Some(ref callback) = self.progress_callback {
            callback(tasks.len(), url_str);
        }
    }

    /// Record a finished task, then admit and submit whatever it discovered.
    fn complete(
        &self,
        outcome: TaskOutcome,
        frontier: &Frontier,
        store: &mut CrawlStore,
        tasks: &mut JoinSet<TaskOutcome>,
        ctx: &Arc<TaskContext>,
    ) {
        let TaskOutcome { url, result } = outcome;
        let parent = url.to_string();

        let Some(record) = store.get_mut(&parent) else {
            warn!("Completed task for unknown URL {}", parent);
            return;
        };

        let discovered = match result {
            Ok(page) => {
                record.finished_at = Some(Utc::now());
                record.response_time = page.response_time;
                record.status = CrawlStatus::Success;
                record.status_code = Some(page.status_code);
                record.content_type = page.content_type;
                record.links_found = page.links.len();
                record.metadata = page.metadata;
                Some((page.final_url, page.links))
            }
            Err(e) => {
                warn!("Crawl error for {}: {}", parent, e);
                if let ScanError::HttpStatus { status, .. } = &e {
                    record.status_code = Some(*status);
                }
                record.mark_failed(e.to_string());
                None
            }
        };

        if let Some(ref callback) = self.result_callback {
            callback(record.clone());
        }

        let Some((base, links)) = discovered else {
            return;
        };

        // A redirected page is also reachable under its final address.
        if base.as_str() != parent {
            let mut alias = base.clone();
            alias.set_fragment(None);
            if frontier.add_alias(&alias) {
                debug!("{} redirected to {}", parent, alias);
            }
        }

        for link in links {
            if frontier.at_capacity() {
                debug!("Limit of {} reached, ignoring further links", frontier.limit());
                break;
            }

            let Some(next) = self.normalizer.normalize(&link, &base) else {
                continue;
            };

            if !frontier.try_admit(&next) {
                continue;
            }

            store.insert(CrawlRecord::new(next.to_string(), Some(parent.clone())));
            self.submit(tasks, ctx, next);
        }
    }

    fn fail_pending(store: &mut CrawlStore, reason: &ScanError) {
        let pending: Vec<String> = store
            .records()
            .filter(|r| r.status == CrawlStatus::Pending)
            .map(|r| r.url.clone())
            .collect();

        for url in pending {
            if let Some(record) = store.get_mut(&url) {
                record.mark_failed(reason.to_string());
            }
        }
    }

    /// Worker body. Panics are caught so the control loop always learns
    /// which URL finished.
    async fn run_task(ctx: Arc<TaskContext>, url: Url) -> TaskOutcome {
        let result = AssertUnwindSafe(async {
            let _permit = ctx
                .permits
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| ScanError::Other(format!("worker pool closed: {}", e)))?;
            Self::fetch_and_parse(&ctx, &url).await
        })
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(ScanError::TaskPanicked(panic_message(panic))));

        TaskOutcome { url, result }
    }

    async fn fetch_and_parse(ctx: &TaskContext, url: &Url) -> Result<PageOutcome> {
        let page = ctx.fetcher.fetch(url).await?;

        let links = if page.is_html() {
            ctx.extractor.extract(&page.body)?
        } else {
            Vec::new()
        };

        let mut metadata = ctx.enricher.enrich(url).await;
        metadata.languages = count_language_mentions(&page.body, ctx.languages.as_slice());

        Ok(PageOutcome {
            final_url: page.final_url,
            status_code: page.status_code,
            content_type: page.content_type,
            response_time: page.response_time,
            links,
            metadata,
        })
    }
}

impl Default for Crawler {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
