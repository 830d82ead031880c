use indicatif::{ProgressBar, ProgressStyle};
use sitetree_scanner::{CrawlStore, Crawler, Enricher, GeoEnricher, NoopEnricher};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub urls: Vec<String>,
    /// Page limit, applied to each seed separately
    pub limit: usize,
    pub threads: usize,
    pub timeout_secs: u64,
    /// Resolve IP and region for every page
    pub enrich: bool,
    pub show_progress: bool,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            limit: sitetree_scanner::crawler::DEFAULT_LIMIT,
            threads: sitetree_scanner::crawler::DEFAULT_WORKERS,
            timeout_secs: sitetree_scanner::crawler::DEFAULT_TIMEOUT_SECS,
            enrich: true,
            show_progress: false,
        }
    }
}

/// The result of crawling one seed.
#[derive(Debug, Clone)]
pub struct SeedCrawl {
    /// Seed in canonical form; the root of `store`'s tree.
    pub seed: String,
    pub store: CrawlStore,
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Crawl every seed in turn, each with its own frontier and limit.
///
/// A seed that cannot be crawled is reported through `progress_callback`
/// and skipped. Errors only if no seed produced a crawl.
pub async fn execute_crawl(
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<Vec<SeedCrawl>, String> {
    let CrawlOptions {
        urls,
        limit,
        threads,
        timeout_secs,
        enrich,
        show_progress,
    } = options;

    if urls.is_empty() {
        return Err("No seed URLs given".to_string());
    }

    let progress_bar = if show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting crawl...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let processed_count = Arc::new(AtomicUsize::new(0));

    let enricher: Arc<dyn Enricher> = if enrich {
        Arc::new(GeoEnricher::new())
    } else {
        Arc::new(NoopEnricher)
    };

    let mut crawler = Crawler::new()
        .with_limit(limit)
        .with_workers(threads)
        .with_timeout(timeout_secs)
        .with_enricher(enricher);

    if let Some(ref pb) = progress_bar {
        let pb_clone = pb.clone();
        let count_clone = processed_count.clone();
        crawler = crawler.with_result_callback(Arc::new(move |record| {
            let count = count_clone.fetch_add(1, Ordering::Relaxed) + 1;
            pb_clone.set_message(format!(
                "Crawling... {} URLs processed ({})",
                count,
                extract_url_path(&record.url)
            ));
        }));
    }

    let mut crawls = Vec::new();
    for (idx, url_str) in urls.iter().enumerate() {
        if let Some(ref callback) = progress_callback
            && urls.len() > 1
        {
            let message = format!("Crawling host {}/{}: {}", idx + 1, urls.len(), url_str);
            match progress_bar {
                Some(ref pb) => pb.suspend(|| callback(message)),
                None => callback(message),
            }
        }

        match crawler.crawl(url_str).await {
            Ok(store) => {
                let seed = store
                    .roots()
                    .next()
                    .map(|r| r.url.clone())
                    .unwrap_or_else(|| url_str.clone());
                crawls.push(SeedCrawl { seed, store });
            }
            Err(e) => {
                warn!("Failed to crawl {}: {}", url_str, e);
                if let Some(ref callback) = progress_callback {
                    let message = format!("[!]  Failed to crawl {}: {}", url_str, e);
                    match progress_bar {
                        Some(ref pb) => pb.suspend(|| callback(message)),
                        None => callback(message),
                    }
                }
            }
        }
    }

    if let Some(ref pb) = progress_bar {
        let total = processed_count.load(Ordering::Relaxed);
        pb.finish_with_message(format!("Crawl complete! {} URLs processed", total));
    }

    if crawls.is_empty() {
        return Err("No seed could be crawled".to_string());
    }

    Ok(crawls)
}
