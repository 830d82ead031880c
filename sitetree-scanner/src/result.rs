use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlStatus {
    Pending,
    Success,
    Failed,
}

impl CrawlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlStatus::Pending => "pending",
            CrawlStatus::Success => "success",
            CrawlStatus::Failed => "failed",
        }
    }
}

/// Enrichment attached to a page once its task finishes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub ip_address: Option<String>,
    pub region: Option<String>,
    pub languages: BTreeMap<String, usize>,
}

impl PageMetadata {
    /// Language counts as a JSON object, e.g. `{"rust": 2}`.
    pub fn languages_json(&self) -> String {
        serde_json::to_string(&self.languages).unwrap_or_else(|_| "{}".to_string())
    }
}

/// One record per admitted URL.
///
/// `parent` and `started_at` are fixed at admission. Everything else is
/// filled in when the URL's task completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlRecord {
    pub url: String,
    pub parent: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub response_time: Duration,
    pub status: CrawlStatus,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub links_found: usize,
    pub metadata: PageMetadata,
    pub error: Option<String>,
}

impl CrawlRecord {
    pub fn new(url: String, parent: Option<String>) -> Self {
        Self {
            url,
            parent,
            started_at: Utc::now(),
            finished_at: None,
            response_time: Duration::from_secs(0),
            status: CrawlStatus::Pending,
            status_code: None,
            content_type: None,
            links_found: 0,
            metadata: PageMetadata::default(),
            error: None,
        }
    }

    pub fn mark_failed(&mut self, error: String) {
        self.finished_at = Some(Utc::now());
        self.status = CrawlStatus::Failed;
        self.error = Some(error);
    }

    pub fn is_seed(&self) -> bool {
        self.parent.is_none()
    }

    /// Wall-clock time from admission to completion, if completed.
    pub fn elapsed(&self) -> Option<Duration> {
        self.finished_at
            .and_then(|end| (end - self.started_at).to_std().ok())
    }
}
