// Report generation from crawl results

use crate::crawl::SeedCrawl;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use sitetree_scanner::{CrawlRecord, CrawlStatus, CrawlStore};
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Csv,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "csv" => Some(ReportFormat::Csv),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

pub const REPORT_HEADER: [&str; 6] = [
    "URL",
    "DURATION",
    "STATUS",
    "IP_ADDRESS",
    "GEOLOCATION",
    "LANGUAGES",
];

/// One line of the crawl tree, already formatted for output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// URL prefixed with `--` per level below the root
    pub url: String,
    pub duration: String,
    pub status: String,
    pub ip_address: String,
    pub geolocation: String,
    pub languages: String,
    #[serde(skip)]
    pub succeeded: bool,
}

impl ReportRow {
    pub fn from_record(record: &CrawlRecord, depth: usize) -> Self {
        let url = if depth == 0 {
            record.url.clone()
        } else {
            format!("{} {}", "--".repeat(depth), record.url)
        };

        let duration = match record.status {
            CrawlStatus::Success => record.response_time,
            _ => record.elapsed().unwrap_or_default(),
        };

        Self {
            url,
            duration: format!("{:.2}s", duration.as_secs_f64()),
            status: status_label(record),
            ip_address: record.metadata.ip_address.clone().unwrap_or_default(),
            geolocation: record.metadata.region.clone().unwrap_or_default(),
            languages: record.metadata.languages_json(),
            succeeded: record.status == CrawlStatus::Success,
        }
    }

    fn cells(&self) -> [&str; 6] {
        [
            &self.url,
            &self.duration,
            &self.status,
            &self.ip_address,
            &self.geolocation,
            &self.languages,
        ]
    }
}

fn status_label(record: &CrawlRecord) -> String {
    match (record.status, record.status_code) {
        (CrawlStatus::Success, Some(code)) => code.to_string(),
        (CrawlStatus::Success, None) => "ok".to_string(),
        (CrawlStatus::Failed, Some(code)) => format!("failed ({})", code),
        (CrawlStatus::Failed, None) => "failed".to_string(),
        (CrawlStatus::Pending, _) => "pending".to_string(),
    }
}

/// Rows for the tree rooted at `root`, parents before their children.
/// Records that do not descend from `root` are left out.
pub fn format_rows(store: &CrawlStore, root: &str) -> Vec<ReportRow> {
    store
        .as_tree(root)
        .into_iter()
        .map(|entry| ReportRow::from_record(entry.record, entry.depth))
        .collect()
}

/// Rows for every seed, one tree after another.
pub fn format_all_rows(crawls: &[SeedCrawl]) -> Vec<ReportRow> {
    crawls
        .iter()
        .flat_map(|c| format_rows(&c.store, &c.seed))
        .collect()
}

/// Column-aligned table with a total line on top.
pub fn generate_text_report(rows: &[ReportRow], color: bool) -> String {
    let mut widths = REPORT_HEADER.map(str::len);
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row.cells()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut report = String::new();
    report.push_str(&format!("Total crawled urls: {}\n", rows.len()));

    let header: Vec<String> = REPORT_HEADER
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = width))
        .collect();
    let header = header.join(" ");
    if color {
        report.push_str(&header.bold().to_string());
    } else {
        report.push_str(&header);
    }
    report.push('\n');

    for row in rows {
        let cells: Vec<String> = row
            .cells()
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(i, (cell, width))| {
                let padded = format!("{:<width$}", cell, width = width);
                // Pad before coloring so escape codes do not skew alignment.
                if color && i == 2 {
                    if row.succeeded {
                        padded.green().to_string()
                    } else {
                        padded.red().to_string()
                    }
                } else {
                    padded
                }
            })
            .collect();
        report.push_str(cells.join(" ").trim_end());
        report.push('\n');
    }

    report
}

pub fn generate_csv_report(rows: &[ReportRow]) -> csv::Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(REPORT_HEADER)?;
    for row in rows {
        writer.write_record(row.cells())?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn generate_json_report(crawls: &[SeedCrawl]) -> Result<String, serde_json::Error> {
    let seeds: Vec<serde_json::Value> = crawls
        .iter()
        .map(|c| {
            let succeeded = c
                .store
                .records()
                .filter(|r| r.status == CrawlStatus::Success)
                .count();
            serde_json::json!({
                "seed": c.seed,
                "pages": c.store.len(),
                "succeeded": succeeded,
                "failed": c.store.len() - succeeded,
                "records": c.store.records().collect::<Vec<_>>(),
            })
        })
        .collect();

    let json_report = serde_json::json!({
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "seeds": seeds,
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
