use anyhow::{Context, Result, bail, ensure};
use clap::ArgMatches;
use colored::Colorize;
use sitetree_core::crawl::SeedCrawl;
use sitetree_core::report::{
    ReportFormat, format_all_rows, generate_csv_report, generate_json_report,
    generate_text_report, save_report,
};
use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

// Re-export crawl types and functions from sitetree-core
pub use sitetree_core::crawl::{
    CrawlOptions, CrawlProgressCallback, execute_crawl, extract_url_path,
};

/// Install the stderr log subscriber. `RUST_LOG` wins over the flags.
pub fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "info"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Already installed when called more than once, e.g. from tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

// Helper functions for crawl handler

/// Load URLs from either a file or the `--url` arguments
pub fn load_urls_from_source(urls: &[Url], hosts_file: Option<&PathBuf>) -> Result<Vec<String>> {
    if let Some(hosts_file_path) = hosts_file {
        load_urls_from_file(hosts_file_path)
    } else if !urls.is_empty() {
        Ok(urls.iter().map(|u| u.as_str().to_string()).collect())
    } else {
        bail!("Either --url or --hosts-file must be provided")
    }
}

/// Load and parse URLs from a file. Blank lines and `#` comments are skipped.
pub fn load_urls_from_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read hosts file {}", path.display()))?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_url_line)
        .collect();

    ensure!(!urls.is_empty(), "No valid URLs found in {}", path.display());

    Ok(urls)
}

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    if let Ok(url) = Url::parse(line)
        && url.has_host()
    {
        return Some(line.to_string());
    }

    let with_scheme = format!("http://{}", line);
    if Url::parse(&with_scheme).is_ok() {
        return Some(with_scheme);
    }

    warn!("Skipping invalid URL '{}'", line);
    None
}

/// Render the report that goes to the `--output` file.
pub fn render_report(crawls: &[SeedCrawl], format: ReportFormat) -> Result<String> {
    let content = match format {
        ReportFormat::Text => generate_text_report(&format_all_rows(crawls), false),
        ReportFormat::Csv => generate_csv_report(&format_all_rows(crawls))
            .context("Failed to generate CSV report")?,
        ReportFormat::Json => {
            generate_json_report(crawls).context("Failed to generate JSON report")?
        }
    };
    Ok(content)
}

fn options_from_args(args: &ArgMatches, quiet: bool) -> Result<CrawlOptions> {
    let urls: Vec<Url> = args
        .get_many::<Url>("url")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let hosts_file = args.get_one::<PathBuf>("hosts-file");

    let threads = args.get_one::<usize>("threads").copied().unwrap_or(10);
    ensure!(threads > 0, "--threads must be at least 1");

    Ok(CrawlOptions {
        urls: load_urls_from_source(&urls, hosts_file)?,
        limit: args.get_one::<usize>("limit").copied().unwrap_or(50),
        threads,
        timeout_secs: args.get_one::<u64>("timeout").copied().unwrap_or(10),
        enrich: !args.get_flag("no-enrich"),
        show_progress: !quiet && std::io::stderr().is_terminal(),
    })
}

pub async fn handle_crawl(args: &ArgMatches, quiet: bool) -> Result<()> {
    let options = options_from_args(args, quiet)?;
    let output = args.get_one::<PathBuf>("output");
    let format = args
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Csv);

    if !quiet {
        eprintln!(
            "{} Crawling {} seed(s), limit {} per seed, {} workers",
            "→".blue(),
            options.urls.len(),
            options.limit,
            options.threads
        );
    }

    let progress_callback: Option<CrawlProgressCallback> = if quiet {
        None
    } else {
        Some(Arc::new(|msg: String| eprintln!("{}", msg)))
    };

    let crawls = execute_crawl(options, progress_callback)
        .await
        .map_err(anyhow::Error::msg)?;

    let rows = format_all_rows(&crawls);
    print!(
        "{}",
        generate_text_report(&rows, std::io::stdout().is_terminal())
    );

    if let Some(output_path) = output {
        let expanded = shellexpand::tilde(&output_path.to_string_lossy()).into_owned();
        let path = PathBuf::from(expanded);
        let content = render_report(&crawls, format)?;
        save_report(&content, &path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;

        info!("Report written to {}", path.display());
        if !quiet {
            eprintln!("{} Report saved to {}", "✓".green().bold(), path.display());
        }
    }

    Ok(())
}
