pub mod commands;
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{load_urls_from_file, load_urls_from_source, parse_url_line};

// Re-export crawl functionality from sitetree-core
pub use sitetree_core::crawl::{CrawlOptions, CrawlProgressCallback, execute_crawl, extract_url_path};
