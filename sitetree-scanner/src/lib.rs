pub mod crawler;
pub mod enrich;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod frontier;
pub mod normalize;
pub mod result;
pub mod store;

pub use crawler::{Crawler, ProgressCallback, ResultCallback};
pub use enrich::{Enricher, GeoEnricher, NoopEnricher};
pub use error::ScanError;
pub use extract::{HtmlLinkExtractor, LinkExtractor};
pub use fetch::{FetchedPage, Fetcher, HttpFetcher};
pub use frontier::Frontier;
pub use normalize::UrlNormalizer;
pub use result::{CrawlRecord, CrawlStatus, PageMetadata};
pub use store::{CrawlStore, TreeEntry};
