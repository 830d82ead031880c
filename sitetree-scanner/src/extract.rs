use crate::error::Result;
use scraper::{Html, Selector};
use std::sync::LazyLock;

/// Pulls raw link references out of a document. No ordering is implied.
///
/// An `Err` marks the page as unparseable; the crawl records it as failed
/// and moves on.
pub trait LinkExtractor: Send + Sync {
    fn extract(&self, body: &str) -> Result<Vec<String>>;
}

static HREF_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[href]").expect("static selector is valid")
});

/// Collects the `href` of every element that has one: anchors, `<link>`,
/// `<area>`, `<base>` and so on. Filtering is left to the normalizer.
#[derive(Debug, Clone, Default)]
pub struct HtmlLinkExtractor;

impl LinkExtractor for HtmlLinkExtractor {
    fn extract(&self, body: &str) -> Result<Vec<String>> {
        let document = Html::parse_document(body);
        let links = document
            .select(&HREF_SELECTOR)
            .filter_map(|element| element.value().attr("href"))
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty())
            .collect();
        Ok(links)
    }
}
