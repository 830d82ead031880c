use crate::result::PageMetadata;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Language names counted in page text. Matching is exact and case-sensitive.
pub const DEFAULT_LANGUAGES: &[&str] = &[
    "Python", "JavaScript", "TypeScript", "Java", "C", "C++", "C#", "Go", "Rust", "Ruby",
    "PHP", "Swift", "Kotlin", "Scala", "Haskell", "Lisp", "Perl", "R", "Erlang", "Elixir",
    "Clojure", "OCaml", "Lua", "Julia",
];

/// Count whole-token mentions of `languages` in `text`, splitting on single
/// spaces only. Languages that never occur are absent from the map.
pub fn count_language_mentions<S: AsRef<str>>(text: &str, languages: &[S]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for token in text.split(' ') {
        if languages.iter().any(|lang| lang.as_ref() == token) {
            *counts.entry(token.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

/// Per-host network metadata. Lookups never fail the page: anything that
/// goes wrong leaves the field empty.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, url: &Url) -> PageMetadata;
}

#[derive(Debug, Clone, Default)]
pub struct NoopEnricher;

#[async_trait]
impl Enricher for NoopEnricher {
    async fn enrich(&self, _url: &Url) -> PageMetadata {
        PageMetadata::default()
    }
}

pub const DEFAULT_GEO_ENDPOINT: &str = "https://ipinfo.io";

#[derive(Debug, Deserialize)]
struct GeoResponse {
    region: Option<String>,
}

/// Resolves the page's host to an IP and asks an ipinfo-style service
/// (`{endpoint}/{ip}/json`) for its region.
#[derive(Debug, Clone)]
pub struct GeoEnricher {
    client: Client,
    endpoint: String,
}

impl GeoEnricher {
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_GEO_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    pub async fn resolve_ip(url: &Url) -> Option<IpAddr> {
        let host = url.host_str()?;
        let port = url.port_or_known_default().unwrap_or(80);

        match tokio::net::lookup_host((host, port)).await {
            Ok(mut addrs) => addrs.next().map(|addr| addr.ip()),
            Err(e) => {
                debug!("DNS lookup failed for {}: {}", host, e);
                None
            }
        }
    }

    pub async fn lookup_region(&self, ip: IpAddr) -> Option<String> {
        let url = format!("{}/{}/json", self.endpoint, ip);
        let response = match self.client.get(&url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!("Geolocation lookup for {} returned {}", ip, r.status());
                return None;
            }
            Err(e) => {
                debug!("Geolocation lookup for {} failed: {}", ip, e);
                return None;
            }
        };

        response.json::<GeoResponse>().await.ok()?.region
    }
}

impl Default for GeoEnricher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Enricher for GeoEnricher {
    async fn enrich(&self, url: &Url) -> PageMetadata {
        let ip = Self::resolve_ip(url).await;
        let region = match ip {
            Some(ip) => self.lookup_region(ip).await,
            None => None,
        };

        PageMetadata {
            ip_address: ip.map(|ip| ip.to_string()),
            region,
            languages: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    #[test]
    fn test_count_language_mentions() {
        let text = "Rust and Go and Rust again, not rust or Rust.";
        let counts = count_language_mentions(text, DEFAULT_LANGUAGES);
        assert_eq!(counts.get("Rust"), Some(&2));
        assert_eq!(counts.get("Go"), Some(&1));
        assert!(!counts.contains_key("rust"));
        assert!(!counts.contains_key("Python"));
    }

    #[test]
    fn test_count_language_mentions_custom_list() {
        let counts = count_language_mentions("x y x", &["x"]);
        assert_eq!(counts.len(), 1);
        assert_eq!(counts["x"], 2);
    }

    #[tokio::test]
    async fn test_noop_enricher() {
        let url = Url::parse("http://a.test/").unwrap();
        assert_eq!(NoopEnricher.enrich(&url).await, PageMetadata::default());
    }

    #[tokio::test]
    async fn test_geo_enricher_resolves_region() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/127.0.0.1/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"ip":"127.0.0.1","region":"Loopback"}"#),
            )
            .mount(&server)
            .await;

        let enricher = GeoEnricher::with_endpoint(&server.uri());
        let url = Url::parse("http://127.0.0.1:9/page").unwrap();
        let meta = enricher.enrich(&url).await;

        assert_eq!(meta.ip_address.as_deref(), Some("127.0.0.1"));
        assert_eq!(meta.region.as_deref(), Some("Loopback"));
    }

    #[tokio::test]
    async fn test_geo_enricher_lookup_failure_leaves_region_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let enricher = GeoEnricher::with_endpoint(&server.uri());
        let url = Url::parse("http://127.0.0.1/").unwrap();
        let meta = enricher.enrich(&url).await;

        assert_eq!(meta.ip_address.as_deref(), Some("127.0.0.1"));
        assert!(meta.region.is_none());
    }
}
