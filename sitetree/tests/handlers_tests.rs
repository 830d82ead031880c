use sitetree::commands::command_argument_builder;
use sitetree::handlers::*;
use sitetree_core::report::ReportFormat;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_parse_url_line_with_scheme() {
    let result = parse_url_line("https://example.com");
    assert_eq!(result, Some("https://example.com".to_string()));
}

#[test]
fn test_parse_url_line_without_scheme() {
    assert_eq!(
        parse_url_line("example.com"),
        Some("http://example.com".to_string())
    );
    assert_eq!(
        parse_url_line("localhost:8080"),
        Some("http://localhost:8080".to_string())
    );
}

#[test]
fn test_parse_url_line_invalid() {
    let result = parse_url_line("not a valid url!!!");
    assert_eq!(result, None);
}

#[test]
fn test_load_urls_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, "https://example.com")?;
    writeln!(temp_file, "# staging hosts")?;
    writeln!(temp_file, "httpbin.org")?;
    writeln!(temp_file)?;
    writeln!(temp_file, "  https://docs.example.com  ")?;

    let urls = load_urls_from_file(temp_file.path())?;

    assert_eq!(
        urls,
        vec![
            "https://example.com",
            "http://httpbin.org",
            "https://docs.example.com"
        ]
    );

    Ok(())
}

#[test]
fn test_load_urls_from_file_empty() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file).unwrap();
    writeln!(temp_file, "   ").unwrap();

    let err = load_urls_from_file(temp_file.path()).unwrap_err();
    assert!(err.to_string().contains("No valid URLs"));
}

#[test]
fn test_load_urls_from_file_missing() {
    let err = load_urls_from_file(&PathBuf::from("/nonexistent/hosts.txt")).unwrap_err();
    assert!(err.to_string().contains("Failed to read hosts file"));
}

#[test]
fn test_load_urls_from_source_urls() {
    let urls = vec![
        Url::parse("https://example.com").unwrap(),
        Url::parse("https://other.example.com/docs").unwrap(),
    ];
    let result = load_urls_from_source(&urls, None).unwrap();

    assert_eq!(
        result,
        vec!["https://example.com/", "https://other.example.com/docs"]
    );
}

#[test]
fn test_load_urls_from_source_no_input() {
    let err = load_urls_from_source(&[], None).unwrap_err();
    assert!(
        err.to_string()
            .contains("Either --url or --hosts-file must be provided")
    );
}

#[test]
fn test_extract_url_path() {
    assert_eq!(extract_url_path("https://example.com/blog/post"), "/blog/post");
    assert_eq!(extract_url_path("https://example.com"), "/");
}

// ============================================================================
// End-to-end crawl through the command handler
// ============================================================================

async fn site() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                r#"<a href="/about">about</a><a href="http://elsewhere.test/">x</a>"#,
                "text/html",
            ),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<p> Rust and Go </p>", "text/html"),
        )
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_handle_crawl_writes_csv() {
    let server = site().await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("report.csv");

    let matches = command_argument_builder()
        .try_get_matches_from([
            "sitetree",
            "crawl",
            "-u",
            server.uri().as_str(),
            "--no-enrich",
            "-q",
            "-o",
            output.to_str().unwrap(),
        ])
        .unwrap();
    let (_, sub) = matches.subcommand().unwrap();

    handle_crawl(sub, true).await.unwrap();

    let csv = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "URL,DURATION,STATUS,IP_ADDRESS,GEOLOCATION,LANGUAGES");
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with(&format!("{}/,", server.uri())));
    assert!(lines[2].starts_with(&format!("-- {}/about,", server.uri())));
    assert!(lines[2].contains(r#""{""Go"":1,""Rust"":1}""#));
}

#[tokio::test]
async fn test_handle_crawl_no_seed_crawlable() {
    let matches = command_argument_builder()
        .try_get_matches_from([
            "sitetree",
            "crawl",
            "-u",
            "http://a.test/",
            "-l",
            "0",
            "--no-enrich",
        ])
        .unwrap();
    let (_, sub) = matches.subcommand().unwrap();

    let err = handle_crawl(sub, true).await.unwrap_err();
    assert_eq!(err.to_string(), "No seed could be crawled");
}

#[tokio::test]
async fn test_handle_crawl_rejects_zero_threads() {
    let matches = command_argument_builder()
        .try_get_matches_from(["sitetree", "crawl", "-u", "http://a.test/", "-t", "0"])
        .unwrap();
    let (_, sub) = matches.subcommand().unwrap();

    let err = handle_crawl(sub, true).await.unwrap_err();
    assert!(err.to_string().contains("--threads"));
}

#[tokio::test]
async fn test_render_report_json() {
    let server = site().await;
    let crawls = execute_crawl(
        CrawlOptions {
            urls: vec![server.uri()],
            enrich: false,
            ..CrawlOptions::default()
        },
        None,
    )
    .await
    .unwrap();

    let json = render_report(&crawls, ReportFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["seeds"][0]["pages"], 2);

    let text = render_report(&crawls, ReportFormat::Text).unwrap();
    assert!(text.starts_with("Total crawled urls: 2"));
}
