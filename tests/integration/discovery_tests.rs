//! Integration tests for URL discovery
//!
//! These tests use wiremock to create mock HTTP servers and run whole
//! discovery runs end-to-end: robots.txt, sitemap resolution, the link
//! crawl, the report, and its persistence.

use flate2::write::GzEncoder;
use flate2::Compression;
use seo_discovery::config::{parse_config, Config};
use seo_discovery::crawler::{LinkCrawler, NoopCrawlSource};
use seo_discovery::discovery::{DiscoverySource, ErrorKind, WarningKind};
use seo_discovery::output::{read_json_report, write_json_report};
use seo_discovery::sitemap::{ContentEncoding, SitemapType};
use seo_discovery::storage::{persist_report, ChangeStatus, SqliteStorage, Storage};
use seo_discovery::{DiscoveryReport, DiscoveryService};
use std::io::Write;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Creates a test configuration; `fetcher` and `resolver` are TOML bodies
fn create_test_config(fetcher: &str, resolver: &str) -> Config {
    parse_config(&format!(
        r#"
[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[fetcher]
{}

[resolver]
retry-delay-ms = 10
{}

[crawl]
max-depth = 2
max-pages = 50

[output]
report-path = "./report.json"
"#,
        fetcher, resolver
    ))
    .expect("test config must be valid")
}

fn default_config() -> Config {
    create_test_config("", "")
}

fn urlset(entries: &[String]) -> String {
    let body: String = entries
        .iter()
        .map(|loc| format!("<url><loc>{}</loc></url>", loc))
        .collect();
    format!(r#"<urlset xmlns="{}">{}</urlset>"#, SITEMAP_NS, body)
}

fn index(children: &[String]) -> String {
    let body: String = children
        .iter()
        .map(|loc| format!("<sitemap><loc>{}</loc></sitemap>", loc))
        .collect();
    format!(r#"<sitemapindex xmlns="{}">{}</sitemapindex>"#, SITEMAP_NS, body)
}

async fn mount_xml(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/xml")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

async fn discover_sitemaps_only(config: Config, server: &MockServer) -> DiscoveryReport {
    let crawl = config.crawl.clone();
    DiscoveryService::new(config)
        .discover(&server.uri(), None, &crawl, &NoopCrawlSource)
        .await
        .expect("discovery should succeed")
}

#[tokio::test]
async fn test_index_with_one_failing_child() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        index(&[
            format!("{}/posts.xml", base),
            format!("{}/pages.xml", base),
            format!("{}/broken.xml", base),
        ]),
    )
    .await;
    mount_xml(
        &server,
        "/posts.xml",
        urlset(&[format!("{}/post-1", base), format!("{}/post-2", base)]),
    )
    .await;
    mount_xml(&server, "/pages.xml", urlset(&[format!("{}/about", base)])).await;
    Mock::given(method("GET"))
        .and(path("/broken.xml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let report = discover_sitemaps_only(default_config(), &server).await;
    let stats = &report.statistics.resolver;

    assert_eq!(stats.sitemaps_found, 4);
    assert_eq!(stats.sitemaps_parsed, 3);
    assert_eq!(stats.sitemaps_failed, 1);
    assert_eq!(report.parsing_errors.len(), 1);
    assert_eq!(report.errors_of_kind(ErrorKind::HttpError).count(), 1);
    assert_eq!(report.parsing_errors[0].url, format!("{}/broken.xml", base));

    assert_eq!(report.total_urls, 3);
    assert!(report.url(&format!("{}/post-1", base)).is_some());
    assert!(report.url(&format!("{}/about", base)).is_some());

    assert_eq!(report.sitemap_indexes.len(), 1);
    assert_eq!(report.sitemap_indexes[0].children.len(), 3);
}

#[tokio::test]
async fn test_robots_declared_sitemap() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "User-agent: *\nDisallow: /admin\nSitemap: {}/custom/map.xml\n",
            base
        )))
        .mount(&server)
        .await;
    mount_xml(&server, "/custom/map.xml", urlset(&[format!("{}/landing", base)])).await;

    let report = discover_sitemaps_only(default_config(), &server).await;

    assert_eq!(
        report.discovered_sitemaps,
        vec![format!("{}/custom/map.xml", base)]
    );
    assert_eq!(report.total_urls, 1);
    assert!(report.parsing_errors.is_empty());
}

#[tokio::test]
async fn test_depth_limit_stops_fetching() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(&server, "/sitemap.xml", index(&[format!("{}/level2.xml", base)])).await;
    mount_xml(&server, "/level2.xml", index(&[format!("{}/level3.xml", base)])).await;
    Mock::given(method("GET"))
        .and(path("/level3.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(urlset(&[format!(
            "{}/too-deep",
            base
        )])))
        .expect(0)
        .mount(&server)
        .await;

    let report = discover_sitemaps_only(create_test_config("", "max-depth = 2"), &server).await;

    assert_eq!(report.statistics.resolver.max_depth_reached, 2);
    assert_eq!(report.warnings_of_kind(WarningKind::DepthExceeded).count(), 1);
    assert!(report.url(&format!("{}/too-deep", base)).is_none());
}

#[tokio::test]
async fn test_sitemap_cycle_terminates() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(index(&[format!("{}/b.xml", base)])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b.xml"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(index(&[format!("{}/sitemap.xml", base)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let report = discover_sitemaps_only(default_config(), &server).await;

    assert_eq!(report.statistics.resolver.cycles_detected, 1);
    assert_eq!(report.warnings_of_kind(WarningKind::CycleDetected).count(), 1);
    assert_eq!(report.sitemaps.len(), 2);
}

#[tokio::test]
async fn test_lowest_depth_metadata_wins() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        format!(
            r#"<urlset xmlns="{}"><url><loc>{}/page</loc><lastmod>2024-03-01</lastmod><priority>0.9</priority></url></urlset>"#,
            SITEMAP_NS, base
        ),
    )
    .await;
    mount_xml(&server, "/sitemap_index.xml", index(&[format!("{}/nested.xml", base)])).await;
    mount_xml(
        &server,
        "/nested.xml",
        format!(
            r#"<urlset xmlns="{}"><url><loc>{}/page/</loc><lastmod>2020-01-01</lastmod><priority>0.1</priority></url></urlset>"#,
            SITEMAP_NS, base
        ),
    )
    .await;

    let report = discover_sitemaps_only(default_config(), &server).await;
    let page = report.url(&format!("{}/page", base)).unwrap();

    assert_eq!(report.total_urls, 1);
    assert_eq!(page.priority, Some(0.9));
    assert_eq!(
        page.lastmod.unwrap().format("%Y-%m-%d").to_string(),
        "2024-03-01"
    );
    assert_eq!(
        page.source_sitemap.as_deref(),
        Some(format!("{}/sitemap.xml", base).as_str())
    );
}

#[tokio::test]
async fn test_gzip_sitemap() {
    let server = MockServer::start().await;
    let base = server.uri();

    let xml = urlset(&[format!("{}/a", base), format!("{}/b", base)]);
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(xml.as_bytes()).unwrap();
    let gz = encoder.finish().unwrap();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("Sitemap: {}/sitemap.xml.gz\n", base)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml.gz"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/x-gzip")
                .set_body_bytes(gz),
        )
        .mount(&server)
        .await;

    let report = discover_sitemaps_only(create_test_config("", "probe-well-known = false"), &server).await;

    assert_eq!(report.total_urls, 2);
    let doc = &report.sitemaps[0];
    assert_eq!(doc.content_encoding, Some(ContentEncoding::Gzip));
    assert_eq!(doc.sitemap_type, Some(SitemapType::Regular));
    assert_eq!(doc.uncompressed_size, xml.len() as u64);
}

#[tokio::test]
async fn test_oversized_sitemap_is_too_large() {
    let server = MockServer::start().await;
    let base = server.uri();

    let entries: Vec<String> = (0..200).map(|i| format!("{}/page-{}", base, i)).collect();
    mount_xml(&server, "/sitemap.xml", urlset(&entries)).await;

    let report =
        discover_sitemaps_only(create_test_config("max-body-bytes = 2048", ""), &server).await;

    assert_eq!(report.errors_of_kind(ErrorKind::TooLarge).count(), 1);
    assert_eq!(report.total_urls, 0);
}

#[tokio::test]
async fn test_timeout_does_not_block_siblings() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        index(&[format!("{}/slow.xml", base), format!("{}/fast.xml", base)]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/slow.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(urlset(&[format!("{}/slow-page", base)]))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;
    mount_xml(&server, "/fast.xml", urlset(&[format!("{}/fast-page", base)])).await;

    let report = discover_sitemaps_only(
        create_test_config("timeout-secs = 1", "max-retries = 0"),
        &server,
    )
    .await;

    assert_eq!(report.errors_of_kind(ErrorKind::Timeout).count(), 1);
    assert!(report.url(&format!("{}/fast-page", base)).is_some());
    assert!(report.url(&format!("{}/slow-page", base)).is_none());
}

#[tokio::test]
async fn test_sitemap_and_crawl_are_deduplicated() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        urlset(&[format!("{}/", base), format!("{}/about", base)]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(
                    r#"<html><body>
                    <a href="/about/">About</a>
                    <a href="/contact#form">Contact</a>
                    </body></html>"#,
                ),
        )
        .mount(&server)
        .await;
    for page in ["/about", "/about/", "/contact"] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html><body>leaf</body></html>"),
            )
            .mount(&server)
            .await;
    }

    let config = default_config();
    let crawl = config.crawl.clone();
    let crawler = LinkCrawler::new(&config.user_agent, &config.fetcher).unwrap();
    let report = DiscoveryService::new(config)
        .discover(&base, None, &crawl, &crawler)
        .await
        .unwrap();

    assert_eq!(report.total_urls, 3);
    assert_eq!(report.urls.len(), 3);

    let about = report.url(&format!("{}/about", base)).unwrap();
    assert_eq!(
        about.sources,
        vec![DiscoverySource::Sitemap, DiscoverySource::Crawl]
    );
    let contact = report.url(&format!("{}/contact", base)).unwrap();
    assert_eq!(contact.sources, vec![DiscoverySource::Crawl]);

    assert_eq!(report.sources.both.count, 2);
    assert_eq!(report.sources.crawl.count, 3);
    assert_eq!(report.sources.sitemap.count, 2);
}

#[tokio::test]
async fn test_report_is_written_and_stored() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_xml(
        &server,
        "/sitemap.xml",
        urlset(&[format!("{}/one", base), format!("{}/two", base)]),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("report.json");
    let mut storage = SqliteStorage::new(&dir.path().join("discovery.db")).unwrap();

    let first = discover_sitemaps_only(default_config(), &server).await;
    write_json_report(&first, &report_path).unwrap();
    assert_eq!(read_json_report(&report_path).unwrap(), first);

    let first_run = persist_report(&mut storage, &first, "cfg").unwrap();
    assert_eq!(first_run.snapshots[0].status, ChangeStatus::New);

    let second = discover_sitemaps_only(default_config(), &server).await;
    let second_run = persist_report(&mut storage, &second, "cfg").unwrap();
    assert_eq!(second_run.snapshots[0].status, ChangeStatus::Unchanged);
    assert_eq!(second_run.changed().count(), 0);

    assert_eq!(storage.count_urls(second_run.run_id).unwrap(), 2);
    let latest = storage.get_latest_run(&base).unwrap().unwrap();
    assert_eq!(latest.id, second_run.run_id);
}
