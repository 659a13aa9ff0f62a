// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SecureScan Crawler Tests
 * BFS ordering, depth and page bounds, cycle handling, error recovery
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use securescan_scanner::config::EngineConfig;
use securescan_scanner::crawler::Crawler;
use securescan_scanner::errors::ScanEngineError;
use securescan_scanner::http_client::HttpClient;
use securescan_scanner::scope::ScopePolicy;

fn test_config() -> EngineConfig {
    EngineConfig {
        http_timeout: Duration::from_secs(2),
        rate_limit_delay: Duration::from_millis(1),
        ..EngineConfig::default()
    }
}

fn crawler_for(server: &MockServer, max_depth: usize, max_pages: usize) -> Crawler {
    let config = test_config();
    let client = Arc::new(HttpClient::new(&config).unwrap());
    let seed = Url::parse(&server.uri()).unwrap();
    Crawler::new(client, ScopePolicy::new(&seed), max_depth, max_pages)
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("Content-Type", "text/html"),
        )
        .mount(server)
        .await;
}

fn link_page(title: &str, links: &[String]) -> String {
    let anchors: String = links
        .iter()
        .map(|l| format!(r#"<a href="{}">x</a>"#, l))
        .collect();
    format!("<html><head><title>{}</title></head><body>{}</body></html>", title, anchors)
}

#[tokio::test]
async fn test_crawl_follows_links_in_bfs_order() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        link_page("Home", &[format!("{}/a", base), format!("{}/b", base)]),
    )
    .await;
    mount_page(&server, "/a", link_page("A", &[format!("{}/a/deep", base)])).await;
    mount_page(&server, "/b", link_page("B", &[])).await;
    mount_page(&server, "/a/deep", link_page("Deep", &[])).await;

    let outcome = crawler_for(&server, 3, 20)
        .crawl(&server.uri(), |_| {})
        .await
        .unwrap();

    let paths: Vec<String> = outcome
        .pages
        .iter()
        .map(|p| Url::parse(&p.url).unwrap().path().to_string())
        .collect();
    assert_eq!(paths, vec!["/", "/a", "/b", "/a/deep"]);
    assert_eq!(outcome.pages[0].title, "Home");
    assert_eq!(outcome.pages[0].depth, 0);
    assert_eq!(outcome.pages[3].depth, 2);
    assert_eq!(outcome.stats.total_pages, 4);
    assert_eq!(outcome.stats.max_depth_reached, 2);
}

#[tokio::test]
async fn test_max_depth_bounds_the_crawl() {
    // Chain / -> /a -> /a/b -> /a/b/c with max_depth 2 stops at /a/b.
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", link_page("root", &[format!("{}/a", base)])).await;
    mount_page(&server, "/a", link_page("a", &[format!("{}/a/b", base)])).await;
    mount_page(&server, "/a/b", link_page("ab", &[format!("{}/a/b/c", base)])).await;
    mount_page(&server, "/a/b/c", link_page("abc", &[])).await;

    let outcome = crawler_for(&server, 2, 10)
        .crawl(&server.uri(), |_| {})
        .await
        .unwrap();

    assert_eq!(outcome.pages.len(), 3);
    assert!(outcome.pages.iter().all(|p| p.depth <= 2));
    assert_eq!(outcome.stats.max_depth_reached, 2);
}

#[tokio::test]
async fn test_zero_page_budget_returns_nothing() {
    let server = MockServer::start().await;
    mount_page(&server, "/", link_page("root", &[])).await;

    let outcome = crawler_for(&server, 3, 0)
        .crawl(&server.uri(), |_| {})
        .await
        .unwrap();

    assert!(outcome.pages.is_empty());
    assert_eq!(outcome.stats.visited_urls, 0);
    // Nothing was ever requested.
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_page_budget_stops_discovery() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        link_page("root", &[format!("{}/a", base), format!("{}/b", base)]),
    )
    .await;
    mount_page(&server, "/a", link_page("a", &[])).await;
    mount_page(&server, "/b", link_page("b", &[])).await;

    let outcome = crawler_for(&server, 3, 1)
        .crawl(&server.uri(), |_| {})
        .await
        .unwrap();

    assert_eq!(outcome.pages.len(), 1);
    assert_eq!(outcome.pages[0].depth, 0);
}

#[tokio::test]
async fn test_page_budget_drains_only_current_level() {
    // Branching factor 2 with max_pages 3: the budget fills while level 1
    // is draining, so the depth-2 URLs already queued must not be fetched.
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        link_page("root", &[format!("{}/a", base), format!("{}/b", base)]),
    )
    .await;
    mount_page(
        &server,
        "/a",
        link_page("a", &[format!("{}/a1", base), format!("{}/a2", base)]),
    )
    .await;
    mount_page(&server, "/b", link_page("b", &[format!("{}/b1", base)])).await;
    mount_page(&server, "/a1", link_page("a1", &[])).await;
    mount_page(&server, "/a2", link_page("a2", &[])).await;
    mount_page(&server, "/b1", link_page("b1", &[])).await;

    let outcome = crawler_for(&server, 3, 3)
        .crawl(&server.uri(), |_| {})
        .await
        .unwrap();

    let paths: Vec<String> = outcome
        .pages
        .iter()
        .map(|p| Url::parse(&p.url).unwrap().path().to_string())
        .collect();
    assert_eq!(paths, vec!["/", "/a", "/b"]);
    assert!(outcome.pages.iter().all(|p| p.depth <= 1));
    assert_eq!(outcome.stats.max_depth_reached, 1);
}

#[tokio::test]
async fn test_cycles_terminate() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", link_page("root", &[format!("{}/a", base)])).await;
    mount_page(
        &server,
        "/a",
        link_page("a", &[base.to_string() + "/", format!("{}/a", base)]),
    )
    .await;

    let outcome = crawler_for(&server, 5, 20)
        .crawl(&server.uri(), |_| {})
        .await
        .unwrap();

    assert_eq!(outcome.pages.len(), 2);
    assert_eq!(outcome.stats.visited_urls, 2);
}

#[tokio::test]
async fn test_failing_page_is_skipped_not_fatal() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        link_page("root", &[format!("{}/broken", base), format!("{}/ok", base)]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_page(&server, "/ok", link_page("ok", &[])).await;

    let outcome = crawler_for(&server, 3, 20)
        .crawl(&server.uri(), |_| {})
        .await
        .unwrap();

    let paths: Vec<String> = outcome
        .pages
        .iter()
        .map(|p| Url::parse(&p.url).unwrap().path().to_string())
        .collect();
    assert_eq!(paths, vec!["/", "/ok"]);
    // The broken URL was still visited (and counted), just not recorded.
    assert_eq!(outcome.stats.visited_urls, 3);
}

#[tokio::test]
async fn test_unreachable_seed_is_crawl_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = crawler_for(&server, 3, 20).crawl(&server.uri(), |_| {}).await;

    assert!(matches!(result, Err(ScanEngineError::CrawlFatal(_))));
}

#[tokio::test]
async fn test_out_of_scope_links_are_not_followed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        link_page(
            "root",
            &[
                format!("{}/account/logout", base),
                format!("{}/style.css", base),
                "https://elsewhere.example.org/".to_string(),
                format!("{}/fine", base),
            ],
        ),
    )
    .await;
    mount_page(&server, "/fine", link_page("fine", &[])).await;

    let outcome = crawler_for(&server, 3, 20)
        .crawl(&server.uri(), |_| {})
        .await
        .unwrap();

    let paths: Vec<String> = outcome
        .pages
        .iter()
        .map(|p| Url::parse(&p.url).unwrap().path().to_string())
        .collect();
    assert_eq!(paths, vec!["/", "/fine"]);
    // Page link lists only ever carry in-scope URLs.
    assert!(outcome.pages[0]
        .links
        .iter()
        .all(|l| !l.contains("logout") && !l.contains("elsewhere")));
}

#[tokio::test]
async fn test_crawler_requests_are_rate_limited() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        link_page("root", &[format!("{}/a", base), format!("{}/b", base)]),
    )
    .await;
    mount_page(&server, "/a", link_page("a", &[])).await;
    mount_page(&server, "/b", link_page("b", &[])).await;

    let config = EngineConfig {
        http_timeout: Duration::from_secs(2),
        rate_limit_delay: Duration::from_millis(40),
        ..EngineConfig::default()
    };
    let client = Arc::new(HttpClient::new(&config).unwrap());
    let seed = Url::parse(&server.uri()).unwrap();
    let crawler = Crawler::new(client, ScopePolicy::new(&seed), 3, 20);

    let started = std::time::Instant::now();
    let outcome = crawler.crawl(&server.uri(), |_| {}).await.unwrap();

    assert_eq!(outcome.pages.len(), 3);
    // Three fetches share the global limiter: two gaps of at least 40ms.
    assert!(
        started.elapsed() >= Duration::from_millis(80),
        "crawler fetches were not rate limited: {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn test_progress_callback_fires_per_page() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", link_page("root", &[format!("{}/a", base)])).await;
    mount_page(&server, "/a", link_page("a", &[])).await;

    let mut seen = Vec::new();
    let outcome = crawler_for(&server, 3, 20)
        .crawl(&server.uri(), |page| seen.push(page.url.clone()))
        .await
        .unwrap();

    assert_eq!(seen.len(), outcome.pages.len());
    assert_eq!(seen[0], outcome.pages[0].url);
}
