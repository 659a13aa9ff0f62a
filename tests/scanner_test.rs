// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SecureScan Detector Tests
 * End-to-end detector scenarios against a deterministic mock target
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use securescan_scanner::config::EngineConfig;
use securescan_scanner::crawler::Crawler;
use securescan_scanner::http_client::HttpClient;
use securescan_scanner::scanners::PageScanner;
use securescan_scanner::scope::ScopePolicy;
use securescan_scanner::types::{FindingCategory, Page, Severity};

fn make_client() -> Arc<HttpClient> {
    let config = EngineConfig {
        http_timeout: Duration::from_secs(2),
        rate_limit_delay: Duration::from_millis(1),
        ..EngineConfig::default()
    };
    Arc::new(HttpClient::new(&config).unwrap())
}

fn bare_page(url: &str) -> Page {
    Page {
        url: url.to_string(),
        title: String::new(),
        depth: 0,
        links: vec![],
        forms: vec![],
    }
}

async fn scan(client: &Arc<HttpClient>, page: &Page) -> securescan_scanner::scanners::PageScanOutcome {
    let initial = client.get(&page.url).await.unwrap();
    PageScanner::new(Arc::clone(client)).scan_page(page, &initial).await
}

#[tokio::test]
async fn test_reflected_xss_in_url_parameter() {
    let server = MockServer::start().await;
    let base = server.uri();

    // The vulnerable endpoint echoes q verbatim inside the body.
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", r#"<script>alert("XSS")</script>"#))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>Results for <script>alert("XSS")</script></body></html>"#,
        ))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body>Results for foo</body></html>"),
        )
        .mount(&server)
        .await;

    let client = make_client();
    let page = bare_page(&format!("{}/search?q=foo", base));
    let outcome = scan(&client, &page).await;

    assert_eq!(outcome.findings.len(), 1);
    let finding = &outcome.findings[0];
    assert_eq!(finding.name, "Reflected XSS (URL)");
    assert_eq!(finding.severity, Severity::High);
    assert_eq!(finding.category, FindingCategory::Xss);
    assert_eq!(
        finding.location,
        format!("GET {}/search?q=%3Cscript%3Ealert(%22XSS%22)%3C/script%3E", base)
    );
    // One XSS probe plus one SQLi probe on the single parameter.
    assert_eq!(outcome.endpoints_tested, 2);
}

#[tokio::test]
async fn test_encoded_reflection_is_not_a_finding() {
    let server = MockServer::start().await;
    let base = server.uri();

    // The endpoint reflects, but HTML-escapes the value.
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><body>Results for &lt;script&gt;alert(&quot;XSS&quot;)&lt;/script&gt;</body></html>",
        ))
        .mount(&server)
        .await;

    let client = make_client();
    let page = bare_page(&format!("{}/search?q=foo", base));
    let outcome = scan(&client, &page).await;

    assert!(outcome.findings.is_empty());
    assert_eq!(outcome.endpoints_tested, 2);
}

#[tokio::test]
async fn test_error_based_sqli_in_url_parameter() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/item"))
        .and(query_param("id", "'"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><body>You have an error in your SQL syntax</body></html>",
        ))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/item"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>Item 1</body></html>"))
        .mount(&server)
        .await;

    let client = make_client();
    let page = bare_page(&format!("{}/item?id=1", base));
    let outcome = scan(&client, &page).await;

    assert_eq!(outcome.findings.len(), 1);
    let finding = &outcome.findings[0];
    assert_eq!(finding.name, "SQL Injection (URL)");
    assert_eq!(finding.severity, Severity::Critical);
    assert_eq!(finding.category, FindingCategory::SqlInjection);
    assert_eq!(finding.parameter.as_deref(), Some("id"));
}

#[tokio::test]
async fn test_csrf_form_detected_without_posting() {
    let server = MockServer::start().await;
    let base = server.uri();

    let html = format!(
        r#"<html><body>
            <form method="POST" action="{}/save">
                <input type="password" name="pw">
            </form>
        </body></html>"#,
        base
    );
    Mock::given(method("GET"))
        .and(path("/account"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html)
                .insert_header("Content-Type", "text/html"),
        )
        .mount(&server)
        .await;
    // The active probes will POST the form; the heuristic itself must not.
    Mock::given(method("POST"))
        .and(path("/save"))
        .respond_with(ResponseTemplate::new(200).set_body_string("saved"))
        .mount(&server)
        .await;

    let config = EngineConfig {
        http_timeout: Duration::from_secs(2),
        rate_limit_delay: Duration::from_millis(1),
        ..EngineConfig::default()
    };
    let client = Arc::new(HttpClient::new(&config).unwrap());
    let seed = format!("{}/account", base);
    let crawler = Crawler::new(
        Arc::clone(&client),
        ScopePolicy::new(&Url::parse(&seed).unwrap()),
        0,
        5,
    );
    let crawl = crawler.crawl(&seed, |_| {}).await.unwrap();
    assert_eq!(crawl.pages.len(), 1);
    let page = &crawl.pages[0];
    assert_eq!(page.forms.len(), 1);

    let outcome = scan(&client, page).await;

    let csrf: Vec<_> = outcome
        .findings
        .iter()
        .filter(|f| f.category == FindingCategory::Csrf)
        .collect();
    assert_eq!(csrf.len(), 1);
    assert_eq!(csrf[0].name, "Cross-Site Request Forgery (CSRF)");
    assert_eq!(csrf[0].severity, Severity::Medium);
    assert_eq!(csrf[0].location, format!("POST {}/save", base));
    assert_eq!(outcome.forms_found, 1);
    // 7 XSS + 12 SQLi payloads against the one fuzzable input.
    assert_eq!(outcome.endpoints_tested, 19);
}

#[tokio::test]
async fn test_server_header_disclosure_on_quiet_page() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body>Welcome</body></html>")
                .insert_header("Server", "nginx/1.18.0"),
        )
        .mount(&server)
        .await;

    let client = make_client();
    let page = bare_page(&format!("{}/", base));
    let outcome = scan(&client, &page).await;

    // No forms, no query parameters: only the passive detectors ran.
    assert_eq!(outcome.endpoints_tested, 0);
    assert_eq!(outcome.findings.len(), 1);
    let finding = &outcome.findings[0];
    assert_eq!(finding.name, "Server Header Disclosure");
    assert_eq!(finding.severity, Severity::Low);
    assert_eq!(finding.category, FindingCategory::InformationDisclosure);
    assert_eq!(finding.location, "HTTP Headers");
    assert!(finding.description.contains("nginx/1.18.0"));
}

#[tokio::test]
async fn test_dom_sink_heuristic_flags_inline_scripts() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/app"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <script>document.getElementById("out").innerHTML = location.hash;</script>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    let client = make_client();
    let page = bare_page(&format!("{}/app", base));
    let outcome = scan(&client, &page).await;

    assert_eq!(outcome.findings.len(), 1);
    assert_eq!(outcome.findings[0].name, "Potential DOM XSS");
    assert_eq!(outcome.findings[0].severity, Severity::High);
    assert_eq!(outcome.findings[0].location, page.url);
}

#[tokio::test]
async fn test_reflected_xss_in_form_input_breaks_after_first_hit() {
    let server = MockServer::start().await;
    let base = server.uri();

    // GET form echoes the comment field unescaped on every request.
    Mock::given(method("GET"))
        .and(path("/feedback"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>Thanks for: <script>alert("XSS")</script></body></html>"#,
        ))
        .mount(&server)
        .await;

    let client = make_client();
    let page = Page {
        url: format!("{}/page", base),
        title: String::new(),
        depth: 0,
        links: vec![],
        forms: vec![securescan_scanner::types::Form {
            action: format!("{}/feedback", base),
            method: "GET".to_string(),
            inputs: vec![securescan_scanner::types::FormInput {
                name: "comment".to_string(),
                input_type: "text".to_string(),
                required: false,
                value: None,
            }],
        }],
    };

    // The initial page itself is quiet.
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>hi</body></html>"))
        .mount(&server)
        .await;

    let outcome = scan(&client, &page).await;

    let xss: Vec<_> = outcome
        .findings
        .iter()
        .filter(|f| f.name == "Reflected XSS")
        .collect();
    // One finding despite every payload echoing: testing stops at the first
    // confirming payload for the input.
    assert_eq!(xss.len(), 1);
    assert_eq!(xss[0].location, format!("GET {}/feedback", base));
    assert_eq!(xss[0].parameter.as_deref(), Some("comment"));
    // XSS stopped after 1 payload; SQLi still ran its full corpus.
    assert_eq!(outcome.endpoints_tested, 1 + 12);
}
