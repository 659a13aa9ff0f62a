// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SecureScan Page Scanner
 * Applies every detector to one crawled page
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use crate::errors::FetchError;
use crate::http_client::{FetchResponse, HttpClient};
use crate::types::{Finding, Form, Page, ScanTask, TaskKind, TaskOutcome};
use crate::worker_pool::TaskExecutor;

pub mod csrf;
pub mod disclosure;
pub mod dom_xss;
pub mod sqli;
pub mod xss;

pub use sqli::SqliScanner;
pub use xss::XssScanner;

/// What scanning a single page produced.
#[derive(Debug, Clone, Default)]
pub struct PageScanOutcome {
    pub findings: Vec<Finding>,
    pub forms_found: usize,
    pub endpoints_tested: usize,
}

/// Runs the full detector battery against one page: passive detectors first
/// (no HTTP cost), then the active form and URL probes. Active detectors are
/// sequential within a page; parallelism lives in the worker pool.
pub struct PageScanner {
    http_client: Arc<HttpClient>,
}

impl PageScanner {
    pub fn new(http_client: Arc<HttpClient>) -> Self {
        Self { http_client }
    }

    pub async fn scan_page(&self, page: &Page, initial: &FetchResponse) -> PageScanOutcome {
        debug!("Scanning page {}", page.url);

        let mut findings: Vec<Finding> = Vec::new();
        let mut endpoints_tested = 0usize;

        // Passive detectors: form analysis, DOM sinks, disclosure.
        findings.extend(csrf::check_page(page));
        findings.extend(dom_xss::check_page(page, &initial.body));
        findings.extend(disclosure::check_response(page, initial));

        // Active detectors: XSS before SQLi, forms before URL parameters.
        let xss = XssScanner::new(Arc::clone(&self.http_client));
        let (found, tested) = xss.scan_forms(page).await;
        findings.extend(found);
        endpoints_tested += tested;
        let (found, tested) = xss.scan_url_params(page).await;
        findings.extend(found);
        endpoints_tested += tested;

        let sqli = SqliScanner::new(Arc::clone(&self.http_client));
        let (found, tested) = sqli.scan_forms(page).await;
        findings.extend(found);
        endpoints_tested += tested;
        let (found, tested) = sqli.scan_url_params(page).await;
        findings.extend(found);
        endpoints_tested += tested;

        let findings = dedupe_findings(findings);

        if !findings.is_empty() {
            info!(
                "Page {} produced {} findings ({} probes dispatched)",
                page.url,
                findings.len(),
                endpoints_tested
            );
        }

        PageScanOutcome {
            findings,
            forms_found: page.forms.len(),
            endpoints_tested,
        }
    }
}

/// Drop repeated findings within a single page's results. Identity is
/// (name, location, parameter); first occurrence wins. Idempotent.
pub fn dedupe_findings(findings: Vec<Finding>) -> Vec<Finding> {
    let mut seen = HashSet::new();
    findings
        .into_iter()
        .filter(|finding| seen.insert(finding.dedup_key()))
        .collect()
}

/// Submit `form` with `target_input` set to `payload` and every other named
/// input set to `filler`. GET forms get the body appended as a query string.
pub(crate) async fn submit_form(
    client: &HttpClient,
    form: &Form,
    target_input: &str,
    payload: &str,
    filler: &str,
) -> Result<FetchResponse, FetchError> {
    let body: String = form
        .inputs
        .iter()
        .map(|input| {
            let value = if input.name == target_input { payload } else { filler };
            format!(
                "{}={}",
                urlencoding::encode(&input.name),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&");

    if form.is_post() {
        client.post_form(&form.action, body).await
    } else {
        let separator = if form.action.contains('?') { '&' } else { '?' };
        let url = format!("{}{}{}", form.action, separator, body);
        client.get(&url).await
    }
}

/// Query parameter names of a URL, decoded, deduplicated, in order.
pub(crate) fn query_param_names(url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    url.query_pairs()
        .map(|(name, _)| name.into_owned())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Rebuild `url` with the value of `target` replaced by `raw_value`; every
/// other query part is preserved verbatim. The url crate applies standard
/// query escaping to the injected value.
pub(crate) fn replace_query_param(url: &Url, target: &str, raw_value: &str) -> Option<Url> {
    let raw_query = url.query()?;

    let parts: Vec<String> = raw_query
        .split('&')
        .map(|part| {
            let (key, _) = part.split_once('=').unwrap_or((part, ""));
            let decoded = urlencoding::decode(key)
                .map(|k| k.into_owned())
                .unwrap_or_else(|_| key.to_string());
            if decoded == target {
                format!("{}={}", key, raw_value)
            } else {
                part.to_string()
            }
        })
        .collect();

    let mut probe = url.clone();
    probe.set_query(Some(&parts.join("&")));
    Some(probe)
}

/// Bridges the page scanner into the worker pool: fetches the page once
/// (feeding the passive detectors), then runs the detector battery.
pub struct PageScanExecutor {
    http_client: Arc<HttpClient>,
}

impl PageScanExecutor {
    pub fn new(http_client: Arc<HttpClient>) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl TaskExecutor for PageScanExecutor {
    async fn execute(&self, task: &ScanTask) -> Result<TaskOutcome, String> {
        if task.kind == TaskKind::Init {
            return Ok(TaskOutcome::default());
        }

        let page = task
            .page
            .as_ref()
            .ok_or_else(|| format!("scan task {} carries no page", task.task_id))?;

        let initial = self
            .http_client
            .get(&page.url)
            .await
            .map_err(|e| format!("initial fetch of {} failed: {}", page.url, e))?;

        let scanner = PageScanner::new(Arc::clone(&self.http_client));
        let outcome = scanner.scan_page(page, &initial).await;

        Ok(TaskOutcome {
            findings: outcome.findings,
            forms_found: outcome.forms_found,
            endpoints_tested: outcome.endpoints_tested,
            page_url: page.url.clone(),
        })
    }
}
