// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SecureScan SQL Injection Scanner
 * Error-based SQLi probes against form inputs and URL parameters
 *
 * @copyright 2025 Bountyy Oy
 * @license Proprietary
 */
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use crate::http_client::HttpClient;
use crate::payloads::{matched_sql_error, SQLI_PAYLOADS, SQLI_URL_PROBE};
use crate::scanners::{query_param_names, replace_query_param, submit_form};
use crate::types::{Finding, FindingCategory, Page, Severity};

const SQLI_IMPACT: &str = "An attacker can read, modify or delete database contents and may be \
    able to escalate to full server compromise.";

/// Non-target inputs are filled with "1" so numeric contexts stay valid and
/// the injected quote is what breaks the query.
const FORM_FILLER: &str = "1";

pub struct SqliScanner {
    http_client: Arc<HttpClient>,
}

impl SqliScanner {
    pub fn new(http_client: Arc<HttpClient>) -> Self {
        Self { http_client }
    }

    /// Probe every non-hidden input of every form with the error-based
    /// corpus. Testing for an input stops at its first confirmed payload.
    pub async fn scan_forms(&self, page: &Page) -> (Vec<Finding>, usize) {
        let mut findings = Vec::new();
        let mut tested = 0usize;

        for form in &page.forms {
            if form.fuzzable_inputs().next().is_none() {
                continue;
            }

            for input in form.fuzzable_inputs() {
                for payload in SQLI_PAYLOADS {
                    tested += 1;

                    let response =
                        match submit_form(&self.http_client, form, &input.name, payload, FORM_FILLER)
                            .await
                        {
                            Ok(response) => response,
                            Err(e) => {
                                debug!("SQLi probe against '{}' failed: {}", input.name, e);
                                continue;
                            }
                        };

                    if let Some(fingerprint) = matched_sql_error(&response.body) {
                        info!(
                            "SQL injection in input '{}' of {} {} (fingerprint: {})",
                            input.name, form.method, form.action, fingerprint
                        );
                        findings.push(
                            Finding::new(
                                "SQL Injection",
                                FindingCategory::SqlInjection,
                                Severity::Critical,
                                format!(
                                    "Submitting {} through input '{}' produced a database error \
                                     (matched '{}').",
                                    payload, input.name, fingerprint
                                ),
                                format!("{} {}", form.method, form.action),
                                SQLI_IMPACT,
                            )
                            .with_parameter(&input.name),
                        );
                        break;
                    }
                }
            }
        }

        (findings, tested)
    }

    /// Replace each query parameter with a single quote and look for a
    /// database error leaking into the response.
    pub async fn scan_url_params(&self, page: &Page) -> (Vec<Finding>, usize) {
        let Ok(url) = Url::parse(&page.url) else {
            return (Vec::new(), 0);
        };

        let mut findings = Vec::new();
        let mut tested = 0usize;

        for name in query_param_names(&url) {
            let Some(probe_url) = replace_query_param(&url, &name, SQLI_URL_PROBE) else {
                continue;
            };

            tested += 1;

            let response = match self.http_client.get(probe_url.as_str()).await {
                Ok(response) => response,
                Err(e) => {
                    debug!("URL SQLi probe for '{}' failed: {}", name, e);
                    continue;
                }
            };

            if let Some(fingerprint) = matched_sql_error(&response.body) {
                info!(
                    "SQL injection via URL parameter '{}' on {} (fingerprint: {})",
                    name, page.url, fingerprint
                );
                findings.push(
                    Finding::new(
                        "SQL Injection (URL)",
                        FindingCategory::SqlInjection,
                        Severity::Critical,
                        format!(
                            "A single quote in URL parameter '{}' produced a database error \
                             (matched '{}').",
                            name, fingerprint
                        ),
                        format!("GET {}", probe_url),
                        SQLI_IMPACT,
                    )
                    .with_parameter(&name),
                );
            }
        }

        (findings, tested)
    }
}
