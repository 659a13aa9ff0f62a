// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SecureScan Reflected XSS Scanner
 * Active reflection probes against form inputs and URL parameters
 *
 * @copyright 2025 Bountyy Oy
 * @license Proprietary
 */
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use crate::http_client::HttpClient;
use crate::payloads::{XSS_CANONICAL, XSS_PAYLOADS};
use crate::scanners::{query_param_names, replace_query_param, submit_form};
use crate::types::{Finding, FindingCategory, Page, Severity};

const XSS_IMPACT: &str = "An attacker can execute arbitrary JavaScript in victims' browsers, \
    enabling session hijacking, credential theft and content manipulation.";

/// Non-target inputs are filled with this sentinel so forms validate.
const FORM_FILLER: &str = "test";

pub struct XssScanner {
    http_client: Arc<HttpClient>,
}

impl XssScanner {
    pub fn new(http_client: Arc<HttpClient>) -> Self {
        Self { http_client }
    }

    /// Probe every non-hidden input of every form. Testing for an input
    /// stops at its first reflected payload.
    pub async fn scan_forms(&self, page: &Page) -> (Vec<Finding>, usize) {
        let mut findings = Vec::new();
        let mut tested = 0usize;

        for form in &page.forms {
            if form.fuzzable_inputs().next().is_none() {
                continue;
            }

            for input in form.fuzzable_inputs() {
                for payload in XSS_PAYLOADS {
                    tested += 1;

                    let response =
                        match submit_form(&self.http_client, form, &input.name, payload, FORM_FILLER)
                            .await
                        {
                            Ok(response) => response,
                            Err(e) => {
                                debug!("XSS probe against '{}' failed: {}", input.name, e);
                                continue;
                            }
                        };

                    if response.body_contains(payload) {
                        info!(
                            "Reflected XSS in input '{}' of {} {}",
                            input.name, form.method, form.action
                        );
                        findings.push(
                            Finding::new(
                                "Reflected XSS",
                                FindingCategory::Xss,
                                Severity::High,
                                format!(
                                    "The payload {} submitted through input '{}' was reflected \
                                     unescaped in the response.",
                                    payload, input.name
                                ),
                                format!("{} {}", form.method, form.action),
                                XSS_IMPACT,
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

    /// Probe each query parameter of the page URL with the canonical
    /// payload, preserving the other parameters verbatim.
    pub async fn scan_url_params(&self, page: &Page) -> (Vec<Finding>, usize) {
        let Ok(url) = Url::parse(&page.url) else {
            return (Vec::new(), 0);
        };

        let mut findings = Vec::new();
        let mut tested = 0usize;

        for name in query_param_names(&url) {
            let Some(probe_url) = replace_query_param(&url, &name, XSS_CANONICAL) else {
                continue;
            };

            tested += 1;

            let response = match self.http_client.get(probe_url.as_str()).await {
                Ok(response) => response,
                Err(e) => {
                    debug!("URL XSS probe for '{}' failed: {}", name, e);
                    continue;
                }
            };

            if response.body_contains(XSS_CANONICAL) {
                info!("Reflected XSS via URL parameter '{}' on {}", name, page.url);
                findings.push(
                    Finding::new(
                        "Reflected XSS (URL)",
                        FindingCategory::Xss,
                        Severity::High,
                        format!(
                            "The value of URL parameter '{}' is reflected unescaped in the \
                             response body.",
                            name
                        ),
                        format!("GET {}", probe_url),
                        XSS_IMPACT,
                    )
                    .with_parameter(&name),
                );
            }
        }

        (findings, tested)
    }
}
