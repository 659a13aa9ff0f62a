// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SecureScan Information Disclosure Checks
 * Passive header and response body analysis
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use tracing::debug;

use crate::http_client::FetchResponse;
use crate::payloads::matched_sql_error;
use crate::types::{Finding, FindingCategory, Page, Severity};

/// Inspect the page's own response, without sending anything extra: version
/// banners in the Server header, and database errors already present in the
/// body before any injection was attempted.
pub fn check_response(page: &Page, response: &FetchResponse) -> Vec<Finding> {
    let mut findings = Vec::new();

    if let Some(server) = response.header("server") {
        debug!("Server header on {}: {}", page.url, server);
        findings.push(Finding::new(
            "Server Header Disclosure",
            FindingCategory::InformationDisclosure,
            Severity::Low,
            format!(
                "The response exposes server software via the Server header: '{}'.",
                server
            ),
            "HTTP Headers".to_string(),
            "Version banners let attackers match the server against known exploits.",
        ));
    }

    if let Some(fingerprint) = matched_sql_error(&response.body) {
        findings.push(Finding::new(
            "Database Error Disclosure",
            FindingCategory::InformationDisclosure,
            Severity::Medium,
            format!(
                "The page body contains a raw database error (matched '{}') without any \
                 injection being performed.",
                fingerprint
            ),
            page.url.clone(),
            "Leaked database errors reveal schema and engine details that guide injection attacks.",
        ));
    }

    findings
}
