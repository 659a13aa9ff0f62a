// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SecureScan DOM Sink Heuristic
 * Flags inline scripts writing to dangerous DOM sinks
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use scraper::{Html, Selector};
use tracing::debug;

use crate::types::{Finding, FindingCategory, Page, Severity};

const DOM_XSS_IMPACT: &str = "Client-side code writing attacker-influenced data into these sinks \
    can execute arbitrary JavaScript without any server round trip.";

const DOM_SINKS: &[&str] = &["innerHTML", "document.write"];

/// Scan inline `<script>` elements for dangerous sink usage. One finding per
/// sink occurrence per script. No JavaScript is executed.
pub fn check_page(page: &Page, body: &str) -> Vec<Finding> {
    let document = Html::parse_document(body);
    let selector = Selector::parse("script").expect("static selector");

    let mut findings = Vec::new();

    for (index, element) in document.select(&selector).enumerate() {
        // External scripts are not fetched; only inline code is inspected.
        if element.value().attr("src").is_some() {
            continue;
        }

        let code: String = element.text().collect();
        for sink in DOM_SINKS {
            if code.contains(sink) {
                debug!("DOM sink '{}' in inline script #{} on {}", sink, index, page.url);
                findings.push(
                    Finding::new(
                        "Potential DOM XSS",
                        FindingCategory::Xss,
                        Severity::High,
                        format!(
                            "Inline script #{} writes to the '{}' sink; if it carries \
                             user-controlled data this is exploitable client-side.",
                            index + 1,
                            sink
                        ),
                        page.url.clone(),
                        DOM_XSS_IMPACT,
                    )
                    .with_parameter(sink),
                );
            }
        }
    }

    findings
}
