// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SecureScan Page Parser
 * Extracts title, outbound links and forms from an HTML response
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

use crate::scope::canonical_url;
use crate::types::{Form, FormInput};

/// Everything the crawler needs from one fetched document.
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub title: String,
    /// Absolute, fragment-stripped, deduplicated (first occurrence wins).
    /// Scope filtering happens in the crawler, not here.
    pub links: Vec<String>,
    pub forms: Vec<Form>,
}

/// Parse an HTML body fetched from `page_url`. Non-HTML content types yield
/// an empty parse; so does anything the forgiving parser cannot make sense
/// of. Parsing never fails.
pub fn parse_page(body: &str, page_url: &Url, content_type: Option<&str>) -> ParsedPage {
    if let Some(content_type) = content_type {
        if !content_type.to_lowercase().contains("html") {
            debug!("Skipping non-HTML content type: {}", content_type);
            return ParsedPage::default();
        }
    }

    let document = Html::parse_document(body);

    ParsedPage {
        title: extract_title(&document),
        links: extract_links(&document, page_url),
        forms: extract_forms(&document, page_url),
    }
}

fn extract_title(document: &Html) -> String {
    let selector = Selector::parse("title").expect("static selector");
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

fn extract_links(document: &Html, page_url: &Url) -> Vec<String> {
    let selector = Selector::parse("a[href]").expect("static selector");
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = page_url.join(href) else {
            debug!("Ignoring unresolvable href: {}", href);
            continue;
        };
        let canonical = canonical_url(&resolved);
        if seen.insert(canonical.clone()) {
            links.push(canonical);
        }
    }

    links
}

fn extract_forms(document: &Html, page_url: &Url) -> Vec<Form> {
    let form_selector = Selector::parse("form").expect("static selector");
    let input_selector = Selector::parse("input, textarea, select").expect("static selector");

    let mut forms = Vec::new();

    for form_element in document.select(&form_selector) {
        let action_attr = form_element.value().attr("action").unwrap_or("");
        let action = if action_attr.is_empty() {
            canonical_url(page_url)
        } else {
            match page_url.join(action_attr) {
                Ok(resolved) => canonical_url(&resolved),
                Err(_) => canonical_url(page_url),
            }
        };

        let method_attr = form_element
            .value()
            .attr("method")
            .unwrap_or("GET")
            .to_uppercase();
        // Anything that is not POST (including PUT, DIALOG, typos) is
        // submitted as GET, matching browser behaviour.
        let method = if method_attr == "POST" { "POST" } else { "GET" };

        let mut inputs = Vec::new();
        for input_element in form_element.select(&input_selector) {
            let Some(name) = input_element.value().attr("name") else {
                continue;
            };
            if name.is_empty() {
                continue;
            }

            inputs.push(FormInput {
                name: name.to_string(),
                input_type: input_element
                    .value()
                    .attr("type")
                    .unwrap_or("text")
                    .to_lowercase(),
                required: input_element.value().attr("required").is_some(),
                value: input_element.value().attr("value").map(|v| v.to_string()),
            });
        }

        debug!("Found {} form with {} inputs at {}", method, inputs.len(), action);

        forms.push(Form {
            action,
            method: method.to_string(),
            inputs,
        });
    }

    forms
}
