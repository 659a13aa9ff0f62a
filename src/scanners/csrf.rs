// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SecureScan CSRF Heuristic
 * Passive form analysis for missing anti-CSRF tokens
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use tracing::debug;

use crate::types::{Finding, FindingCategory, Form, FormInput, Page, Severity};

const CSRF_IMPACT: &str = "An attacker can trick an authenticated user's browser into submitting \
    state-changing requests on their behalf.";

/// Report every POST form that handles sensitive data without a CSRF token.
/// Purely structural: no request is ever sent.
pub fn check_page(page: &Page) -> Vec<Finding> {
    let mut findings = Vec::new();

    for form in &page.forms {
        if !form.is_post() {
            continue;
        }
        if !form.inputs.iter().any(is_sensitive_input) {
            continue;
        }
        if form.inputs.iter().any(is_csrf_token) {
            continue;
        }

        debug!("POST form without CSRF token at {}", form.action);
        findings.push(Finding::new(
            "Cross-Site Request Forgery (CSRF)",
            FindingCategory::Csrf,
            Severity::Medium,
            format!(
                "The POST form at {} handles sensitive input but carries no hidden CSRF token.",
                form.action
            ),
            format!("POST {}", form.action),
            CSRF_IMPACT,
        ));
    }

    findings
}

/// Password fields, or anything named like credentials or an email address.
fn is_sensitive_input(input: &FormInput) -> bool {
    let name = input.name.to_lowercase();
    input.input_type == "password" || name.contains("password") || name.contains("email")
}

/// Hidden inputs whose name suggests an anti-CSRF token.
fn is_csrf_token(input: &FormInput) -> bool {
    let name = input.name.to_lowercase();
    input.input_type == "hidden" && (name.contains("csrf") || name.contains("token"))
}
