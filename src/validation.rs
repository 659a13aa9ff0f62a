// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SecureScan Target Validation
 * Seed URL validation and normalisation for incoming scan requests
 *
 * @copyright 2025 Bountyy Oy
 * @license Proprietary
 */
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::errors::ScanEngineError;

// Kept byte-for-byte compatible with the front end's accept pattern. It is
// deliberately loose in places (accepts things like "foo.ba") and strict in
// others (no ports, no IP literals); scope decisions always use the parsed
// URL, never this regex.
static REQUEST_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://)?([\da-z.-]+)\.([a-z.]{2,6})([/\w .-]*)*/?$")
        .expect("request URL regex must compile")
});

/// Validate a raw `POST /api/scans` target exactly the way the front end
/// does, then normalise it. Scheme-less targets get an https:// prefix.
pub fn validate_scan_request_url(raw: &str) -> Result<String, ScanEngineError> {
    let trimmed = raw.trim();
    if !REQUEST_URL_RE.is_match(trimmed) {
        return Err(ScanEngineError::InvalidInput(format!(
            "'{}' is not a valid target URL",
            trimmed
        )));
    }
    normalize_seed(trimmed)
}

/// Engine-level seed normalisation: prefix a missing scheme, require an
/// absolute http(s) URL with a host. The engine accepts anything fetchable
/// (ports and IP literals included), independent of the request regex.
pub fn normalize_seed(raw: &str) -> Result<String, ScanEngineError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ScanEngineError::InvalidInput(
            "target URL must not be empty".to_string(),
        ));
    }

    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&with_scheme)
        .map_err(|e| ScanEngineError::InvalidInput(format!("'{}': {}", trimmed, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ScanEngineError::InvalidInput(format!(
            "'{}' must use http or https",
            trimmed
        )));
    }
    if parsed.host_str().is_none() {
        return Err(ScanEngineError::InvalidInput(format!(
            "'{}' has no host",
            trimmed
        )));
    }

    Ok(parsed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url_accepts_plain_domains_and_prefixes_https() {
        assert_eq!(
            validate_scan_request_url("example.com").unwrap(),
            "https://example.com/"
        );
        assert_eq!(
            validate_scan_request_url("http://example.com/shop").unwrap(),
            "http://example.com/shop"
        );
    }

    #[test]
    fn test_request_url_rejects_garbage() {
        assert!(validate_scan_request_url("").is_err());
        assert!(validate_scan_request_url("not a url at all !!!").is_err());
        assert!(validate_scan_request_url("ftp://example.com").is_err());
    }

    #[test]
    fn test_request_regex_is_known_loose() {
        // The compatibility regex accepts short pseudo-domains; parsing
        // still has to succeed for the target to be usable.
        assert!(validate_scan_request_url("foo.ba").is_ok());
    }

    #[test]
    fn test_request_regex_rejects_ports_but_engine_accepts_them() {
        assert!(validate_scan_request_url("http://127.0.0.1:5000/").is_err());
        assert_eq!(
            normalize_seed("http://127.0.0.1:5000/").unwrap(),
            "http://127.0.0.1:5000/"
        );
    }

    #[test]
    fn test_normalize_seed_prefixes_https() {
        assert_eq!(
            normalize_seed("example.com/a b").unwrap(),
            "https://example.com/a%20b"
        );
        assert!(normalize_seed("").is_err());
        assert!(normalize_seed("http://").is_err());
    }
}
