// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SecureScan Scope Policy
 * Pure predicate deciding whether a URL belongs to a scan
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use url::Url;

/// URL substrings that take a candidate out of scope regardless of host
/// match: destructive endpoints, social networks, CDN asset roots.
const DEFAULT_EXCLUDE_TOKENS: &[&str] = &[
    "logout",
    "signout",
    "delete",
    "facebook.com",
    "twitter.com",
    "linkedin.com",
    "instagram.com",
    "youtube.com",
    "cloudfront.net",
    "akamaized.net",
    "cdn.",
];

/// Static asset extensions the crawler never visits.
const ASSET_EXTENSIONS: &[&str] = &[
    ".css", ".js", ".jpg", ".png", ".gif", ".pdf", ".zip", ".svg", ".ico",
];

/// Path keywords that keep a URL in scope even when an include-pattern list
/// is active.
const RELEVANT_PATH_KEYWORDS: &[&str] = &[
    "login", "search", "product", "item", "account", "user", "admin", "api", "form", "contact",
    "profile", "cart", "checkout", "article", "blog", "page", "news",
];

/// Scope decisions for one scan, derived from the seed URL.
#[derive(Debug, Clone)]
pub struct ScopePolicy {
    /// Registrable root of the seed host: its last two DNS labels.
    root: String,
    exclude_tokens: Vec<String>,
    include_tokens: Vec<String>,
}

impl ScopePolicy {
    pub fn new(seed: &Url) -> Self {
        Self::with_rules(seed, Vec::new(), Vec::new())
    }

    pub fn with_rules(seed: &Url, include_tokens: Vec<String>, extra_excludes: Vec<String>) -> Self {
        let host = seed.host_str().unwrap_or_default();
        let mut exclude_tokens: Vec<String> = DEFAULT_EXCLUDE_TOKENS
            .iter()
            .map(|t| t.to_string())
            .collect();
        exclude_tokens.extend(extra_excludes.into_iter().map(|t| t.to_lowercase()));

        Self {
            root: registrable_root(host),
            exclude_tokens,
            include_tokens: include_tokens.into_iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    /// Decide whether `candidate` may be crawled. Checks run in a fixed
    /// order; the first failing check decides.
    pub fn in_scope(&self, candidate: &str) -> bool {
        let url = match Url::parse(candidate) {
            Ok(url) => url,
            Err(_) => return false,
        };
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        let host = match url.host_str() {
            Some(host) => host.to_lowercase(),
            None => return false,
        };

        if host != self.root && !host.ends_with(&format!(".{}", self.root)) {
            return false;
        }

        let lowered = candidate.to_lowercase();
        if self.exclude_tokens.iter().any(|t| lowered.contains(t)) {
            return false;
        }

        let path = url.path().to_lowercase();
        if ASSET_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            return false;
        }

        if !self.include_tokens.is_empty() {
            let included = self.include_tokens.iter().any(|t| lowered.contains(t));
            let is_root_path = path.is_empty() || path == "/";
            let relevant = RELEVANT_PATH_KEYWORDS.iter().any(|k| path.contains(k));
            if !included && !is_root_path && !relevant {
                return false;
            }
        }

        true
    }
}

/// Last two DNS labels of a host, or the whole host when it has two or
/// fewer labels.
fn registrable_root(host: &str) -> String {
    let host = host.to_lowercase();
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        host
    } else {
        labels[labels.len() - 2..].join(".")
    }
}

/// Canonical form of a URL: lowercase scheme and host, default port removed,
/// fragment stripped, query preserved verbatim. `Url` normalises scheme,
/// host and default ports on parse, so only the fragment needs stripping.
pub fn canonical_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}
