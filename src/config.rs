// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SecureScan Engine Configuration
 * Environment-driven configuration for the scan engine
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "SecureScan-Worker/1.0";
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Engine-wide configuration. Every knob has an environment variable and a
/// default matching the deployment contract.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// WORKER_COUNT
    pub worker_count: usize,
    /// RATE_LIMIT_DELAY_MS - minimum spacing between task dispatches
    pub rate_limit_delay: Duration,
    /// MAX_CONCURRENT_REQUESTS - cap on globally in-flight tasks
    pub max_concurrent_requests: usize,
    /// MAX_CRAWL_DEPTH
    pub max_crawl_depth: usize,
    /// MAX_CRAWL_PAGES
    pub max_crawl_pages: usize,
    /// HTTP_TIMEOUT_MS - connect + read, per request
    pub http_timeout: Duration,
    /// HTTP_MAX_BODY_BYTES - bodies beyond this are truncated and flagged
    pub http_max_body_bytes: usize,
    /// USER_AGENT
    pub user_agent: String,
    /// LISTEN_PORT - used by the front-end collaborator, carried here so one
    /// config object describes the whole deployment
    pub listen_port: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_count: 5,
            rate_limit_delay: Duration::from_millis(500),
            max_concurrent_requests: 10,
            max_crawl_depth: 3,
            max_crawl_pages: 20,
            http_timeout: Duration::from_millis(10_000),
            http_max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            listen_port: 5000,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment, falling back to defaults for
    /// anything unset or unparseable.
    pub fn from_env() -> Self {
        Self {
            worker_count: env_parse("WORKER_COUNT", 5),
            rate_limit_delay: Duration::from_millis(env_parse("RATE_LIMIT_DELAY_MS", 500)),
            max_concurrent_requests: env_parse("MAX_CONCURRENT_REQUESTS", 10),
            max_crawl_depth: env_parse("MAX_CRAWL_DEPTH", 3),
            max_crawl_pages: env_parse("MAX_CRAWL_PAGES", 20),
            http_timeout: Duration::from_millis(env_parse("HTTP_TIMEOUT_MS", 10_000)),
            http_max_body_bytes: env_parse("HTTP_MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES),
            user_agent: std::env::var("USER_AGENT")
                .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string()),
            listen_port: env_parse("LISTEN_PORT", 5000),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deployment_contract() {
        let config = EngineConfig::default();
        assert_eq!(config.worker_count, 5);
        assert_eq!(config.rate_limit_delay, Duration::from_millis(500));
        assert_eq!(config.max_concurrent_requests, 10);
        assert_eq!(config.max_crawl_depth, 3);
        assert_eq!(config.max_crawl_pages, 20);
        assert_eq!(config.http_timeout, Duration::from_secs(10));
        assert_eq!(config.http_max_body_bytes, 2 * 1024 * 1024);
        assert_eq!(config.user_agent, "SecureScan-Worker/1.0");
        assert_eq!(config.listen_port, 5000);
    }
}
