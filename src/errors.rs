// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SecureScan Error Types
 * Typed error taxonomy for the scan engine
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use std::time::Duration;
use thiserror::Error;

/// Per-request fetch failures. Anything 1xx-4xx is a response, not an error;
/// only transport failures and 5xx land here.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("server error {status} from {url}")]
    BadStatus { url: String, status: u16 },

    #[error("response from {url} declares {declared} bytes, limit is {limit}")]
    TooLarge {
        url: String,
        declared: u64,
        limit: usize,
    },

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    pub fn from_reqwest(url: &str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout,
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

/// Failure of a single worker-pool task. Never aborts the pool or the scan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("worker {worker_id} crashed while running the task")]
    WorkerCrashed { worker_id: usize },

    #[error("failed to post task to worker {worker_id}")]
    DispatchFailed { worker_id: usize },

    #[error("worker pool is shutting down")]
    PoolShutdown,

    #[error("task execution failed: {0}")]
    Execution(String),
}

/// Top-level scan engine errors surfaced to callers.
#[derive(Error, Debug)]
pub enum ScanEngineError {
    /// Malformed seed URL or out-of-scope target. The scan is never created.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The seed itself could not be fetched; the scan transitions to failed.
    #[error("crawl failed: {0}")]
    CrawlFatal(String),

    #[error("scan engine error: {0}")]
    Internal(String),
}
