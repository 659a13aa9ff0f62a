// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SecureScan HTTP Fetcher
 * One-shot request primitive with timeouts, bounded redirects and body caps
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use anyhow::{Context, Result};
use reqwest::{Client, Method};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::EngineConfig;
use crate::errors::FetchError;
use crate::rate_limiter::RequestRateLimiter;

const MAX_REDIRECTS: usize = 5;

/// Thin wrapper around one shared reqwest client. Unauthenticated: no cookie
/// jar, no automatic retry. 1xx-4xx responses are returned as-is; only 5xx
/// and transport failures become errors. Every request first waits on the
/// shared rate limiter, so the crawler and the detectors are throttled by
/// the same clock.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
    max_body_bytes: usize,
    rate_limiter: Arc<RequestRateLimiter>,
}

impl HttpClient {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        // No cookie jar: scans are unauthenticated by design.
        let client = Client::builder()
            .timeout(config.http_timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            timeout: config.http_timeout,
            max_body_bytes: config.http_max_body_bytes,
            rate_limiter: Arc::new(RequestRateLimiter::new(config.rate_limit_delay)),
        })
    }

    /// Send a request. `params` are appended to the query string; `body` is
    /// sent form-encoded unless a Content-Type header says otherwise.
    pub async fn fetch(
        &self,
        url: &str,
        method: Method,
        params: &[(String, String)],
        body: Option<String>,
        headers: &[(String, String)],
    ) -> Result<FetchResponse, FetchError> {
        // Wait for the global request slot before dispatching.
        self.rate_limiter.wait_for_slot().await;

        let mut request = self.client.request(method, url);

        if !params.is_empty() {
            request = request.query(params);
        }

        let mut has_content_type = false;
        for (name, value) in headers {
            if name.eq_ignore_ascii_case("content-type") {
                has_content_type = true;
            }
            request = request.header(name, value);
        }

        if let Some(body) = body {
            if !has_content_type {
                request = request.header("Content-Type", "application/x-www-form-urlencoded");
            }
            request = request.body(body);
        }

        let mut response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, self.timeout, e))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(FetchError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Refuse to download bodies that declare themselves oversized.
        // Responses without a Content-Length are read up to the cap and
        // truncated instead.
        if let Some(declared) = response.content_length() {
            if declared as usize > self.max_body_bytes {
                return Err(FetchError::TooLarge {
                    url: url.to_string(),
                    declared,
                    limit: self.max_body_bytes,
                });
            }
        }

        let final_url = response.url().to_string();

        let mut header_map = HashMap::with_capacity(response.headers().len());
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                header_map.insert(name.as_str().to_string(), value.to_string());
            }
        }

        let mut buf: Vec<u8> = Vec::new();
        let mut truncated = false;
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    if buf.len() + chunk.len() > self.max_body_bytes {
                        let room = self.max_body_bytes - buf.len();
                        buf.extend_from_slice(&chunk[..room]);
                        truncated = true;
                        debug!("Truncated oversized body from {}", url);
                        break;
                    }
                    buf.extend_from_slice(&chunk);
                }
                Ok(None) => break,
                Err(e) => return Err(FetchError::from_reqwest(url, self.timeout, e)),
            }
        }

        Ok(FetchResponse {
            status: status.as_u16(),
            headers: header_map,
            body: String::from_utf8_lossy(&buf).to_string(),
            final_url,
            truncated,
        })
    }

    /// Plain GET with no extra parameters.
    pub async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        self.fetch(url, Method::GET, &[], None, &[]).await
    }

    /// POST with a pre-encoded form body.
    pub async fn post_form(&self, url: &str, form_body: String) -> Result<FetchResponse, FetchError> {
        self.fetch(url, Method::POST, &[], Some(form_body), &[]).await
    }
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    /// Header names are lower-case (as reqwest normalises them).
    pub headers: HashMap<String, String>,
    pub body: String,
    /// URL after redirects; differs from the request URL when redirected.
    pub final_url: String,
    /// True when the body was cut at the configured cap.
    pub truncated: bool,
}

impl FetchResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|s| s.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Case-insensitive substring check against the body.
    pub fn body_contains(&self, needle: &str) -> bool {
        self.body.to_lowercase().contains(&needle.to_lowercase())
    }
}
