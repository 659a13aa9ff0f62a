// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SecureScan Web Crawler
 * Bounded breadth-first discovery of in-scope pages
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::ScanEngineError;
use crate::http_client::HttpClient;
use crate::page_parser::parse_page;
use crate::scope::{canonical_url, ScopePolicy};
use crate::types::{CrawlStats, Page};

/// Bounded BFS crawler. Produces pages in breadth-first order; never follows
/// a URL twice, out of scope, or past `max_depth`.
pub struct Crawler {
    http_client: Arc<HttpClient>,
    scope: ScopePolicy,
    max_depth: usize,
    max_pages: usize,
    cancelled: Arc<AtomicBool>,
}

#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub pages: Vec<Page>,
    pub stats: CrawlStats,
}

impl Crawler {
    pub fn new(
        http_client: Arc<HttpClient>,
        scope: ScopePolicy,
        max_depth: usize,
        max_pages: usize,
    ) -> Self {
        Self {
            http_client,
            scope,
            max_depth,
            max_pages,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cooperative cancellation flag, checked at each loop iteration.
    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// Crawl from `seed`, invoking `on_page` after each page is recorded.
    ///
    /// Per-page fetch errors are logged and skipped; only a failed seed
    /// fetch aborts the crawl.
    pub async fn crawl<F>(&self, seed: &str, mut on_page: F) -> Result<CrawlOutcome, ScanEngineError>
    where
        F: FnMut(&Page) + Send,
    {
        let seed_url = Url::parse(seed)
            .map_err(|e| ScanEngineError::InvalidInput(format!("invalid seed URL '{}': {}", seed, e)))?;
        let seed_canonical = canonical_url(&seed_url);

        info!("[Crawler] Starting crawl of {}", seed_canonical);

        let mut queue: VecDeque<(String, usize)> = VecDeque::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut pages: Vec<Page> = Vec::new();
        let mut unique_links: HashSet<String> = HashSet::new();
        let mut total_forms = 0usize;
        let mut max_depth_reached = 0usize;
        // Depth of the BFS level being drained when the page budget was
        // reached; deeper levels stay unvisited.
        let mut budget_level: Option<usize> = None;

        // Enqueueing is discovery; with a zero page budget not even the seed
        // is discovered.
        if self.max_pages > 0 {
            queue.push_back((seed_canonical.clone(), 0));
        }

        while let Some((url, depth)) = queue.pop_front() {
            if self.cancelled.load(Ordering::Relaxed) {
                info!("[Crawler] Cancelled after {} pages", pages.len());
                break;
            }

            // Once the budget is hit, finish draining the level it was hit
            // on; the queue is depth-ordered, so the first deeper entry
            // ends the crawl.
            if let Some(level) = budget_level {
                if depth > level {
                    break;
                }
            }

            if depth > self.max_depth {
                continue;
            }
            if visited.contains(&url) {
                continue;
            }
            // Re-checked on dequeue: scope rules may be stricter than they
            // were at enqueue time.
            if !self.scope.in_scope(&url) {
                debug!("Out of scope on dequeue: {}", url);
                continue;
            }

            visited.insert(url.clone());
            debug!("Crawling {} (depth {})", url, depth);

            let response = match self.http_client.get(&url).await {
                Ok(response) => response,
                Err(e) => {
                    if pages.is_empty() && url == seed_canonical {
                        return Err(ScanEngineError::CrawlFatal(format!(
                            "seed fetch failed: {}",
                            e
                        )));
                    }
                    warn!("Failed to fetch {}: {}", url, e);
                    continue;
                }
            };

            // Redirects that leave the scan scope are refused.
            if response.final_url != url && !self.scope.in_scope(&response.final_url) {
                warn!("Refusing cross-scope redirect {} -> {}", url, response.final_url);
                continue;
            }

            let page_url = Url::parse(&url).map_err(|e| {
                ScanEngineError::Internal(format!("visited URL no longer parses: {}", e))
            })?;
            let parsed = parse_page(&response.body, &page_url, response.content_type());

            let links: Vec<String> = parsed
                .links
                .into_iter()
                .filter(|link| self.scope.in_scope(link))
                .collect();

            total_forms += parsed.forms.len();
            max_depth_reached = max_depth_reached.max(depth);
            for link in &links {
                unique_links.insert(link.clone());
            }

            let page = Page {
                url: url.clone(),
                title: parsed.title,
                depth,
                links,
                forms: parsed.forms,
            };

            // Stop discovering new URLs once the page budget is reached;
            // pages already scheduled at the current level still drain to
            // preserve BFS order.
            let discovery_open = pages.len() + 1 < self.max_pages;
            if discovery_open && depth < self.max_depth {
                for link in &page.links {
                    if !visited.contains(link) && self.scope.in_scope(link) {
                        queue.push_back((link.clone(), depth + 1));
                    }
                }
            }

            on_page(&page);
            pages.push(page);
            if budget_level.is_none() && pages.len() >= self.max_pages {
                budget_level = Some(depth);
            }
        }

        let stats = CrawlStats {
            total_pages: pages.len(),
            total_forms,
            total_links: unique_links.len(),
            visited_urls: visited.len(),
            max_depth_reached,
        };

        info!(
            "[Crawler] Crawl complete: {} pages, {} forms, {} links",
            stats.total_pages, stats.total_forms, stats.total_links
        );

        Ok(CrawlOutcome { pages, stats })
    }
}
