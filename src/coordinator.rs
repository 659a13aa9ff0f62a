// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SecureScan Scan Coordinator
 * Owns one scan's lifecycle: crawl, schedule, aggregate, report
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::EngineConfig;
use crate::crawler::Crawler;
use crate::errors::ScanEngineError;
use crate::http_client::HttpClient;
use crate::progress::ProgressBus;
use crate::scanners::PageScanExecutor;
use crate::scope::{canonical_url, ScopePolicy};
use crate::storage::ScanStore;
use crate::types::{
    CrawlStats, Finding, FindingCategory, ProgressEvent, ScanRecord, ScanState, ScanStatus,
    ScanTask, Severity,
};
use crate::validation::normalize_seed;
use crate::worker_pool::{WorkerPool, WorkerPoolConfig};

const CRAWL_STAGE: &str = "Crawling target site";
const SCAN_STAGE: &str = "Scanning pages";
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(10);

/// Drives one scan at a time: crawl, fan pages out to the worker pool,
/// aggregate counters as the single writer of `ScanState`, and stream
/// progress snapshots to the bus.
pub struct ScanCoordinator {
    config: EngineConfig,
    http_client: Arc<HttpClient>,
    bus: Arc<ProgressBus>,
    store: Arc<dyn ScanStore>,
}

/// Handle to a scan running in the background.
pub struct ScanHandle {
    pub scan_id: String,
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl ScanHandle {
    /// Request cooperative cancellation; checked at crawl iterations and
    /// between task completions.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

impl ScanCoordinator {
    pub fn new(
        config: EngineConfig,
        bus: Arc<ProgressBus>,
        store: Arc<dyn ScanStore>,
    ) -> Result<Self> {
        let http_client = Arc::new(HttpClient::new(&config)?);
        Ok(Self {
            config,
            http_client,
            bus,
            store,
        })
    }

    /// Fire-and-forget entry point: the HTTP handler returns as soon as the
    /// scan task is spawned.
    pub fn start_scan(self: &Arc<Self>, scan_id: &str, target: &str) -> ScanHandle {
        let cancel = Arc::new(AtomicBool::new(false));
        let coordinator = Arc::clone(self);
        let id = scan_id.to_string();
        let target = target.to_string();
        let cancel_flag = Arc::clone(&cancel);

        let handle = tokio::spawn(async move {
            match coordinator.run_scan_cancellable(&id, &target, cancel_flag).await {
                Ok(record) => info!(
                    "Scan {} finished: {} ({} findings)",
                    id,
                    record.status,
                    record.vulnerabilities.len()
                ),
                Err(e) => error!("Scan {} aborted: {}", id, e),
            }
        });

        ScanHandle {
            scan_id: scan_id.to_string(),
            cancel,
            handle,
        }
    }

    /// Run a scan to completion and return the persisted record. A failed
    /// crawl still yields a record (status `failed`, synthetic finding);
    /// only invalid input or internal faults yield an error.
    pub async fn run_scan(&self, scan_id: &str, target: &str) -> Result<ScanRecord, ScanEngineError> {
        self.run_scan_cancellable(scan_id, target, Arc::new(AtomicBool::new(false)))
            .await
    }

    async fn run_scan_cancellable(
        &self,
        scan_id: &str,
        target: &str,
        cancel: Arc<AtomicBool>,
    ) -> Result<ScanRecord, ScanEngineError> {
        let target = normalize_seed(target)?;
        let seed_url = Url::parse(&target)
            .map_err(|e| ScanEngineError::InvalidInput(format!("'{}': {}", target, e)))?;
        let seed = canonical_url(&seed_url);
        let scope = ScopePolicy::new(&seed_url);
        if !scope.in_scope(&seed) {
            return Err(ScanEngineError::InvalidInput(format!(
                "seed URL {} is out of scope",
                seed
            )));
        }

        let mut state = ScanState::new(scan_id);
        let created_at = state.start_time.to_rfc3339();

        info!("Scan {} starting against {}", scan_id, seed);

        // begin: pending -> crawling
        state.status = ScanStatus::Crawling;
        self.bus
            .publish_progress(scan_id, self.snapshot(&state, 0, CRAWL_STAGE, false));

        let crawler = Crawler::new(
            Arc::clone(&self.http_client),
            scope,
            self.config.max_crawl_depth,
            self.config.max_crawl_pages,
        )
        .with_cancel_flag(Arc::clone(&cancel));

        let bus = Arc::clone(&self.bus);
        let crawl_state = state.clone();
        let mut pages_found = 0usize;
        let crawl_result = crawler
            .crawl(&seed, |page| {
                pages_found += 1;
                debug!("Discovered page {} at depth {}", page.url, page.depth);
                let mut event =
                    snapshot_of(&crawl_state, crawl_progress(pages_found), CRAWL_STAGE, false);
                event.total_pages = pages_found;
                bus.publish_progress(&crawl_state.scan_id, event);
            })
            .await;

        let crawl = match crawl_result {
            Ok(crawl) => crawl,
            Err(ScanEngineError::CrawlFatal(reason)) => {
                warn!("Scan {} failed during crawl: {}", scan_id, reason);
                return self
                    .finish_failed(scan_id, &seed, state, created_at, reason)
                    .await;
            }
            Err(other) => return Err(other),
        };

        if cancel.load(Ordering::Relaxed) {
            return Err(ScanEngineError::Internal("scan cancelled".to_string()));
        }

        // crawl_complete: seed totals, move to scanning
        state.total_pages = crawl.pages.len();
        state.status = ScanStatus::Scanning;

        if state.total_pages == 0 {
            info!("Scan {} found no pages in scope, completing empty", scan_id);
            return self.finish_completed(&seed, state, created_at, crawl.stats).await;
        }

        let pool = WorkerPool::new(
            WorkerPoolConfig::from_engine(&self.config),
            Arc::new(PageScanExecutor::new(Arc::clone(&self.http_client))),
        );

        let mut results: FuturesUnordered<_> = crawl
            .pages
            .iter()
            .enumerate()
            .map(|(index, page)| pool.submit(ScanTask::for_page(scan_id, index, page.clone())))
            .collect();

        while let Some(result) = results.next().await {
            if cancel.load(Ordering::Relaxed) {
                drop(results);
                pool.shutdown(SHUTDOWN_DRAIN).await;
                return Err(ScanEngineError::Internal("scan cancelled".to_string()));
            }

            match result.outcome {
                Ok(outcome) => {
                    state.pages_scanned += 1;
                    state.forms_found += outcome.forms_found;
                    state.endpoints_tested += outcome.endpoints_tested;
                    state.findings.extend(outcome.findings);
                    state.vulnerabilities_found = state.findings.len();
                }
                Err(e) => {
                    // A failed page contributes zero findings but still
                    // counts as scanned; the scan itself never fails here.
                    warn!("Task {} failed: {}", result.task_id, e);
                    state.pages_scanned += 1;
                }
            }

            if state.pages_scanned > state.total_pages {
                error!(
                    "Counter invariant violated: pages_scanned {} > total_pages {}",
                    state.pages_scanned, state.total_pages
                );
                debug_assert!(state.pages_scanned <= state.total_pages);
                state.pages_scanned = state.total_pages;
            }

            // 100 is reserved for the completed event that follows.
            let progress = scan_progress(state.pages_scanned, state.total_pages).min(99);
            self.bus
                .publish_progress(scan_id, self.snapshot(&state, progress, SCAN_STAGE, false));
        }

        pool.shutdown(SHUTDOWN_DRAIN).await;

        self.finish_completed(&seed, state, created_at, crawl.stats).await
    }

    async fn finish_completed(
        &self,
        seed: &str,
        mut state: ScanState,
        created_at: String,
        crawl_stats: CrawlStats,
    ) -> Result<ScanRecord, ScanEngineError> {
        state.status = ScanStatus::Completed;
        self.bus.publish_progress(
            &state.scan_id.clone(),
            self.snapshot(&state, 100, "Completed", true),
        );

        let record = ScanRecord {
            id: state.scan_id.clone(),
            url: seed.to_string(),
            status: state.status,
            vulnerabilities: state.findings.clone(),
            pages_scanned: state.pages_scanned,
            forms_found: state.forms_found,
            endpoints_tested: state.endpoints_tested,
            crawl_stats,
            created_at,
            completed_at: Some(chrono::Utc::now().to_rfc3339()),
        };

        self.store
            .save(&record)
            .await
            .map_err(|e| ScanEngineError::Internal(format!("failed to persist scan: {}", e)))?;

        Ok(record)
    }

    async fn finish_failed(
        &self,
        scan_id: &str,
        seed: &str,
        mut state: ScanState,
        created_at: String,
        reason: String,
    ) -> Result<ScanRecord, ScanEngineError> {
        state.status = ScanStatus::Failed;
        state.findings.push(Finding::new(
            "Scan Failed",
            FindingCategory::InformationDisclosure,
            Severity::Low,
            "Unable to scan the target".to_string(),
            seed.to_string(),
            "The target could not be reached, so its security posture is unknown.",
        ));
        state.vulnerabilities_found = state.findings.len();

        self.bus.publish_error(scan_id, reason);
        self.bus
            .publish_progress(scan_id, self.snapshot(&state, 0, "Failed", true));

        let record = ScanRecord {
            id: state.scan_id.clone(),
            url: seed.to_string(),
            status: state.status,
            vulnerabilities: state.findings.clone(),
            pages_scanned: 0,
            forms_found: 0,
            endpoints_tested: 0,
            crawl_stats: CrawlStats::default(),
            created_at,
            completed_at: Some(chrono::Utc::now().to_rfc3339()),
        };

        self.store
            .save(&record)
            .await
            .map_err(|e| ScanEngineError::Internal(format!("failed to persist scan: {}", e)))?;

        Ok(record)
    }

    fn snapshot(
        &self,
        state: &ScanState,
        progress: u8,
        stage: &str,
        include_findings: bool,
    ) -> ProgressEvent {
        snapshot_of(state, progress, stage, include_findings)
    }
}

fn snapshot_of(
    state: &ScanState,
    progress: u8,
    stage: &str,
    include_findings: bool,
) -> ProgressEvent {
    ProgressEvent {
        scan_id: state.scan_id.clone(),
        status: state.status,
        progress,
        pages_scanned: state.pages_scanned,
        total_pages: state.total_pages,
        vulnerabilities_found: state.vulnerabilities_found,
        forms_found: state.forms_found,
        endpoints_tested: state.endpoints_tested,
        estimated_time_remaining: estimate_remaining(state, progress),
        start_time: state.start_time.to_rfc3339(),
        current_stage: stage.to_string(),
        vulnerabilities: include_findings.then(|| state.findings.clone()),
    }
}

/// The crawl phase owns a fixed 30% of the progress bar.
fn crawl_progress(pages_found: usize) -> u8 {
    ((pages_found as f64 / pages_found.max(1) as f64) * 30.0).round() as u8
}

/// The scan phase owns the remaining 70%; 100 only when every page settled.
fn scan_progress(pages_scanned: usize, total_pages: usize) -> u8 {
    debug_assert!(total_pages > 0);
    30 + ((pages_scanned as f64 / total_pages as f64) * 70.0).round() as u8
}

fn estimate_remaining(state: &ScanState, progress: u8) -> Option<u64> {
    if progress == 0 || progress >= 100 {
        return None;
    }
    let elapsed = (chrono::Utc::now() - state.start_time)
        .to_std()
        .unwrap_or_default()
        .as_secs_f64();
    let remaining = elapsed / f64::from(progress) * f64::from(100 - progress);
    Some(remaining.round() as u64)
}
