// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SecureScan Storage Interface
 * Persistence contract for scan records; storage itself is an external
 * collaborator
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

use crate::types::ScanRecord;

/// Where finished (and failed) scans go. The production implementation
/// lives in the front-end service; the engine only depends on this trait.
#[async_trait]
pub trait ScanStore: Send + Sync {
    async fn save(&self, record: &ScanRecord) -> Result<()>;
    async fn get(&self, scan_id: &str) -> Result<Option<ScanRecord>>;
}

/// Map-backed store used by the CLI and the test suite.
#[derive(Default)]
pub struct InMemoryScanStore {
    records: RwLock<HashMap<String, ScanRecord>>,
}

impl InMemoryScanStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScanStore for InMemoryScanStore {
    async fn save(&self, record: &ScanRecord) -> Result<()> {
        info!(
            "Storing scan {} ({}, {} vulnerabilities)",
            record.id,
            record.status,
            record.vulnerabilities.len()
        );
        self.records
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, scan_id: &str) -> Result<Option<ScanRecord>> {
        Ok(self.records.read().await.get(scan_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CrawlStats, ScanStatus};

    #[tokio::test]
    async fn test_save_and_get_round_trip() {
        let store = InMemoryScanStore::new();
        let record = ScanRecord {
            id: "scan-1".to_string(),
            url: "https://example.com/".to_string(),
            status: ScanStatus::Completed,
            vulnerabilities: vec![],
            pages_scanned: 3,
            forms_found: 1,
            endpoints_tested: 40,
            crawl_stats: CrawlStats::default(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            completed_at: Some("2026-01-01T00:01:00Z".to_string()),
        };

        store.save(&record).await.unwrap();
        let loaded = store.get("scan-1").await.unwrap().unwrap();
        assert_eq!(loaded.pages_scanned, 3);
        assert_eq!(loaded.status, ScanStatus::Completed);
        assert!(store.get("missing").await.unwrap().is_none());
    }
}
