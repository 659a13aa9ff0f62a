// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SecureScan Core Types
 * Shared data model for the scan engine: pages, tasks, findings, scan state
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::TaskError;

/// A crawled page: canonical URL plus everything the detectors need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Canonical absolute URL (lowercase scheme/host, default port and
    /// fragment removed, query preserved verbatim).
    pub url: String,
    pub title: String,
    /// Crawl depth, seed = 0.
    pub depth: usize,
    /// In-scope outbound links, deduplicated, first occurrence order.
    pub links: Vec<String>,
    pub forms: Vec<Form>,
}

/// Form discovered on a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form {
    /// Absolute URL, resolved against the page URL; defaults to the page URL.
    pub action: String,
    /// Upper-cased; coerced to GET for anything that is not POST.
    pub method: String,
    /// Only inputs with a non-empty name attribute.
    pub inputs: Vec<FormInput>,
}

impl Form {
    pub fn is_post(&self) -> bool {
        self.method == "POST"
    }

    /// Inputs an active detector can fuzz (everything except hidden fields).
    pub fn fuzzable_inputs(&self) -> impl Iterator<Item = &FormInput> {
        self.inputs.iter().filter(|i| i.input_type != "hidden")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormInput {
    pub name: String,
    /// Lower-cased type attribute; missing means "text".
    #[serde(rename = "type")]
    pub input_type: String,
    pub required: bool,
    pub value: Option<String>,
}

/// Work unit handed to the worker pool. One per crawled page.
#[derive(Debug, Clone)]
pub struct ScanTask {
    /// Globally unique; `"<scan_id>::page-<index>"` for scan tasks.
    pub task_id: String,
    pub scan_id: String,
    pub kind: TaskKind,
    pub page: Option<Page>,
    pub priority: i64,
}

impl ScanTask {
    pub fn for_page(scan_id: &str, index: usize, page: Page) -> Self {
        Self {
            task_id: format!("{}::page-{}", scan_id, index),
            scan_id: scan_id.to_string(),
            kind: TaskKind::Scan,
            page: Some(page),
            priority: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Scan,
    Init,
}

/// What one completed task produced.
#[derive(Debug, Clone, Default)]
pub struct TaskOutcome {
    pub findings: Vec<Finding>,
    pub forms_found: usize,
    pub endpoints_tested: usize,
    pub page_url: String,
}

/// Result of one task, created by a worker, consumed once by the coordinator.
#[derive(Debug)]
pub struct WorkerResult {
    pub task_id: String,
    /// None when the task never reached a worker (queue rejection).
    pub worker_id: Option<usize>,
    pub outcome: Result<TaskOutcome, TaskError>,
}

/// A single reported vulnerability instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub id: String,
    pub name: String,
    pub category: FindingCategory,
    pub severity: Severity,
    pub description: String,
    /// Typically `"<METHOD> <url>"` or `"HTTP Headers"`.
    pub location: String,
    pub impact: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

impl Finding {
    pub fn new(
        name: &str,
        category: FindingCategory,
        severity: Severity,
        description: String,
        location: String,
        impact: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            category,
            severity,
            description,
            location,
            impact: impact.to_string(),
            parameter: None,
        }
    }

    pub fn with_parameter(mut self, parameter: &str) -> Self {
        self.parameter = Some(parameter.to_string());
        self
    }

    /// Identity used for de-duplication within a page's results.
    pub fn dedup_key(&self) -> (String, String, Option<String>) {
        (self.name.clone(), self.location.clone(), self.parameter.clone())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FindingCategory {
    #[serde(rename = "SQL Injection")]
    SqlInjection,
    #[serde(rename = "XSS")]
    Xss,
    #[serde(rename = "CSRF")]
    Csrf,
    #[serde(rename = "API Issues")]
    ApiIssues,
    #[serde(rename = "Load Testing")]
    LoadTesting,
    #[serde(rename = "Information Disclosure")]
    InformationDisclosure,
}

impl std::fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FindingCategory::SqlInjection => write!(f, "SQL Injection"),
            FindingCategory::Xss => write!(f, "XSS"),
            FindingCategory::Csrf => write!(f, "CSRF"),
            FindingCategory::ApiIssues => write!(f, "API Issues"),
            FindingCategory::LoadTesting => write!(f, "Load Testing"),
            FindingCategory::InformationDisclosure => write!(f, "Information Disclosure"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "Critical"),
            Severity::High => write!(f, "High"),
            Severity::Medium => write!(f, "Medium"),
            Severity::Low => write!(f, "Low"),
        }
    }
}

/// Scan lifecycle. Monotonic except that `Failed` is terminal and only
/// reachable from the crawl phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Crawling,
    Scanning,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Pending => "pending",
            ScanStatus::Crawling => "crawling",
            ScanStatus::Scanning => "scanning",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Live state of one scan. Owned and written exclusively by the coordinator.
#[derive(Debug, Clone)]
pub struct ScanState {
    pub scan_id: String,
    pub status: ScanStatus,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub total_pages: usize,
    pub pages_scanned: usize,
    pub forms_found: usize,
    pub endpoints_tested: usize,
    pub vulnerabilities_found: usize,
    pub findings: Vec<Finding>,
}

impl ScanState {
    pub fn new(scan_id: &str) -> Self {
        Self {
            scan_id: scan_id.to_string(),
            status: ScanStatus::Pending,
            start_time: chrono::Utc::now(),
            total_pages: 0,
            pages_scanned: 0,
            forms_found: 0,
            endpoints_tested: 0,
            vulnerabilities_found: 0,
            findings: Vec::new(),
        }
    }
}

/// Snapshot published on the progress bus. Mirrors the `scan-progress`
/// WebSocket payload consumed by the front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub scan_id: String,
    pub status: ScanStatus,
    pub progress: u8,
    pub pages_scanned: usize,
    pub total_pages: usize,
    pub vulnerabilities_found: usize,
    pub forms_found: usize,
    pub endpoints_tested: usize,
    /// Whole seconds; None until progress allows an estimate.
    pub estimated_time_remaining: Option<u64>,
    pub start_time: String,
    pub current_stage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vulnerabilities: Option<Vec<Finding>>,
}

/// Mirrors the `scan-error` WebSocket payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanErrorEvent {
    pub scan_id: String,
    pub message: String,
}

/// Event envelope delivered to progress bus subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ScanEvent {
    ScanProgress(ProgressEvent),
    ScanError(ScanErrorEvent),
}

/// Crawl summary persisted with the scan record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlStats {
    pub total_pages: usize,
    pub total_forms: usize,
    pub total_links: usize,
    pub visited_urls: usize,
    pub max_depth_reached: usize,
}

/// The persisted scan record, as the storage collaborator expects it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub id: String,
    pub url: String,
    pub status: ScanStatus,
    pub vulnerabilities: Vec<Finding>,
    pub pages_scanned: usize,
    pub forms_found: usize,
    pub endpoints_tested: usize,
    pub crawl_stats: CrawlStats,
    pub created_at: String,
    pub completed_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finding_serializes_display_category_names() {
        let finding = Finding::new(
            "SQL Injection",
            FindingCategory::SqlInjection,
            Severity::Critical,
            "desc".to_string(),
            "GET http://example.com/item?id=1".to_string(),
            "impact",
        );
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["category"], "SQL Injection");
        assert_eq!(json["severity"], "Critical");
    }

    #[test]
    fn test_scan_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(ScanStatus::Completed).unwrap(),
            serde_json::json!("completed")
        );
        assert_eq!(ScanStatus::Failed.as_str(), "failed");
    }

    #[test]
    fn test_scan_task_id_convention() {
        let page = Page {
            url: "http://example.com/".to_string(),
            title: String::new(),
            depth: 0,
            links: vec![],
            forms: vec![],
        };
        let task = ScanTask::for_page("abc123", 4, page);
        assert_eq!(task.task_id, "abc123::page-4");
        assert_eq!(task.priority, 1);
        assert_eq!(task.kind, TaskKind::Scan);
    }

    #[test]
    fn test_fuzzable_inputs_skip_hidden() {
        let form = Form {
            action: "http://example.com/save".to_string(),
            method: "POST".to_string(),
            inputs: vec![
                FormInput {
                    name: "q".to_string(),
                    input_type: "text".to_string(),
                    required: false,
                    value: None,
                },
                FormInput {
                    name: "csrf_token".to_string(),
                    input_type: "hidden".to_string(),
                    required: false,
                    value: Some("abc".to_string()),
                },
            ],
        };
        let names: Vec<&str> = form.fuzzable_inputs().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["q"]);
    }

    #[test]
    fn test_progress_event_uses_camel_case() {
        let event = ProgressEvent {
            scan_id: "s1".to_string(),
            status: ScanStatus::Scanning,
            progress: 44,
            pages_scanned: 2,
            total_pages: 10,
            vulnerabilities_found: 0,
            forms_found: 1,
            endpoints_tested: 12,
            estimated_time_remaining: Some(30),
            start_time: "2026-01-01T00:00:00Z".to_string(),
            current_stage: "Scanning pages".to_string(),
            vulnerabilities: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["scanId"], "s1");
        assert_eq!(json["pagesScanned"], 2);
        assert_eq!(json["estimatedTimeRemaining"], 30);
        assert!(json.get("vulnerabilities").is_none());
    }
}
