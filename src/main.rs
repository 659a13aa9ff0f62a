// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use securescan_scanner::config::EngineConfig;
use securescan_scanner::coordinator::ScanCoordinator;
use securescan_scanner::progress::ProgressBus;
use securescan_scanner::storage::InMemoryScanStore;
use securescan_scanner::types::ScanEvent;

#[derive(Parser, Debug)]
#[command(name = "securescan", about = "SecureScan active web vulnerability scanner")]
struct Args {
    /// Target URL to scan (scheme optional, defaults to https)
    #[arg(long)]
    url: String,

    /// Maximum crawl depth
    #[arg(long)]
    depth: Option<usize>,

    /// Maximum pages to crawl
    #[arg(long)]
    max_pages: Option<usize>,

    /// Worker count for the scan pool
    #[arg(long)]
    workers: Option<usize>,

    /// Print the full scan record as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    println!("SecureScan - Web Application Security Scanner");
    println!("(c) 2026 Bountyy Oy");
    println!();

    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(args))
}

async fn run(args: Args) -> Result<()> {
    let mut config = EngineConfig::from_env();
    if let Some(depth) = args.depth {
        config.max_crawl_depth = depth;
    }
    if let Some(max_pages) = args.max_pages {
        config.max_crawl_pages = max_pages;
    }
    if let Some(workers) = args.workers {
        config.worker_count = workers;
    }

    let bus = Arc::new(ProgressBus::new());
    let store = Arc::new(InMemoryScanStore::new());
    let coordinator = ScanCoordinator::new(config, Arc::clone(&bus), store)?;

    let scan_id = Uuid::new_v4().to_string();
    info!("Starting scan {} against {}", scan_id, args.url);

    // Stream progress lines while the scan runs.
    let mut subscription = bus.subscribe(&scan_id);
    let printer = tokio::spawn(async move {
        while let Some(event) = subscription.receiver.recv().await {
            match event {
                ScanEvent::ScanProgress(progress) => {
                    info!(
                        "[{}] {}% - {} ({}/{} pages, {} findings)",
                        progress.status,
                        progress.progress,
                        progress.current_stage,
                        progress.pages_scanned,
                        progress.total_pages,
                        progress.vulnerabilities_found
                    );
                }
                ScanEvent::ScanError(err) => {
                    info!("[error] {}", err.message);
                }
            }
        }
    });

    let record = coordinator.run_scan(&scan_id, &args.url).await?;
    printer.abort();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!();
    println!(
        "Scan {}: {} - {} pages, {} forms, {} endpoints tested",
        record.id,
        record.status,
        record.pages_scanned,
        record.forms_found,
        record.endpoints_tested
    );
    println!();

    if record.vulnerabilities.is_empty() {
        println!("No vulnerabilities found.");
        return Ok(());
    }

    println!("{} finding(s):", record.vulnerabilities.len());
    for finding in &record.vulnerabilities {
        println!(
            "  [{}] {} ({}) at {}",
            finding.severity, finding.name, finding.category, finding.location
        );
    }

    Ok(())
}
