// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SecureScan Progress Bus
 * Per-scan fan-out of progress events to subscribed observers
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::types::{ProgressEvent, ScanErrorEvent, ScanEvent};

/// A live subscription to one scan's event stream. Dropping the receiver
/// ends delivery; `unsubscribe` removes it eagerly.
pub struct Subscription {
    pub id: u64,
    pub receiver: mpsc::UnboundedReceiver<ScanEvent>,
}

struct ScanChannel {
    subscribers: Vec<(u64, mpsc::UnboundedSender<ScanEvent>)>,
    /// Latest progress snapshot, replayed to late joiners.
    latest: Option<ProgressEvent>,
}

/// Best-effort, at-least-once fan-out of scan events. A subscriber joining
/// mid-scan immediately receives the cached latest progress event; there is
/// no deeper history. Publishing is synchronous and never blocks on slow
/// subscribers.
#[derive(Default)]
pub struct ProgressBus {
    channels: Mutex<HashMap<String, ScanChannel>>,
    next_subscriber_id: Mutex<u64>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, scan_id: &str) -> Subscription {
        let id = {
            let mut next = self.next_subscriber_id.lock().expect("bus id lock");
            *next += 1;
            *next
        };

        let (tx, rx) = mpsc::unbounded_channel();

        let mut channels = self.channels.lock().expect("bus lock");
        let channel = channels.entry(scan_id.to_string()).or_insert_with(|| ScanChannel {
            subscribers: Vec::new(),
            latest: None,
        });

        if let Some(latest) = &channel.latest {
            let _ = tx.send(ScanEvent::ScanProgress(latest.clone()));
        }
        channel.subscribers.push((id, tx));

        debug!("Subscriber {} joined scan {}", id, scan_id);
        Subscription { id, receiver: rx }
    }

    pub fn unsubscribe(&self, scan_id: &str, subscriber_id: u64) {
        let mut channels = self.channels.lock().expect("bus lock");
        if let Some(channel) = channels.get_mut(scan_id) {
            channel.subscribers.retain(|(id, _)| *id != subscriber_id);
        }
    }

    /// Publish a progress snapshot; it also becomes the cached latest event.
    pub fn publish_progress(&self, scan_id: &str, event: ProgressEvent) {
        let mut channels = self.channels.lock().expect("bus lock");
        let channel = channels.entry(scan_id.to_string()).or_insert_with(|| ScanChannel {
            subscribers: Vec::new(),
            latest: None,
        });
        channel.latest = Some(event.clone());
        Self::fanout(channel, ScanEvent::ScanProgress(event));
    }

    pub fn publish_error(&self, scan_id: &str, message: String) {
        let mut channels = self.channels.lock().expect("bus lock");
        let channel = channels.entry(scan_id.to_string()).or_insert_with(|| ScanChannel {
            subscribers: Vec::new(),
            latest: None,
        });
        Self::fanout(
            channel,
            ScanEvent::ScanError(ScanErrorEvent {
                scan_id: scan_id.to_string(),
                message,
            }),
        );
    }

    /// Latest cached progress for a scan, if any event was ever published.
    pub fn latest(&self, scan_id: &str) -> Option<ProgressEvent> {
        let channels = self.channels.lock().expect("bus lock");
        channels.get(scan_id).and_then(|c| c.latest.clone())
    }

    /// Drop a scan's channel after its final result has been delivered.
    pub fn remove_scan(&self, scan_id: &str) {
        let mut channels = self.channels.lock().expect("bus lock");
        channels.remove(scan_id);
    }

    fn fanout(channel: &mut ScanChannel, event: ScanEvent) {
        // Disconnected subscribers are pruned as they are discovered.
        channel
            .subscribers
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }
}
