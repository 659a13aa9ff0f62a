// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SecureScan Request Rate Limiter
 * Global minimum spacing between outgoing HTTP requests
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum delay between consecutive HTTP dispatches. Shared by
/// every request the engine sends, so the crawler and the detectors are
/// throttled by the same clock.
pub struct RequestRateLimiter {
    min_delay: Duration,
    // Held across the spacing sleep: waiters queue up and each one claims
    // its own slot, so two requests can never share a window.
    last_dispatch: Mutex<Option<Instant>>,
}

impl RequestRateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_dispatch: Mutex::new(None),
        }
    }

    /// Wait until the next request slot opens, then claim it.
    pub async fn wait_for_slot(&self) {
        if self.min_delay.is_zero() {
            return;
        }

        let mut last = self.last_dispatch.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_delay {
                tokio::time::sleep(self.min_delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}
