// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

/// Safety-net expiry for counters and metadata of abandoned trajectories
pub const COUNTER_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Lease held while verifying and cleaning a trajectory
pub const LOCK_TTL: Duration = Duration::from_secs(60);

/// Lease held by administrative history operations
pub const ADMIN_LOCK_TTL: Duration = Duration::from_secs(120);

/// Status keys fetched per round trip while scanning
pub const SCAN_BATCH: usize = 100;

/// Queue whose job ids are `<analysisId>-<frameIndex>`
pub const ANALYSIS_QUEUE: &str = "analysis-processing";

pub const DEFAULT_QUEUES: [&str; 4] =
    ["trajectory-processing", ANALYSIS_QUEUE, "rasterizer", "cloud-upload"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Queue namespaces scanned during verification
    pub queues: Vec<String>,
    pub counter_ttl: Duration,
    pub lock_ttl: Duration,
    pub admin_lock_ttl: Duration,
    pub scan_batch: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            queues: DEFAULT_QUEUES.iter().map(|q| q.to_string()).collect(),
            counter_ttl: COUNTER_TTL,
            lock_ttl: LOCK_TTL,
            admin_lock_ttl: ADMIN_LOCK_TTL,
            scan_batch: SCAN_BATCH,
        }
    }
}

impl TrackerConfig {
    pub fn queues<I, Q>(mut self, queues: I) -> Self
    where
        I: IntoIterator<Item = Q>,
        Q: Into<String>,
    {
        self.queues = queues.into_iter().map(Into::into).collect();
        self
    }

    pub fn lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl;
        self
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
