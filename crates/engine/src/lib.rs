// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dx-engine: decides when a trajectory's jobs are truly finished and runs
//! its artifact cleanup exactly once across any number of worker processes.

mod config;
mod error;
mod lease;
mod scanner;
mod tracker;

pub use config::{
    TrackerConfig, ADMIN_LOCK_TTL, ANALYSIS_QUEUE, COUNTER_TTL, DEFAULT_QUEUES, LOCK_TTL, SCAN_BATCH,
};
pub use error::TrackerError;
pub use lease::CleanupLease;
pub use scanner::{analysis_ids, QueueScanner};
pub use tracker::{ClearOutcome, JobTracker, TrackerDeps};
