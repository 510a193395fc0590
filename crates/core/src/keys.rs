// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination-store key schema.
//!
//! ```text
//! trajectory:<id>:jobs:active           integer counter (TTL 7d)
//! trajectory:<id>:jobs:metadata         hash: totalAdded, totalCompleted, totalFailed, firstJobAt, lastJobAt
//! trajectory:<id>:jobs:metadata:queues  set of queue names
//! trajectory:<id>:cleanup:lock          lease token (TTL ~60s)
//! <queue>_queue:status:<jobId>          JSON status blob, owned by the queue
//! job:retries:<jobId>                   retry counter, owned by the queue
//! ```

use crate::trajectory::TrajectoryId;

/// Scan pattern matching every trajectory's active-job counter
pub const COUNTER_PATTERN: &str = "trajectory:*:jobs:active";

const COUNTER_PREFIX: &str = "trajectory:";
const COUNTER_SUFFIX: &str = ":jobs:active";

/// Metadata hash fields
pub mod fields {
    pub const TOTAL_ADDED: &str = "totalAdded";
    pub const TOTAL_COMPLETED: &str = "totalCompleted";
    pub const TOTAL_FAILED: &str = "totalFailed";
    pub const FIRST_JOB_AT: &str = "firstJobAt";
    pub const LAST_JOB_AT: &str = "lastJobAt";
}

/// Keys owned by the tracker for one trajectory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobKeys {
    pub counter: String,
    pub metadata: String,
    pub queues: String,
    pub cleanup_lock: String,
}

impl JobKeys {
    pub fn new(trajectory_id: &TrajectoryId) -> Self {
        let base = format!("trajectory:{trajectory_id}");
        Self {
            counter: format!("{base}:jobs:active"),
            metadata: format!("{base}:jobs:metadata"),
            queues: format!("{base}:jobs:metadata:queues"),
            cleanup_lock: format!("{base}:cleanup:lock"),
        }
    }

    /// Counter and metadata keys, deleted together once a trajectory is cleaned
    pub fn tracking(&self) -> Vec<String> {
        vec![self.counter.clone(), self.metadata.clone(), self.queues.clone()]
    }
}

/// Recover the trajectory id from a counter key
pub fn parse_counter_key(key: &str) -> Option<&str> {
    let id = key.strip_prefix(COUNTER_PREFIX)?.strip_suffix(COUNTER_SUFFIX)?;
    (!id.is_empty() && !id.contains(':')).then_some(id)
}

/// Scan pattern for every status key of a queue
pub fn queue_status_pattern(queue: &str) -> String {
    format!("{queue}_queue:status:*")
}

pub fn queue_status_key(queue: &str, job_id: &str) -> String {
    format!("{queue}_queue:status:{job_id}")
}

pub fn job_retries_key(job_id: &str) -> String {
    format!("job:retries:{job_id}")
}

#[cfg(test)]
#[path = "keys_tests.rs"]
mod tests;
