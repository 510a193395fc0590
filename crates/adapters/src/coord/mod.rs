// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination store adapter.
//!
//! A shared key-value store with TTLs, hashes, sets, pattern scans, and
//! server-side atomic scripts. Counter mutations must be single indivisible
//! operations relative to every other mutator of the same keys.

mod memory;
mod redis_store;

pub use memory::MemoryCoordinationStore;
pub use redis_store::RedisCoordinationStore;

use async_trait::async_trait;
use dx_core::{JobKeys, JobOutcome};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Errors from coordination store operations
#[derive(Debug, Error)]
pub enum CoordinationError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("key {key} holds unexpected value {value:?}")]
    InvalidValue { key: String, value: String },
    #[error("coordination backend error: {0}")]
    Backend(String),
}

/// Counter values observed by one atomic decrement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterTransition {
    /// Value before the decrement; a missing key reads as 0
    pub before: i64,
    pub after: i64,
}

impl CounterTransition {
    /// Whether this decrement drained the counter
    pub fn reached_zero(&self) -> bool {
        self.after <= 0
    }
}

#[async_trait]
pub trait CoordinationStore: Clone + Send + Sync + 'static {
    /// Atomically bump the active counter and record the job in the
    /// metadata hash and queue set. Returns the new counter value.
    ///
    /// All three keys get `ttl`; `firstJobAt` is only written when the
    /// counter transitions to 1 and the field is unset.
    async fn increment_jobs(
        &self,
        keys: &JobKeys,
        queue: &str,
        now_ms: u64,
        ttl: Duration,
    ) -> Result<i64, CoordinationError>;

    /// Atomically read, decrement, and tally the outcome in one step
    async fn decrement_jobs(
        &self,
        keys: &JobKeys,
        outcome: JobOutcome,
        now_ms: u64,
        ttl: Duration,
    ) -> Result<CounterTransition, CoordinationError>;

    /// Overwrite an integer counter with a fresh TTL
    async fn set_counter(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CoordinationError>;

    async fn get_counter(&self, key: &str) -> Result<Option<i64>, CoordinationError>;

    /// Create `key = token` with expiry only if `key` does not exist
    async fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, CoordinationError>;

    /// Delete `key` only if it still holds `token`
    async fn release(&self, key: &str, token: &str) -> Result<bool, CoordinationError>;

    /// Every key matching a glob-style pattern
    async fn scan(&self, pattern: &str) -> Result<Vec<String>, CoordinationError>;

    /// String values for `keys`, positionally; missing keys are `None`
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, CoordinationError>;

    async fn set_value(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CoordinationError>;

    /// Delete keys, returning how many existed
    async fn delete(&self, keys: &[String]) -> Result<u64, CoordinationError>;

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, CoordinationError>;

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CoordinationError>;
}

/// Whole seconds for `EXPIRE`, at least one
pub(crate) fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

/// Whole milliseconds for `PX`, at least one
pub(crate) fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
