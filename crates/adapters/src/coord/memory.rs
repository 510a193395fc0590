// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process coordination store.
//!
//! Every operation runs under one lock, which gives the same linearizable
//! behavior as scripted execution on a single server. Used for tests and for
//! running without a coordination server. Expiry is evaluated lazily
//! against the injected clock.

use super::{CoordinationError, CoordinationStore, CounterTransition};
use async_trait::async_trait;
use dx_core::keys::fields;
use dx_core::{Clock, JobKeys, JobOutcome, SystemClock};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Hash(HashMap<String, String>),
    Set(BTreeSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at_ms: Option<u64>,
}

#[derive(Default)]
struct MemoryState {
    entries: HashMap<String, Entry>,
}

fn wrong_type(key: &str) -> CoordinationError {
    CoordinationError::Backend(format!("WRONGTYPE operation against key {key}"))
}

impl MemoryState {
    /// Drop `key` if expired, then return it
    fn live(&mut self, key: &str, now_ms: u64) -> Option<&mut Entry> {
        let expired = self
            .entries
            .get(key)
            .and_then(|e| e.expires_at_ms)
            .is_some_and(|at| at <= now_ms);
        if expired {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    fn purge_expired(&mut self, now_ms: u64) {
        self.entries.retain(|_, e| e.expires_at_ms.map_or(true, |at| at > now_ms));
    }

    fn get_str(&mut self, key: &str, now_ms: u64) -> Result<Option<String>, CoordinationError> {
        match self.live(key, now_ms) {
            None => Ok(None),
            Some(Entry { value: Value::Str(s), .. }) => Ok(Some(s.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    fn get_int(&mut self, key: &str, now_ms: u64) -> Result<Option<i64>, CoordinationError> {
        self.get_str(key, now_ms)?
            .map(|value| {
                value
                    .parse::<i64>()
                    .map_err(|_| CoordinationError::InvalidValue { key: key.to_string(), value })
            })
            .transpose()
    }

    /// `INCRBY` semantics: a missing key starts at 0 and keeps no expiry
    fn incr_by(&mut self, key: &str, delta: i64, now_ms: u64) -> Result<i64, CoordinationError> {
        let next = self.get_int(key, now_ms)?.unwrap_or(0) + delta;
        match self.entries.get_mut(key) {
            Some(entry) => entry.value = Value::Str(next.to_string()),
            None => {
                self.entries.insert(
                    key.to_string(),
                    Entry { value: Value::Str(next.to_string()), expires_at_ms: None },
                );
            }
        }
        Ok(next)
    }

    fn hash_mut(&mut self, key: &str, now_ms: u64) -> Result<&mut HashMap<String, String>, CoordinationError> {
        if self.live(key, now_ms).is_none() {
            self.entries
                .insert(key.to_string(), Entry { value: Value::Hash(HashMap::new()), expires_at_ms: None });
        }
        match self.entries.get_mut(key) {
            Some(Entry { value: Value::Hash(hash), .. }) => Ok(hash),
            _ => Err(wrong_type(key)),
        }
    }

    fn hash_incr(&mut self, key: &str, field: &str, now_ms: u64) -> Result<(), CoordinationError> {
        let hash = self.hash_mut(key, now_ms)?;
        let current = match hash.get(field) {
            Some(v) => v.parse::<i64>().map_err(|_| CoordinationError::InvalidValue {
                key: format!("{key}.{field}"),
                value: v.clone(),
            })?,
            None => 0,
        };
        hash.insert(field.to_string(), (current + 1).to_string());
        Ok(())
    }

    fn set_add(&mut self, key: &str, member: &str, now_ms: u64) -> Result<(), CoordinationError> {
        if self.live(key, now_ms).is_none() {
            self.entries
                .insert(key.to_string(), Entry { value: Value::Set(BTreeSet::new()), expires_at_ms: None });
        }
        match self.entries.get_mut(key) {
            Some(Entry { value: Value::Set(set), .. }) => {
                set.insert(member.to_string());
                Ok(())
            }
            _ => Err(wrong_type(key)),
        }
    }

    fn expire(&mut self, key: &str, at_ms: u64) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.expires_at_ms = Some(at_ms);
        }
    }
}

#[derive(Clone)]
pub struct MemoryCoordinationStore<C: Clock = SystemClock> {
    inner: Arc<Mutex<MemoryState>>,
    clock: C,
}

impl MemoryCoordinationStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryCoordinationStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryCoordinationStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { inner: Arc::new(Mutex::new(MemoryState::default())), clock }
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = self.clock.epoch_ms();
        let mut state = self.inner.lock();
        state.purge_expired(now);
        state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining time to live of `key`, if it exists and has one
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = self.clock.epoch_ms();
        let mut state = self.inner.lock();
        let at = state.live(key, now)?.expires_at_ms?;
        Some(Duration::from_millis(at.saturating_sub(now)))
    }
}

#[async_trait]
impl<C: Clock> CoordinationStore for MemoryCoordinationStore<C> {
    async fn increment_jobs(
        &self,
        keys: &JobKeys,
        queue: &str,
        now_ms: u64,
        ttl: Duration,
    ) -> Result<i64, CoordinationError> {
        let now = self.clock.epoch_ms();
        let expires = self.clock.expiry_after(ttl);
        let stamp = now_ms.to_string();
        let mut state = self.inner.lock();

        let count = state.incr_by(&keys.counter, 1, now)?;
        state.expire(&keys.counter, expires);

        state.hash_incr(&keys.metadata, fields::TOTAL_ADDED, now)?;
        let hash = state.hash_mut(&keys.metadata, now)?;
        hash.insert(fields::LAST_JOB_AT.to_string(), stamp.clone());
        if count == 1 {
            hash.entry(fields::FIRST_JOB_AT.to_string()).or_insert(stamp);
        }
        state.expire(&keys.metadata, expires);

        state.set_add(&keys.queues, queue, now)?;
        state.expire(&keys.queues, expires);
        Ok(count)
    }

    async fn decrement_jobs(
        &self,
        keys: &JobKeys,
        outcome: JobOutcome,
        now_ms: u64,
        ttl: Duration,
    ) -> Result<CounterTransition, CoordinationError> {
        let now = self.clock.epoch_ms();
        let expires = self.clock.expiry_after(ttl);
        let field = match outcome {
            JobOutcome::Completed => fields::TOTAL_COMPLETED,
            JobOutcome::Failed => fields::TOTAL_FAILED,
        };
        let mut state = self.inner.lock();

        let before = state.get_int(&keys.counter, now)?.unwrap_or(0);
        let after = state.incr_by(&keys.counter, -1, now)?;
        state.expire(&keys.counter, expires);

        state.hash_incr(&keys.metadata, field, now)?;
        state
            .hash_mut(&keys.metadata, now)?
            .insert(fields::LAST_JOB_AT.to_string(), now_ms.to_string());
        state.expire(&keys.metadata, expires);
        Ok(CounterTransition { before, after })
    }

    async fn set_counter(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CoordinationError> {
        let expires_at_ms = Some(self.clock.expiry_after(ttl));
        self.inner
            .lock()
            .entries
            .insert(key.to_string(), Entry { value: Value::Str(value.to_string()), expires_at_ms });
        Ok(())
    }

    async fn get_counter(&self, key: &str) -> Result<Option<i64>, CoordinationError> {
        let now = self.clock.epoch_ms();
        self.inner.lock().get_int(key, now)
    }

    async fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, CoordinationError> {
        let now = self.clock.epoch_ms();
        let mut state = self.inner.lock();
        if state.live(key, now).is_some() {
            return Ok(false);
        }
        state.entries.insert(
            key.to_string(),
            Entry { value: Value::Str(token.to_string()), expires_at_ms: Some(self.clock.expiry_after(ttl)) },
        );
        Ok(true)
    }

    async fn release(&self, key: &str, token: &str) -> Result<bool, CoordinationError> {
        let now = self.clock.epoch_ms();
        let mut state = self.inner.lock();
        let owned = matches!(state.live(key, now), Some(Entry { value: Value::Str(v), .. }) if *v == token);
        if owned {
            state.entries.remove(key);
        }
        Ok(owned)
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, CoordinationError> {
        let matcher = glob::Pattern::new(pattern)
            .map_err(|e| CoordinationError::Backend(format!("bad scan pattern {pattern:?}: {e}")))?;
        let now = self.clock.epoch_ms();
        let mut state = self.inner.lock();
        state.purge_expired(now);
        let mut keys: Vec<String> = state.entries.keys().filter(|k| matcher.matches(k)).cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, CoordinationError> {
        let now = self.clock.epoch_ms();
        let mut state = self.inner.lock();
        // MGET reports non-string keys as missing
        Ok(keys
            .iter()
            .map(|k| match state.live(k, now) {
                Some(Entry { value: Value::Str(s), .. }) => Some(s.clone()),
                _ => None,
            })
            .collect())
    }

    async fn set_value(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CoordinationError> {
        let expires_at_ms = ttl.map(|ttl| self.clock.expiry_after(ttl));
        self.inner
            .lock()
            .entries
            .insert(key.to_string(), Entry { value: Value::Str(value.to_string()), expires_at_ms });
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CoordinationError> {
        let now = self.clock.epoch_ms();
        let mut state = self.inner.lock();
        let mut removed = 0;
        for key in keys {
            if state.live(key, now).is_some() {
                state.entries.remove(key);
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, CoordinationError> {
        let now = self.clock.epoch_ms();
        match self.inner.lock().live(key, now) {
            None => Ok(HashMap::new()),
            Some(Entry { value: Value::Hash(hash), .. }) => Ok(hash.clone()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CoordinationError> {
        let now = self.clock.epoch_ms();
        match self.inner.lock().live(key, now) {
            None => Ok(Vec::new()),
            Some(Entry { value: Value::Set(set), .. }) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(wrong_type(key)),
        }
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
