// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis-backed coordination store.
//!
//! Counter mutations run as `EVAL` scripts so the read-modify-write and the
//! "did we drain" decision happen in one server-side step.

use super::{ttl_millis, ttl_secs, CoordinationError, CoordinationStore, CounterTransition};
use async_trait::async_trait;
use dx_core::keys::fields;
use dx_core::{JobKeys, JobOutcome};
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::time::Duration;

/// KEYS: counter, metadata, queues.
/// ARGV: queue, now_ms, ttl_secs, then the totalAdded, lastJobAt and firstJobAt field names.
const INCREMENT_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
redis.call('EXPIRE', KEYS[1], ARGV[3])
redis.call('HINCRBY', KEYS[2], ARGV[4], 1)
redis.call('HSET', KEYS[2], ARGV[5], ARGV[2])
if count == 1 then
  redis.call('HSETNX', KEYS[2], ARGV[6], ARGV[2])
end
redis.call('EXPIRE', KEYS[2], ARGV[3])
redis.call('SADD', KEYS[3], ARGV[1])
redis.call('EXPIRE', KEYS[3], ARGV[3])
return count
"#;

/// KEYS: counter, metadata. ARGV: outcome field, now_ms, ttl_secs, lastJobAt field.
const DECREMENT_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
local before = 0
if current then
  before = tonumber(current)
end
local after = redis.call('DECR', KEYS[1])
redis.call('EXPIRE', KEYS[1], ARGV[3])
redis.call('HINCRBY', KEYS[2], ARGV[1], 1)
redis.call('HSET', KEYS[2], ARGV[4], ARGV[2])
redis.call('EXPIRE', KEYS[2], ARGV[3])
return {before, after}
"#;

/// KEYS: lease key. ARGV: owner token.
const RELEASE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
  return redis.call('DEL', KEYS[1])
end
return 0
"#;

/// Keys requested per `SCAN` round trip
const SCAN_COUNT: usize = 100;
/// Keys fetched per `MGET`
const MGET_CHUNK: usize = 100;

#[derive(Clone)]
pub struct RedisCoordinationStore {
    conn: ConnectionManager,
    scan_count: usize,
}

impl RedisCoordinationStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379`). The connection
    /// manager reconnects on its own after transient failures.
    pub async fn connect(url: &str) -> Result<Self, CoordinationError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::debug!(url, "connected to coordination store");
        Ok(Self { conn, scan_count: SCAN_COUNT })
    }

    pub fn scan_count(mut self, count: usize) -> Self {
        self.scan_count = count.max(1);
        self
    }
}

fn outcome_field(outcome: JobOutcome) -> &'static str {
    match outcome {
        JobOutcome::Completed => fields::TOTAL_COMPLETED,
        JobOutcome::Failed => fields::TOTAL_FAILED,
    }
}

#[async_trait]
impl CoordinationStore for RedisCoordinationStore {
    async fn increment_jobs(
        &self,
        keys: &JobKeys,
        queue: &str,
        now_ms: u64,
        ttl: Duration,
    ) -> Result<i64, CoordinationError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("EVAL");
        cmd.arg(INCREMENT_SCRIPT)
            .arg(3)
            .arg(&keys.counter)
            .arg(&keys.metadata)
            .arg(&keys.queues)
            .arg(queue)
            .arg(now_ms)
            .arg(ttl_secs(ttl))
            .arg(fields::TOTAL_ADDED)
            .arg(fields::LAST_JOB_AT)
            .arg(fields::FIRST_JOB_AT);
        let count: i64 = cmd.query_async(&mut conn).await?;
        Ok(count)
    }

    async fn decrement_jobs(
        &self,
        keys: &JobKeys,
        outcome: JobOutcome,
        now_ms: u64,
        ttl: Duration,
    ) -> Result<CounterTransition, CoordinationError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("EVAL");
        cmd.arg(DECREMENT_SCRIPT)
            .arg(2)
            .arg(&keys.counter)
            .arg(&keys.metadata)
            .arg(outcome_field(outcome))
            .arg(now_ms)
            .arg(ttl_secs(ttl))
            .arg(fields::LAST_JOB_AT);
        let (before, after): (i64, i64) = cmd.query_async(&mut conn).await?;
        Ok(CounterTransition { before, after })
    }

    async fn set_counter(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CoordinationError> {
        let mut conn = self.conn.clone();
        let () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn get_counter(&self, key: &str) -> Result<Option<i64>, CoordinationError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        raw.map(|value| {
            value
                .parse::<i64>()
                .map_err(|_| CoordinationError::InvalidValue { key: key.to_string(), value })
        })
        .transpose()
    }

    async fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, CoordinationError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn release(&self, key: &str, token: &str) -> Result<bool, CoordinationError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("EVAL");
        cmd.arg(RELEASE_SCRIPT).arg(1).arg(key).arg(token);
        let removed: i64 = cmd.query_async(&mut conn).await?;
        Ok(removed == 1)
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, CoordinationError> {
        let mut conn = self.conn.clone();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(self.scan_count)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        // SCAN may return a key more than once
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, CoordinationError> {
        let mut conn = self.conn.clone();
        let mut values = Vec::with_capacity(keys.len());
        for chunk in keys.chunks(MGET_CHUNK) {
            let batch: Vec<Option<String>> = redis::cmd("MGET").arg(chunk).query_async(&mut conn).await?;
            values.extend(batch);
        }
        Ok(values)
    }

    async fn set_value(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CoordinationError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("EX").arg(ttl_secs(ttl));
        }
        let () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CoordinationError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let removed: u64 = redis::cmd("DEL").arg(keys).query_async(&mut conn).await?;
        Ok(removed)
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, CoordinationError> {
        let mut conn = self.conn.clone();
        let hash: HashMap<String, String> = redis::cmd("HGETALL").arg(key).query_async(&mut conn).await?;
        Ok(hash)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CoordinationError> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = redis::cmd("SMEMBERS").arg(key).query_async(&mut conn).await?;
        Ok(members)
    }
}
