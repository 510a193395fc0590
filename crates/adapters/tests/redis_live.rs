// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs against a real server only when `DX_TEST_REDIS_URL` is set.

#![allow(clippy::unwrap_used)]

use dx_adapters::{CoordinationStore, RedisCoordinationStore};
use dx_core::{JobKeys, JobOutcome, TrajectoryId};
use std::time::Duration;

const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

async fn connect() -> Option<RedisCoordinationStore> {
    let url = std::env::var("DX_TEST_REDIS_URL").ok()?;
    Some(RedisCoordinationStore::connect(&url).await.unwrap())
}

fn unique_keys() -> JobKeys {
    let id = format!("live-{}", uuid::Uuid::new_v4().simple());
    JobKeys::new(&TrajectoryId::parse(id).unwrap())
}

#[tokio::test]
async fn counter_scripts_round_trip() {
    let Some(store) = connect().await else { return };
    let keys = unique_keys();

    assert_eq!(store.increment_jobs(&keys, "rasterizer", 10, WEEK).await.unwrap(), 1);
    assert_eq!(store.increment_jobs(&keys, "cloud-upload", 20, WEEK).await.unwrap(), 2);
    let t = store.decrement_jobs(&keys, JobOutcome::Completed, 30, WEEK).await.unwrap();
    assert_eq!((t.before, t.after), (2, 1));

    let meta = store.hash_get_all(&keys.metadata).await.unwrap();
    assert_eq!(meta.get("totalAdded").map(String::as_str), Some("2"));
    assert_eq!(meta.get("firstJobAt").map(String::as_str), Some("10"));
    let mut queues = store.set_members(&keys.queues).await.unwrap();
    queues.sort();
    assert_eq!(queues, vec!["cloud-upload", "rasterizer"]);

    assert_eq!(store.delete(&keys.tracking()).await.unwrap(), 3);
}

#[tokio::test]
async fn lease_compare_and_delete() {
    let Some(store) = connect().await else { return };
    let keys = unique_keys();
    let ttl = Duration::from_secs(5);

    assert!(store.try_acquire(&keys.cleanup_lock, "a", ttl).await.unwrap());
    assert!(!store.try_acquire(&keys.cleanup_lock, "b", ttl).await.unwrap());
    assert!(!store.release(&keys.cleanup_lock, "b").await.unwrap());
    assert!(store.release(&keys.cleanup_lock, "a").await.unwrap());
}

#[tokio::test]
async fn scan_and_mget() {
    let Some(store) = connect().await else { return };
    let prefix = format!("live-scan-{}", uuid::Uuid::new_v4().simple());
    let names: Vec<String> = (0..250).map(|i| format!("{prefix}_queue:status:{i}")).collect();
    for name in &names {
        store.set_value(name, "{}", Some(Duration::from_secs(60))).await.unwrap();
    }

    let found = store.scan(&format!("{prefix}_queue:status:*")).await.unwrap();
    assert_eq!(found.len(), 250);
    let values = store.get_many(&found).await.unwrap();
    assert!(values.iter().all(|v| v.as_deref() == Some("{}")));

    assert_eq!(store.delete(&names).await.unwrap(), 250);
}
