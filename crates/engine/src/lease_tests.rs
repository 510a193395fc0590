// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dx_adapters::MemoryCoordinationStore;
use dx_core::FakeClock;

const TTL: Duration = Duration::from_secs(60);

#[test]
fn token_embeds_pid_and_time() {
    let token = CleanupLease::token_for(4242, 1_700_000_000_000);
    let parts: Vec<&str> = token.split(':').collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "4242");
    assert_eq!(parts[1], "1700000000000");
    assert_eq!(parts[2].len(), 32);
    assert_ne!(token, CleanupLease::token_for(4242, 1_700_000_000_000));
}

#[tokio::test]
async fn second_holder_is_refused_until_release() {
    let store = MemoryCoordinationStore::new();
    let first = CleanupLease::acquire(&store, "k", TTL, 1).await.unwrap().unwrap();
    assert!(CleanupLease::acquire(&store, "k", TTL, 2).await.unwrap().is_none());

    assert!(first.release(&store).await.unwrap());
    assert!(CleanupLease::acquire(&store, "k", TTL, 3).await.unwrap().is_some());
}

#[tokio::test]
async fn expired_holder_cannot_release_successor() {
    let clock = FakeClock::new();
    let store = MemoryCoordinationStore::with_clock(clock.clone());
    let stale = CleanupLease::acquire(&store, "k", TTL, 1).await.unwrap().unwrap();

    clock.advance(TTL);
    let fresh = CleanupLease::acquire(&store, "k", TTL, 2).await.unwrap().unwrap();

    assert!(!stale.release(&store).await.unwrap());
    assert_eq!(store.get_many(&["k".to_string()]).await.unwrap(), vec![Some(fresh.token().to_string())]);
}
