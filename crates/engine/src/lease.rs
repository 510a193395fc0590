// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Owner-tagged lease over a coordination key.
//!
//! Acquire is create-if-absent with expiry. Release deletes the key only
//! while it still carries this holder's token, so a holder whose lease
//! expired cannot remove a lease another process has since taken.

use dx_adapters::{CoordinationError, CoordinationStore};
use std::time::Duration;

#[derive(Debug)]
pub struct CleanupLease {
    key: String,
    token: String,
}

impl CleanupLease {
    /// Holder token: `<pid>:<epoch_ms>:<random>`
    pub fn token_for(pid: u32, epoch_ms: u64) -> String {
        format!("{pid}:{epoch_ms}:{}", uuid::Uuid::new_v4().simple())
    }

    /// `None` when another holder owns the key
    pub async fn acquire<S: CoordinationStore>(
        store: &S,
        key: &str,
        ttl: Duration,
        epoch_ms: u64,
    ) -> Result<Option<Self>, CoordinationError> {
        let token = Self::token_for(std::process::id(), epoch_ms);
        if store.try_acquire(key, &token, ttl).await? {
            Ok(Some(Self { key: key.to_string(), token }))
        } else {
            Ok(None)
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns false if the lease had already expired or changed hands
    pub async fn release<S: CoordinationStore>(self, store: &S) -> Result<bool, CoordinationError> {
        store.release(&self.key, &self.token).await
    }
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
