// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Removal of per-trajectory temporary artifacts.
//!
//! Invoked by the tracker only once verification has passed. Cleaning a
//! trajectory that was already cleaned is a no-op.

use async_trait::async_trait;
use dx_core::TrajectoryId;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from artifact cleanup
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("IO error removing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cleanup failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait CleanupExecutor: Clone + Send + Sync + 'static {
    async fn cleanup(&self, trajectory_id: &TrajectoryId) -> Result<(), CleanupError>;
}

/// Removes `<root>/<trajectory_id>` under each configured artifact root
#[derive(Clone, Debug, Default)]
pub struct DirectoryCleanup {
    roots: Vec<PathBuf>,
}

impl DirectoryCleanup {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self { roots: roots.into_iter().collect() }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

#[async_trait]
impl CleanupExecutor for DirectoryCleanup {
    async fn cleanup(&self, trajectory_id: &TrajectoryId) -> Result<(), CleanupError> {
        for root in &self.roots {
            let path = root.join(trajectory_id.as_str());
            match tokio::fs::remove_dir_all(&path).await {
                Ok(()) => tracing::info!(path = %path.display(), "removed trajectory artifacts"),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    tracing::debug!(path = %path.display(), "no artifacts to remove")
                }
                Err(source) => return Err(CleanupError::Io { path, source }),
            }
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeCleanup;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{CleanupError, CleanupExecutor};
    use async_trait::async_trait;
    use dx_core::TrajectoryId;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeCleanupState {
        calls: Vec<TrajectoryId>,
        running: usize,
        max_running: usize,
        fail: bool,
        delay: Option<Duration>,
    }

    /// Fake cleanup recording every invocation and peak concurrency
    #[derive(Clone, Default)]
    pub struct FakeCleanup {
        inner: Arc<Mutex<FakeCleanupState>>,
    }

    impl FakeCleanup {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<TrajectoryId> {
            self.inner.lock().calls.clone()
        }

        /// Highest number of cleanups observed running at once
        pub fn max_concurrent(&self) -> usize {
            self.inner.lock().max_running
        }

        pub fn set_failing(&self, fail: bool) {
            self.inner.lock().fail = fail;
        }

        /// Hold each cleanup open for `delay`
        pub fn set_delay(&self, delay: Duration) {
            self.inner.lock().delay = Some(delay);
        }
    }

    #[async_trait]
    impl CleanupExecutor for FakeCleanup {
        async fn cleanup(&self, trajectory_id: &TrajectoryId) -> Result<(), CleanupError> {
            let delay = {
                let mut state = self.inner.lock();
                state.calls.push(trajectory_id.clone());
                state.running += 1;
                state.max_running = state.max_running.max(state.running);
                state.delay
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let mut state = self.inner.lock();
            state.running -= 1;
            if state.fail {
                return Err(CleanupError::Failed(format!("refused to clean {trajectory_id}")));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod tests;
