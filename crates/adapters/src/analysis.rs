// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Analysis database boundary.
//!
//! The tracker only needs one question answered before cleaning a
//! trajectory: does any analysis of it still lack a finish time?

use async_trait::async_trait;
use dx_core::TrajectoryId;
use thiserror::Error;

/// Errors from analysis database lookups
#[derive(Debug, Error)]
pub enum AnalysisIndexError {
    #[error("analysis query failed: {0}")]
    QueryFailed(String),
}

#[async_trait]
pub trait AnalysisIndex: Clone + Send + Sync + 'static {
    /// Whether an analysis exists for `trajectory_id` with no finish time
    async fn has_unfinished(&self, trajectory_id: &TrajectoryId) -> Result<bool, AnalysisIndexError>;
}

/// Index for deployments without an analysis database; never blocks cleanup
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAnalysisIndex;

impl NoopAnalysisIndex {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AnalysisIndex for NoopAnalysisIndex {
    async fn has_unfinished(&self, _trajectory_id: &TrajectoryId) -> Result<bool, AnalysisIndexError> {
        Ok(false)
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeAnalysisIndex;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{AnalysisIndex, AnalysisIndexError};
    use async_trait::async_trait;
    use dx_core::TrajectoryId;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeAnalysisState {
        unfinished: HashSet<TrajectoryId>,
        queries: Vec<TrajectoryId>,
        fail: bool,
    }

    /// Fake analysis index with a settable set of unfinished trajectories
    #[derive(Clone, Default)]
    pub struct FakeAnalysisIndex {
        inner: Arc<Mutex<FakeAnalysisState>>,
    }

    impl FakeAnalysisIndex {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_unfinished(&self, trajectory_id: &TrajectoryId, unfinished: bool) {
            let mut state = self.inner.lock();
            if unfinished {
                state.unfinished.insert(trajectory_id.clone());
            } else {
                state.unfinished.remove(trajectory_id);
            }
        }

        /// Make every query fail
        pub fn set_failing(&self, fail: bool) {
            self.inner.lock().fail = fail;
        }

        /// Trajectories queried, in call order
        pub fn queries(&self) -> Vec<TrajectoryId> {
            self.inner.lock().queries.clone()
        }
    }

    #[async_trait]
    impl AnalysisIndex for FakeAnalysisIndex {
        async fn has_unfinished(&self, trajectory_id: &TrajectoryId) -> Result<bool, AnalysisIndexError> {
            let mut state = self.inner.lock();
            state.queries.push(trajectory_id.clone());
            if state.fail {
                return Err(AnalysisIndexError::QueryFailed("database unavailable".to_string()));
            }
            Ok(state.unfinished.contains(trajectory_id))
        }
    }
}

#[cfg(test)]
#[path = "analysis_tests.rs"]
mod tests;
