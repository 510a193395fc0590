// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use dx_adapters::{AnalysisIndexError, CleanupError, CoordinationError};
use dx_core::TrajectoryId;
use thiserror::Error;

/// Errors from job tracking operations
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("coordination store error: {0}")]
    Store(#[from] CoordinationError),
    #[error("analysis lookup failed: {0}")]
    Analysis(#[from] AnalysisIndexError),
    #[error("cleanup failed: {0}")]
    Cleanup(#[from] CleanupError),
    #[error("cleanup lock for trajectory {0} is held by another process")]
    LockConflict(TrajectoryId),
}
