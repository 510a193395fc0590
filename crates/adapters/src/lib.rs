// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for the external collaborators of dump storage and job tracking:
//! the object store, the coordination store, the analysis database, and the
//! artifact cleanup step.

pub mod analysis;
pub mod blob;
pub mod cleanup;
pub mod coord;

pub use analysis::{AnalysisIndex, AnalysisIndexError, NoopAnalysisIndex};
pub use blob::{BlobReader, BlobStore, BlobStoreError, FsBlobStore, ObjectMeta, ObjectStat, UploadBody};
pub use cleanup::{CleanupError, CleanupExecutor, DirectoryCleanup};
pub use coord::{
    CoordinationError, CoordinationStore, CounterTransition, MemoryCoordinationStore,
    RedisCoordinationStore,
};

#[cfg(any(test, feature = "test-support"))]
pub use analysis::FakeAnalysisIndex;
#[cfg(any(test, feature = "test-support"))]
pub use blob::FakeBlobStore;
#[cfg(any(test, feature = "test-support"))]
pub use cleanup::FakeCleanup;
