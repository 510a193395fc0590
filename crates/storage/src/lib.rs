// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dx-storage: gzip-compressed trajectory dumps in an object store, with a
//! local decompressed cache in front of it.

mod cache;
mod config;
mod error;
mod pipeline;
mod service;

pub use config::{DumpStorageConfig, CACHE_TTL, RAM_THRESHOLD, STAT_BATCH_SIZE};
pub use error::StorageError;
pub use pipeline::{Progress, CHANNEL_DEPTH, CHUNK_SIZE};
pub use service::{DumpSource, DumpStorage};
