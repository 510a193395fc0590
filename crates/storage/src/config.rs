// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};
use std::time::Duration;

/// How long a cache file stays trusted after its last access
pub const CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// In-memory buffers strictly smaller than this are compressed in RAM
pub const RAM_THRESHOLD: usize = 4 * 1024 * 1024;

/// Object stats kept in flight at once by `calculate_size`
pub const STAT_BATCH_SIZE: usize = 50;

const STAGING_DIR: &str = ".staging";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpStorageConfig {
    /// Root of the decompressed cache (`<root>/<trajectory>/<timestep>.dump`)
    pub cache_root: PathBuf,
    pub cache_ttl: Duration,
    pub ram_threshold: usize,
    pub stat_batch_size: usize,
}

impl DumpStorageConfig {
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            cache_ttl: CACHE_TTL,
            ram_threshold: RAM_THRESHOLD,
            stat_batch_size: STAT_BATCH_SIZE,
        }
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn ram_threshold(mut self, bytes: usize) -> Self {
        self.ram_threshold = bytes;
        self
    }

    pub fn stat_batch_size(mut self, size: usize) -> Self {
        self.stat_batch_size = size.max(1);
        self
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Scratch space for compressed uploads on the streaming save path
    pub fn staging_dir(&self) -> PathBuf {
        self.cache_root.join(STAGING_DIR)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
