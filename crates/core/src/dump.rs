// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dump identity and its object-store / cache-file naming.
//!
//! ```text
//! object:  trajectory-<id>/timestep-<timestep>.dump.gz   (gzip, in the dumps bucket)
//! cache:   <cache_root>/<id>/<timestep>.dump             (decompressed, local disk)
//! ```

use crate::trajectory::TrajectoryId;
use std::path::{Path, PathBuf};

pub const DUMP_CONTENT_TYPE: &str = "application/gzip";
pub const DUMP_CONTENT_ENCODING: &str = "gzip";

const OBJECT_PREFIX: &str = "trajectory-";
const TIMESTEP_PREFIX: &str = "timestep-";
const OBJECT_SUFFIX: &str = ".dump.gz";
const CACHE_SUFFIX: &str = "dump";

/// Identity of one frame of one trajectory
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DumpKey {
    pub trajectory_id: TrajectoryId,
    pub timestep: u64,
}

impl DumpKey {
    pub fn new(trajectory_id: TrajectoryId, timestep: u64) -> Self {
        Self { trajectory_id, timestep }
    }

    /// Prefix holding every dump object of a trajectory
    pub fn prefix(trajectory_id: &TrajectoryId) -> String {
        format!("{OBJECT_PREFIX}{trajectory_id}/")
    }

    pub fn object_name(&self) -> String {
        format!("{}{TIMESTEP_PREFIX}{}{OBJECT_SUFFIX}", Self::prefix(&self.trajectory_id), self.timestep)
    }

    /// Directory holding the decompressed cache files of a trajectory
    pub fn cache_dir(cache_root: &Path, trajectory_id: &TrajectoryId) -> PathBuf {
        cache_root.join(trajectory_id.as_str())
    }

    pub fn cache_path(&self, cache_root: &Path) -> PathBuf {
        Self::cache_dir(cache_root, &self.trajectory_id)
            .join(format!("{}.{CACHE_SUFFIX}", self.timestep))
    }
}

impl std::fmt::Display for DumpKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.trajectory_id, self.timestep)
    }
}

/// Extract the timestep from a dump object name (with or without its
/// trajectory prefix). Returns `None` for anything that is not a dump object.
pub fn parse_timestep(object_name: &str) -> Option<u64> {
    let file = object_name.rsplit('/').next()?;
    let digits = file.strip_prefix(TIMESTEP_PREFIX)?.strip_suffix(OBJECT_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
#[path = "dump_tests.rs"]
mod tests;
