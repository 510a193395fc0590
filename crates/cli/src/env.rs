// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BUCKET: &str = "dumps";
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Decompressed dump cache: DX_CACHE_DIR > <cache dir>/dx/dumps > <tmp>/dx/dumps
pub fn cache_dir() -> PathBuf {
    if let Some(dir) = non_empty("DX_CACHE_DIR") {
        return PathBuf::from(dir);
    }
    dirs::cache_dir().unwrap_or_else(std::env::temp_dir).join("dx/dumps")
}

/// Filesystem object store root: DX_OBJECT_ROOT > <data dir>/dx/objects
pub fn object_root() -> PathBuf {
    if let Some(dir) = non_empty("DX_OBJECT_ROOT") {
        return PathBuf::from(dir);
    }
    dirs::data_dir().unwrap_or_else(std::env::temp_dir).join("dx/objects")
}

pub fn bucket() -> String {
    non_empty("DX_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string())
}

pub fn redis_url() -> String {
    non_empty("DX_REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string())
}

/// Queue namespaces to scan, comma-separated. `None` keeps the defaults.
pub fn queues() -> Option<Vec<String>> {
    let queues = split_list(&non_empty("DX_QUEUES")?);
    (!queues.is_empty()).then_some(queues)
}

pub fn cache_ttl() -> Option<Duration> {
    std::env::var("DX_CACHE_TTL_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Roots whose `<trajectoryId>` subdirectories are removed on cleanup.
/// Separated by `,` or the platform path separator (`:`, `;` on Windows).
pub fn artifact_dirs() -> Vec<PathBuf> {
    non_empty("DX_ARTIFACT_DIRS").map(|s| split_path_list(&s)).unwrap_or_default()
}

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

/// Split on `,`, dropping blanks
fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

fn split_path_list(value: &str) -> Vec<PathBuf> {
    value
        .split(',')
        .map(str::trim)
        .flat_map(std::env::split_paths::<str>)
        .filter(|p| !p.as_os_str().to_string_lossy().trim().is_empty())
        .collect()
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
