// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cache freshness: a file is trusted while `now - mtime < ttl`, and every
//! read pushes its mtime forward.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

pub(crate) async fn is_fresh(path: &Path, ttl: Duration) -> std::io::Result<bool> {
    let meta = match tokio::fs::metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if !meta.is_file() {
        return Ok(false);
    }
    let modified = meta.modified()?;
    // An mtime in the future counts as just written
    Ok(SystemTime::now().duration_since(modified).map_or(true, |age| age < ttl))
}

/// Set the mtime of `path` to `at`
pub(crate) async fn set_mtime(path: PathBuf, at: SystemTime) -> std::io::Result<()> {
    tokio::task::spawn_blocking(move || {
        let file = std::fs::OpenOptions::new().write(true).open(&path)?;
        file.set_modified(at)
    })
    .await
    .map_err(std::io::Error::other)?
}

pub(crate) async fn touch(path: &Path) -> std::io::Result<()> {
    set_mtime(path.to_path_buf(), SystemTime::now()).await
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
