// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bucket backed by a local directory.
//!
//! Objects live at `<root>/<name>`. Writes go to a hidden sibling temp file
//! and are renamed into place, so a concurrent reader sees either the old
//! object or the complete new one.

use super::{validate_name, BlobReader, BlobStore, BlobStoreError, ObjectMeta, ObjectStat, UploadBody};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: Arc<PathBuf>,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: Arc::new(root.into()) }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, name: &str) -> Result<PathBuf, BlobStoreError> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }
}

fn not_found(name: &str, e: std::io::Error) -> BlobStoreError {
    if e.kind() == ErrorKind::NotFound {
        BlobStoreError::NotFound(name.to_string())
    } else {
        BlobStoreError::Io(e)
    }
}

/// Hidden temp file next to `path`. Hidden names are skipped by listing.
fn temp_sibling(path: &Path) -> PathBuf {
    let file = path.file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!(".{file}.tmp-{}", uuid::Uuid::new_v4().simple()))
}

/// Walk `start` collecting `/`-joined names (relative to the bucket root)
/// that begin with `prefix`.
fn walk(start: &Path, base: &str, prefix: &str, out: &mut Vec<String>) -> std::io::Result<()> {
    let entries = match std::fs::read_dir(start) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else { continue };
        if file_name.starts_with('.') {
            continue;
        }
        let name = format!("{base}{file_name}");
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            let dir_name = format!("{name}/");
            // Only descend where the prefix can still match
            if dir_name.starts_with(prefix) || prefix.starts_with(&dir_name) {
                walk(&entry.path(), &dir_name, prefix, out)?;
            }
        } else if file_type.is_file() && name.starts_with(prefix) {
            out.push(name);
        }
    }
    Ok(())
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, name: &str, body: UploadBody, meta: &ObjectMeta) -> Result<(), BlobStoreError> {
        let path = self.object_path(name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = temp_sibling(&path);
        let written = match body {
            UploadBody::Bytes(bytes) => tokio::fs::write(&tmp, &bytes).await,
            UploadBody::File { path: source, .. } => tokio::fs::copy(&source, &tmp).await.map(|_| ()),
        };
        let result = match written {
            Ok(()) => tokio::fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        tracing::debug!(object = name, content_type = %meta.content_type, "stored object");
        Ok(())
    }

    async fn get_stream(&self, name: &str) -> Result<BlobReader, BlobStoreError> {
        let path = self.object_path(name)?;
        let file = tokio::fs::File::open(&path).await.map_err(|e| not_found(name, e))?;
        Ok(Box::new(file))
    }

    async fn exists(&self, name: &str) -> Result<bool, BlobStoreError> {
        let path = self.object_path(name)?;
        match tokio::fs::metadata(&path).await {
            Ok(m) => Ok(m.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn stat(&self, name: &str) -> Result<ObjectStat, BlobStoreError> {
        let path = self.object_path(name)?;
        let meta = tokio::fs::metadata(&path).await.map_err(|e| not_found(name, e))?;
        if !meta.is_file() {
            return Err(BlobStoreError::NotFound(name.to_string()));
        }
        Ok(ObjectStat { size: meta.len() })
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<String>, BlobStoreError> {
        let root = Arc::clone(&self.root);
        let prefix = prefix.to_string();
        tokio::task::spawn_blocking(move || {
            let mut names = Vec::new();
            walk(&root, "", &prefix, &mut names)?;
            names.sort();
            Ok(names)
        })
        .await
        .map_err(|e| BlobStoreError::Backend(e.to_string()))?
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, BlobStoreError> {
        let names = self.list_by_prefix(prefix).await?;
        let mut deleted = 0;
        for name in &names {
            let path = self.object_path(name)?;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => deleted += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            // Leave no empty directory behind; fails harmlessly when not empty
            if let Some(parent) = path.parent().filter(|p| *p != self.root.as_path()) {
                let _ = tokio::fs::remove_dir(parent).await;
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
#[path = "fs_tests.rs"]
mod tests;
