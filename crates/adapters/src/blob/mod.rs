// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object storage adapter.
//!
//! A `BlobStore` is bound to a single bucket. Object names are `/`-separated
//! relative paths; uploads must be all-or-nothing so readers never observe a
//! partially written object.

mod fs;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use fs::FsBlobStore;

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeBlobStore;

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Streaming body of a stored object
pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;

/// Errors from blob store operations
#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("invalid object name: {0:?}")]
    InvalidName(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Payload handed to [`BlobStore::upload`]
#[derive(Debug)]
pub enum UploadBody {
    /// Fully materialized object
    Bytes(Vec<u8>),
    /// Staged file of known length, for backends that need the content
    /// length before the transfer starts
    File { path: PathBuf, len: u64 },
}

impl UploadBody {
    pub fn len(&self) -> u64 {
        match self {
            Self::Bytes(bytes) => bytes.len() as u64,
            Self::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Headers stored alongside an object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMeta {
    pub content_type: String,
    pub content_encoding: Option<String>,
}

impl ObjectMeta {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self { content_type: content_type.into(), content_encoding: None }
    }

    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.content_encoding = Some(encoding.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectStat {
    pub size: u64,
}

/// Adapter for an object store bucket
#[async_trait]
pub trait BlobStore: Clone + Send + Sync + 'static {
    async fn upload(&self, name: &str, body: UploadBody, meta: &ObjectMeta) -> Result<(), BlobStoreError>;

    /// Open an object for streaming. `NotFound` if it does not exist.
    async fn get_stream(&self, name: &str) -> Result<BlobReader, BlobStoreError>;

    async fn exists(&self, name: &str) -> Result<bool, BlobStoreError>;

    async fn stat(&self, name: &str) -> Result<ObjectStat, BlobStoreError>;

    /// Names of all objects starting with `prefix`, sorted
    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<String>, BlobStoreError>;

    /// Delete every object starting with `prefix`, returning how many were removed
    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, BlobStoreError>;
}

/// Reject names that could escape the bucket root
pub(crate) fn validate_name(name: &str) -> Result<(), BlobStoreError> {
    let bad = name.is_empty()
        || name.starts_with('/')
        || name.contains('\\')
        || name.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        Err(BlobStoreError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
