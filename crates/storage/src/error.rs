// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use dx_adapters::BlobStoreError;
use std::sync::Arc;
use thiserror::Error;

/// Errors from dump storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object store error: {0}")]
    Store(#[from] BlobStoreError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot decompress {object}: {source}")]
    Decompress {
        object: String,
        #[source]
        source: std::io::Error,
    },
    #[error("background task failed: {0}")]
    Task(String),
    /// Failure of a download shared by several callers
    #[error(transparent)]
    Shared(Arc<StorageError>),
}

impl StorageError {
    /// Sort a pipeline IO error into corrupt-object vs. plain IO
    pub(crate) fn from_inflate(object: &str, e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::InvalidData | ErrorKind::InvalidInput | ErrorKind::UnexpectedEof => {
                Self::Decompress { object: object.to_string(), source: e }
            }
            _ => Self::Io(e),
        }
    }

    /// Take back sole ownership when this caller was the last one waiting
    pub(crate) fn from_shared(e: Arc<StorageError>) -> Self {
        Arc::try_unwrap(e).unwrap_or_else(Self::Shared)
    }

    pub(crate) fn task(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}
