// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory bucket for tests

#![cfg_attr(coverage_nightly, coverage(off))]

use super::{validate_name, BlobReader, BlobStore, BlobStoreError, ObjectMeta, ObjectStat, UploadBody};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    meta: ObjectMeta,
}

#[derive(Default)]
struct FakeBlobState {
    objects: BTreeMap<String, StoredObject>,
    downloads: Vec<String>,
    uploads: Vec<String>,
    fail_stat: HashSet<String>,
    download_delay: Option<Duration>,
    panic_next_exists: bool,
    exists_calls: usize,
}

/// Fake blob store recording uploads and downloads
#[derive(Clone, Default)]
pub struct FakeBlobStore {
    inner: Arc<Mutex<FakeBlobState>>,
}

impl FakeBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw bytes without going through `upload`
    pub fn put_object(&self, name: &str, data: impl Into<Vec<u8>>) {
        self.inner
            .lock()
            .objects
            .insert(name.to_string(), StoredObject { data: data.into(), meta: ObjectMeta::default() });
    }

    pub fn object(&self, name: &str) -> Option<Vec<u8>> {
        self.inner.lock().objects.get(name).map(|o| o.data.clone())
    }

    pub fn meta(&self, name: &str) -> Option<ObjectMeta> {
        self.inner.lock().objects.get(name).map(|o| o.meta.clone())
    }

    pub fn object_names(&self) -> Vec<String> {
        self.inner.lock().objects.keys().cloned().collect()
    }

    /// Names passed to `get_stream`, in call order
    pub fn downloads(&self) -> Vec<String> {
        self.inner.lock().downloads.clone()
    }

    pub fn uploads(&self) -> Vec<String> {
        self.inner.lock().uploads.clone()
    }

    /// Number of `exists` calls, including ones that panicked
    pub fn exists_calls(&self) -> usize {
        self.inner.lock().exists_calls
    }

    /// Make the next `exists` call panic, simulating a broken backend
    pub fn panic_on_next_exists(&self) {
        self.inner.lock().panic_next_exists = true;
    }

    /// Delay every `get_stream` call after the object has been read,
    /// widening race windows
    pub fn set_download_delay(&self, delay: Duration) {
        self.inner.lock().download_delay = Some(delay);
    }

    /// Make `stat` fail for one object
    pub fn fail_stat_for(&self, name: &str) {
        self.inner.lock().fail_stat.insert(name.to_string());
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn upload(&self, name: &str, body: UploadBody, meta: &ObjectMeta) -> Result<(), BlobStoreError> {
        validate_name(name)?;
        let data = match body {
            UploadBody::Bytes(bytes) => bytes,
            UploadBody::File { path, .. } => tokio::fs::read(&path).await?,
        };
        let mut state = self.inner.lock();
        state.uploads.push(name.to_string());
        state.objects.insert(name.to_string(), StoredObject { data, meta: meta.clone() });
        Ok(())
    }

    async fn get_stream(&self, name: &str) -> Result<BlobReader, BlobStoreError> {
        let (data, delay) = {
            let mut state = self.inner.lock();
            state.downloads.push(name.to_string());
            (state.objects.get(name).map(|o| o.data.clone()), state.download_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let data = data.ok_or_else(|| BlobStoreError::NotFound(name.to_string()))?;
        Ok(Box::new(Cursor::new(data)))
    }

    #[allow(clippy::panic)]
    async fn exists(&self, name: &str) -> Result<bool, BlobStoreError> {
        let (found, panic) = {
            let mut state = self.inner.lock();
            state.exists_calls += 1;
            (state.objects.contains_key(name), std::mem::take(&mut state.panic_next_exists))
        };
        if panic {
            panic!("exists({name}) failed");
        }
        Ok(found)
    }

    async fn stat(&self, name: &str) -> Result<ObjectStat, BlobStoreError> {
        let state = self.inner.lock();
        if state.fail_stat.contains(name) {
            return Err(BlobStoreError::Backend(format!("stat refused for {name}")));
        }
        state
            .objects
            .get(name)
            .map(|o| ObjectStat { size: o.data.len() as u64 })
            .ok_or_else(|| BlobStoreError::NotFound(name.to_string()))
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<String>, BlobStoreError> {
        Ok(self.inner.lock().objects.keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, BlobStoreError> {
        let mut state = self.inner.lock();
        let before = state.objects.len();
        state.objects.retain(|k, _| !k.starts_with(prefix));
        Ok((before - state.objects.len()) as u64)
    }
}
