// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dump storage service.
//!
//! Dumps are stored gzip-compressed under `trajectory-<id>/timestep-<n>.dump.gz`
//! and served from a decompressed local cache. Concurrent readers of the same
//! cold dump share a single download.

use crate::cache;
use crate::config::DumpStorageConfig;
use crate::error::StorageError;
use crate::pipeline::{self, Progress};
use dx_adapters::{BlobStore, BlobStoreError, ObjectMeta, UploadBody};
use dx_core::{parse_timestep, DumpKey, TrajectoryId, DUMP_CONTENT_ENCODING, DUMP_CONTENT_TYPE};
use futures_util::future::{join_all, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Payload handed to [`DumpStorage::save_dump`]
#[derive(Debug, Clone)]
pub enum DumpSource {
    Bytes(Vec<u8>),
    /// File on local disk, streamed without loading it into memory
    Path(PathBuf),
}

impl From<Vec<u8>> for DumpSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<PathBuf> for DumpSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

type DownloadResult = Result<Option<PathBuf>, Arc<StorageError>>;
type PendingDownload = Shared<BoxFuture<'static, DownloadResult>>;

struct Inner<B> {
    store: B,
    config: DumpStorageConfig,
    /// In-flight downloads tagged with the id of the task that owns them
    pending: Mutex<HashMap<DumpKey, (u64, PendingDownload)>>,
    next_download: AtomicU64,
}

pub struct DumpStorage<B: BlobStore> {
    inner: Arc<Inner<B>>,
}

impl<B: BlobStore> Clone for DumpStorage<B> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

fn dump_meta() -> ObjectMeta {
    ObjectMeta::new(DUMP_CONTENT_TYPE).encoding(DUMP_CONTENT_ENCODING)
}

impl<B: BlobStore> DumpStorage<B> {
    pub fn new(store: B, config: DumpStorageConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                config,
                pending: Mutex::new(HashMap::new()),
                next_download: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &DumpStorageConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &B {
        &self.inner.store
    }

    /// Downloads currently in flight
    pub fn pending_downloads(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Compress and upload one dump. Returns the object name.
    pub async fn save_dump(
        &self,
        trajectory_id: &TrajectoryId,
        timestep: u64,
        source: DumpSource,
        progress: Option<Progress>,
    ) -> Result<String, StorageError> {
        let key = DumpKey::new(trajectory_id.clone(), timestep);
        let object = key.object_name();

        let (raw, compressed) = match source {
            DumpSource::Bytes(data) if data.len() < self.inner.config.ram_threshold => {
                let raw = data.len() as u64;
                let gz = tokio::task::spawn_blocking(move || pipeline::gzip_bytes(&data))
                    .await
                    .map_err(StorageError::task)??;
                let compressed = gz.len() as u64;
                self.inner.store.upload(&object, UploadBody::Bytes(gz), &dump_meta()).await?;
                (raw, compressed)
            }
            source => self.save_staged(&key, &object, source, progress.clone()).await?,
        };
        pipeline::report(progress.as_ref(), 1.0);

        tracing::info!(%trajectory_id, timestep, raw, compressed, "saved dump");
        Ok(object)
    }

    /// Streaming save: compress into a staging file, upload it, always
    /// remove it afterwards
    async fn save_staged(
        &self,
        key: &DumpKey,
        object: &str,
        source: DumpSource,
        progress: Option<Progress>,
    ) -> Result<(u64, u64), StorageError> {
        let staging_dir = self.inner.config.staging_dir();
        tokio::fs::create_dir_all(&staging_dir).await?;
        let staged = staging_dir.join(format!(
            "{}-{}-{}.gz",
            key.trajectory_id,
            key.timestep,
            uuid::Uuid::new_v4().simple()
        ));

        let result = self.compress_and_upload(object, source, &staged, progress).await;
        if let Err(e) = tokio::fs::remove_file(&staged).await {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(path = %staged.display(), error = %e, "failed to remove staging file");
            }
        }
        result
    }

    async fn compress_and_upload(
        &self,
        object: &str,
        source: DumpSource,
        staged: &Path,
        progress: Option<Progress>,
    ) -> Result<(u64, u64), StorageError> {
        let dest = staged.to_path_buf();
        let (raw, compressed) = tokio::task::spawn_blocking(move || -> std::io::Result<(u64, u64)> {
            match source {
                DumpSource::Bytes(data) => {
                    let raw = data.len() as u64;
                    let size = pipeline::gzip_to_file(data.as_slice(), raw, &dest, progress.as_ref())?;
                    Ok((raw, size))
                }
                DumpSource::Path(path) => {
                    let file = std::fs::File::open(&path)?;
                    let raw = file.metadata()?.len();
                    let reader = std::io::BufReader::with_capacity(pipeline::CHUNK_SIZE, file);
                    let size = pipeline::gzip_to_file(reader, raw, &dest, progress.as_ref())?;
                    Ok((raw, size))
                }
            }
        })
        .await
        .map_err(StorageError::task)??;

        let body = UploadBody::File { path: staged.to_path_buf(), len: compressed };
        self.inner.store.upload(object, body, &dump_meta()).await?;
        Ok((raw, compressed))
    }

    /// Path of the decompressed dump, downloading it on a cache miss.
    /// `None` when the dump does not exist.
    pub async fn get_dump(
        &self,
        trajectory_id: &TrajectoryId,
        timestep: u64,
    ) -> Result<Option<PathBuf>, StorageError> {
        let key = DumpKey::new(trajectory_id.clone(), timestep);
        let path = key.cache_path(&self.inner.config.cache_root);

        if cache::is_fresh(&path, self.inner.config.cache_ttl).await? {
            if let Err(e) = cache::touch(&path).await {
                tracing::warn!(path = %path.display(), error = %e, "failed to refresh cache mtime");
            }
            tracing::debug!(%key, "dump cache hit");
            return Ok(Some(path));
        }

        let download = self.join_or_start_download(key);
        download.await.map_err(StorageError::from_shared)
    }

    fn join_or_start_download(&self, key: DumpKey) -> PendingDownload {
        let mut pending = self.inner.pending.lock();
        if let Some((_, download)) = pending.get(&key) {
            tracing::debug!(%key, "joining in-flight download");
            return download.clone();
        }

        let id = self.inner.next_download.fetch_add(1, Ordering::Relaxed);
        let entry = PendingEntry { storage: self.clone(), key: key.clone(), id };
        // Spawned so the download completes even if every waiter goes away.
        // The entry is released when the task ends, panics included.
        let handle = tokio::spawn(async move {
            entry.storage.execute_download(&entry.key, entry.id).await.map_err(Arc::new)
        });
        let download = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(Arc::new(StorageError::task(e))),
            }
        }
        .boxed()
        .shared();
        pending.insert(key, (id, download.clone()));
        download
    }

    fn owns_download(&self, key: &DumpKey, id: u64) -> bool {
        self.inner.pending.lock().get(key).is_some_and(|(owner, _)| *owner == id)
    }

    fn release_download(&self, key: &DumpKey, id: u64) {
        let mut pending = self.inner.pending.lock();
        if pending.get(key).is_some_and(|(owner, _)| *owner == id) {
            pending.remove(key);
        }
    }

    async fn execute_download(&self, key: &DumpKey, id: u64) -> Result<Option<PathBuf>, StorageError> {
        let object = key.object_name();
        let store = &self.inner.store;
        if !store.exists(&object).await? {
            tracing::debug!(%key, "dump not in store");
            return Ok(None);
        }

        let cache_root = &self.inner.config.cache_root;
        let dir = DumpKey::cache_dir(cache_root, &key.trajectory_id);
        tokio::fs::create_dir_all(&dir).await?;

        let reader = match store.get_stream(&object).await {
            Ok(reader) => reader,
            // Deleted between the existence check and the read
            Err(BlobStoreError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let path = key.cache_path(cache_root);
        let partial = dir.join(format!(".{}.part-{}", key.timestep, uuid::Uuid::new_v4().simple()));
        let result = match pipeline::inflate_to_file(reader, partial.clone()).await {
            Ok(size) => tokio::fs::rename(&partial, &path).await.map(|()| size).map_err(StorageError::from),
            Err(e) => Err(StorageError::from_inflate(&object, e)),
        };

        // delete_dumps ran while this download was in flight
        if !self.owns_download(key, id) {
            tracing::debug!(%key, "dump deleted during download, discarding");
            let _ = tokio::fs::remove_file(&partial).await;
            if result.is_ok() {
                let _ = tokio::fs::remove_file(&path).await;
            }
            return Ok(None);
        }

        match result {
            Ok(size) => {
                tracing::info!(%key, size, "cached dump");
                Ok(Some(path))
            }
            Err(e) => {
                tracing::error!(%key, error = %e, "dump download failed");
                let _ = tokio::fs::remove_file(&partial).await;
                Err(e)
            }
        }
    }

    /// Open the decompressed dump for reading. `None` when it does not exist.
    pub async fn get_dump_stream(
        &self,
        trajectory_id: &TrajectoryId,
        timestep: u64,
    ) -> Result<Option<tokio::fs::File>, StorageError> {
        match self.get_dump(trajectory_id, timestep).await? {
            Some(path) => Ok(Some(tokio::fs::File::open(&path).await?)),
            None => Ok(None),
        }
    }

    /// Whether the dump exists in the object store
    pub async fn exists(&self, trajectory_id: &TrajectoryId, timestep: u64) -> Result<bool, StorageError> {
        let object = DumpKey::new(trajectory_id.clone(), timestep).object_name();
        Ok(self.inner.store.exists(&object).await?)
    }

    /// Timesteps stored for a trajectory, ascending
    pub async fn list_dumps(&self, trajectory_id: &TrajectoryId) -> Result<Vec<u64>, StorageError> {
        let names = self.inner.store.list_by_prefix(&DumpKey::prefix(trajectory_id)).await?;
        let mut timesteps: Vec<u64> = names.iter().filter_map(|n| parse_timestep(n)).collect();
        timesteps.sort_unstable();
        Ok(timesteps)
    }

    /// Remove every stored dump of a trajectory along with its cache
    /// directory. Returns the number of objects removed.
    pub async fn delete_dumps(&self, trajectory_id: &TrajectoryId) -> Result<u64, StorageError> {
        let prefix = DumpKey::prefix(trajectory_id);
        self.inner.pending.lock().retain(|key, _| key.trajectory_id != *trajectory_id);
        let cache_dir = DumpKey::cache_dir(&self.inner.config.cache_root, trajectory_id);
        let (objects, cache) = tokio::join!(
            self.inner.store.delete_by_prefix(&prefix),
            tokio::fs::remove_dir_all(&cache_dir),
        );
        let deleted = objects?;
        match cache {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tracing::info!(%trajectory_id, deleted, "deleted dumps");
        Ok(deleted)
    }

    /// Total compressed size of a trajectory's dumps in the store.
    /// Objects whose stat fails count as zero.
    pub async fn calculate_size(&self, trajectory_id: &TrajectoryId) -> Result<u64, StorageError> {
        let names = self.inner.store.list_by_prefix(&DumpKey::prefix(trajectory_id)).await?;
        let dumps: Vec<String> = names.into_iter().filter(|n| parse_timestep(n).is_some()).collect();

        let mut total = 0u64;
        for batch in dumps.chunks(self.inner.config.stat_batch_size.max(1)) {
            let stats = join_all(batch.iter().map(|name| self.inner.store.stat(name))).await;
            for (name, stat) in batch.iter().zip(stats) {
                match stat {
                    Ok(stat) => total += stat.size,
                    Err(e) => tracing::warn!(object = %name, error = %e, "stat failed, counting as 0"),
                }
            }
        }
        Ok(total)
    }

    /// Drop every cached dump
    pub async fn clear_cache(&self) -> Result<(), StorageError> {
        let root = &self.inner.config.cache_root;
        match tokio::fs::remove_dir_all(root).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir_all(root).await?;
        tracing::info!(root = %root.display(), "cleared dump cache");
        Ok(())
    }
}

/// Releases a download's `pending` entry when its task finishes or unwinds
struct PendingEntry<B: BlobStore> {
    storage: DumpStorage<B>,
    key: DumpKey,
    id: u64,
}

impl<B: BlobStore> Drop for PendingEntry<B> {
    fn drop(&mut self) {
        self.storage.release_download(&self.key, self.id);
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
