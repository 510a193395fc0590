// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dx_adapters::FakeBlobStore;
use std::time::{Duration, SystemTime};
use tokio::io::AsyncReadExt;

fn tid(s: &str) -> TrajectoryId {
    TrajectoryId::parse(s).unwrap()
}

fn storage(root: &Path) -> (DumpStorage<FakeBlobStore>, FakeBlobStore) {
    let store = FakeBlobStore::new();
    let config = DumpStorageConfig::new(root.join("cache")).ram_threshold(1024);
    (DumpStorage::new(store.clone(), config), store)
}

fn frame(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

fn staging_is_empty(storage: &DumpStorage<FakeBlobStore>) -> bool {
    match std::fs::read_dir(storage.config().staging_dir()) {
        Ok(mut entries) => entries.next().is_none(),
        Err(e) => e.kind() == ErrorKind::NotFound,
    }
}

#[yare::parameterized(
    in_memory = { 100 },
    at_threshold = { 1024 },
    streamed = { 200 * 1024 },
)]
#[test_macro(tokio::test)]
async fn saved_dump_reads_back_identically(len: usize) {
    let dir = tempfile::tempdir().unwrap();
    let (storage, store) = storage(dir.path());
    let data = frame(len, 3);

    let object = storage.save_dump(&tid("t1"), 7, DumpSource::Bytes(data.clone()), None).await.unwrap();

    assert_eq!(object, "trajectory-t1/timestep-7.dump.gz");
    let meta = store.meta(&object).unwrap();
    assert_eq!(meta.content_type, "application/gzip");
    assert_eq!(meta.content_encoding.as_deref(), Some("gzip"));
    assert_eq!(&store.object(&object).unwrap()[..2], &[0x1f, 0x8b]);

    let path = storage.get_dump(&tid("t1"), 7).await.unwrap().unwrap();
    assert_eq!(path, dir.path().join("cache/t1/7.dump"));
    assert_eq!(std::fs::read(&path).unwrap(), data);
    assert!(staging_is_empty(&storage));
}

#[tokio::test]
async fn save_from_path_streams_and_reports_progress() {
    let dir = tempfile::tempdir().unwrap();
    let (storage, _) = storage(dir.path());
    let source = dir.path().join("frame.bin");
    let data = frame(512 * 1024, 9);
    std::fs::write(&source, &data).unwrap();

    let seen = Arc::new(Mutex::new(Vec::<f64>::new()));
    let sink = Arc::clone(&seen);
    let progress: Progress = Arc::new(move |f| sink.lock().push(f));

    storage.save_dump(&tid("t1"), 0, DumpSource::Path(source), Some(progress)).await.unwrap();

    let seen = seen.lock().clone();
    assert!(seen.len() > 2);
    assert!(seen.iter().all(|f| (0.0..=1.0).contains(f)));
    assert_eq!(seen.last().copied(), Some(1.0));
    let path = storage.get_dump(&tid("t1"), 0).await.unwrap().unwrap();
    assert_eq!(std::fs::read(path).unwrap(), data);
    assert!(staging_is_empty(&storage));
}

#[tokio::test]
async fn in_memory_save_reports_completion() {
    let dir = tempfile::tempdir().unwrap();
    let (storage, _) = storage(dir.path());
    let seen = Arc::new(Mutex::new(Vec::<f64>::new()));
    let sink = Arc::clone(&seen);

    storage
        .save_dump(&tid("t1"), 1, b"tiny".to_vec().into(), Some(Arc::new(move |f| sink.lock().push(f))))
        .await
        .unwrap();

    assert_eq!(*seen.lock(), vec![1.0]);
}

#[tokio::test]
async fn save_from_missing_path_fails_without_leftovers() {
    let dir = tempfile::tempdir().unwrap();
    let (storage, store) = storage(dir.path());

    let err = storage
        .save_dump(&tid("t1"), 1, DumpSource::Path(dir.path().join("absent")), None)
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Io(_)));
    assert!(store.uploads().is_empty());
    assert!(staging_is_empty(&storage));
}

#[tokio::test]
async fn missing_dump_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let (storage, store) = storage(dir.path());

    assert_eq!(storage.get_dump(&tid("t1"), 3).await.unwrap(), None);
    assert!(storage.get_dump_stream(&tid("t1"), 3).await.unwrap().is_none());
    assert!(store.downloads().is_empty());
    assert_eq!(storage.pending_downloads(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cold_reads_share_one_download() {
    let dir = tempfile::tempdir().unwrap();
    let (storage, store) = storage(dir.path());
    let data = frame(300 * 1024, 1);
    storage.save_dump(&tid("t1"), 5, DumpSource::Bytes(data.clone()), None).await.unwrap();
    store.set_download_delay(Duration::from_millis(100));

    let readers: Vec<_> = (0..16)
        .map(|_| {
            let storage = storage.clone();
            tokio::spawn(async move { storage.get_dump(&tid("t1"), 5).await })
        })
        .collect();
    let mut paths = Vec::new();
    for reader in readers {
        paths.push(reader.await.unwrap().unwrap().unwrap());
    }

    assert_eq!(store.downloads().len(), 1);
    assert!(paths.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(std::fs::read(&paths[0]).unwrap(), data);
    assert_eq!(storage.pending_downloads(), 0);
}

#[tokio::test]
async fn fresh_cache_is_served_without_store_io() {
    let dir = tempfile::tempdir().unwrap();
    let (storage, store) = storage(dir.path());
    storage.save_dump(&tid("t1"), 1, b"payload".to_vec().into(), None).await.unwrap();

    storage.get_dump(&tid("t1"), 1).await.unwrap();
    storage.get_dump(&tid("t1"), 1).await.unwrap();
    storage.get_dump(&tid("t1"), 1).await.unwrap();

    assert_eq!(store.downloads().len(), 1);
}

#[tokio::test]
async fn expired_cache_is_downloaded_again() {
    let dir = tempfile::tempdir().unwrap();
    let (storage, store) = storage(dir.path());
    storage.save_dump(&tid("t1"), 1, b"payload".to_vec().into(), None).await.unwrap();
    let path = storage.get_dump(&tid("t1"), 1).await.unwrap().unwrap();

    let stale = SystemTime::now() - Duration::from_secs(31 * 60);
    cache::set_mtime(path.clone(), stale).await.unwrap();
    storage.get_dump(&tid("t1"), 1).await.unwrap();

    assert_eq!(store.downloads().len(), 2);
    assert_eq!(std::fs::read(&path).unwrap(), b"payload");
}

#[tokio::test]
async fn cache_hit_extends_freshness() {
    let dir = tempfile::tempdir().unwrap();
    let (storage, store) = storage(dir.path());
    storage.save_dump(&tid("t1"), 1, b"payload".to_vec().into(), None).await.unwrap();
    let path = storage.get_dump(&tid("t1"), 1).await.unwrap().unwrap();

    // 20 minutes old: still fresh, and the hit pushes mtime forward
    let aging = SystemTime::now() - Duration::from_secs(20 * 60);
    cache::set_mtime(path.clone(), aging).await.unwrap();
    storage.get_dump(&tid("t1"), 1).await.unwrap();

    assert!(cache::is_fresh(&path, Duration::from_secs(15 * 60)).await.unwrap());
    assert_eq!(store.downloads().len(), 1);
}

#[tokio::test]
async fn corrupt_object_leaves_no_cache_file() {
    let dir = tempfile::tempdir().unwrap();
    let (storage, store) = storage(dir.path());
    store.put_object("trajectory-t1/timestep-4.dump.gz", b"definitely not gzip".to_vec());

    let err = storage.get_dump(&tid("t1"), 4).await.unwrap_err();

    assert!(matches!(err, StorageError::Decompress { .. }), "{err:?}");
    let cache_dir = dir.path().join("cache/t1");
    assert_eq!(std::fs::read_dir(&cache_dir).unwrap().count(), 0);
    assert_eq!(storage.pending_downloads(), 0);
}

#[tokio::test]
async fn failed_download_is_retried_by_the_next_call() {
    let dir = tempfile::tempdir().unwrap();
    let (storage, store) = storage(dir.path());
    let object = "trajectory-t1/timestep-4.dump.gz";
    store.put_object(object, b"garbage".to_vec());
    assert!(storage.get_dump(&tid("t1"), 4).await.is_err());

    storage.save_dump(&tid("t1"), 4, b"repaired".to_vec().into(), None).await.unwrap();
    let path = storage.get_dump(&tid("t1"), 4).await.unwrap().unwrap();

    assert_eq!(std::fs::read(path).unwrap(), b"repaired");
    assert_eq!(store.downloads().len(), 2);
}

#[tokio::test]
async fn panicking_store_does_not_wedge_the_key() {
    let dir = tempfile::tempdir().unwrap();
    let (storage, store) = storage(dir.path());
    storage.save_dump(&tid("t1"), 1, b"payload".to_vec().into(), None).await.unwrap();
    store.panic_on_next_exists();

    let err = storage.get_dump(&tid("t1"), 1).await.unwrap_err();

    assert!(err.to_string().starts_with("background task failed"), "{err:?}");
    assert_eq!(storage.pending_downloads(), 0);
    let path = storage.get_dump(&tid("t1"), 1).await.unwrap().unwrap();
    assert_eq!(std::fs::read(path).unwrap(), b"payload");
    assert_eq!(store.exists_calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn delete_during_download_leaves_no_cache_file() {
    let dir = tempfile::tempdir().unwrap();
    let (storage, store) = storage(dir.path());
    storage.save_dump(&tid("t1"), 1, frame(64 * 1024, 2).into(), None).await.unwrap();
    store.set_download_delay(Duration::from_millis(200));

    let reader = {
        let storage = storage.clone();
        tokio::spawn(async move { storage.get_dump(&tid("t1"), 1).await })
    };
    while store.downloads().is_empty() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(storage.delete_dumps(&tid("t1")).await.unwrap(), 1);

    assert_eq!(reader.await.unwrap().unwrap(), None);
    assert!(!dir.path().join("cache/t1/1.dump").exists());
    assert_eq!(storage.pending_downloads(), 0);
    assert_eq!(storage.get_dump(&tid("t1"), 1).await.unwrap(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_waiters_share_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    let (storage, store) = storage(dir.path());
    store.put_object("trajectory-t1/timestep-4.dump.gz", b"garbage".to_vec());
    store.set_download_delay(Duration::from_millis(100));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let storage = storage.clone();
            tokio::spawn(async move { storage.get_dump(&tid("t1"), 4).await })
        })
        .collect();
    for reader in readers {
        assert!(reader.await.unwrap().is_err());
    }
    assert_eq!(store.downloads().len(), 1);
}

#[tokio::test]
async fn dump_stream_reads_decompressed_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let (storage, _) = storage(dir.path());
    storage.save_dump(&tid("t1"), 2, b"ITEM: TIMESTEP\n2\n".to_vec().into(), None).await.unwrap();

    let mut file = storage.get_dump_stream(&tid("t1"), 2).await.unwrap().unwrap();
    let mut body = String::new();
    file.read_to_string(&mut body).await.unwrap();

    assert_eq!(body, "ITEM: TIMESTEP\n2\n");
}

#[tokio::test]
async fn list_dumps_sorts_numerically_and_skips_foreign_objects() {
    let dir = tempfile::tempdir().unwrap();
    let (storage, store) = storage(dir.path());
    for name in [
        "trajectory-t1/timestep-10.dump.gz",
        "trajectory-t1/timestep-2.dump.gz",
        "trajectory-t1/timestep-100.dump.gz",
        "trajectory-t1/notes.txt",
        "trajectory-t1/timestep-x.dump.gz",
        "trajectory-t10/timestep-1.dump.gz",
    ] {
        store.put_object(name, b"x".to_vec());
    }

    assert_eq!(storage.list_dumps(&tid("t1")).await.unwrap(), vec![2, 10, 100]);
    assert!(storage.list_dumps(&tid("empty")).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_dumps_clears_store_and_cache() {
    let dir = tempfile::tempdir().unwrap();
    let (storage, store) = storage(dir.path());
    for ts in 0..3 {
        storage.save_dump(&tid("t1"), ts, frame(64, ts as u8).into(), None).await.unwrap();
    }
    storage.save_dump(&tid("t2"), 0, frame(64, 0).into(), None).await.unwrap();
    storage.get_dump(&tid("t1"), 0).await.unwrap();

    assert_eq!(storage.delete_dumps(&tid("t1")).await.unwrap(), 3);

    assert!(!dir.path().join("cache/t1").exists());
    assert_eq!(store.object_names(), vec!["trajectory-t2/timestep-0.dump.gz"]);
    assert_eq!(storage.delete_dumps(&tid("t1")).await.unwrap(), 0);
}

#[tokio::test]
async fn calculate_size_sums_in_batches_and_tolerates_stat_failures() {
    let dir = tempfile::tempdir().unwrap();
    let store = FakeBlobStore::new();
    let config = DumpStorageConfig::new(dir.path()).stat_batch_size(2);
    let storage = DumpStorage::new(store.clone(), config);
    for ts in 0..5u64 {
        store.put_object(&format!("trajectory-t1/timestep-{ts}.dump.gz"), vec![0u8; 10 * (ts as usize + 1)]);
    }
    store.put_object("trajectory-t1/readme", vec![0u8; 1000]);
    store.fail_stat_for("trajectory-t1/timestep-4.dump.gz");

    // 10 + 20 + 30 + 40, the failing 50-byte object counts as 0
    assert_eq!(storage.calculate_size(&tid("t1")).await.unwrap(), 100);
}

#[tokio::test]
async fn exists_checks_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let (storage, _) = storage(dir.path());
    storage.save_dump(&tid("t1"), 1, b"x".to_vec().into(), None).await.unwrap();

    assert!(storage.exists(&tid("t1"), 1).await.unwrap());
    assert!(!storage.exists(&tid("t1"), 2).await.unwrap());
}

#[tokio::test]
async fn clear_cache_empties_root() {
    let dir = tempfile::tempdir().unwrap();
    let (storage, store) = storage(dir.path());
    storage.save_dump(&tid("t1"), 1, b"x".to_vec().into(), None).await.unwrap();
    storage.get_dump(&tid("t1"), 1).await.unwrap();

    storage.clear_cache().await.unwrap();

    let root = storage.config().cache_root();
    assert!(root.is_dir());
    assert_eq!(std::fs::read_dir(root).unwrap().count(), 0);
    storage.get_dump(&tid("t1"), 1).await.unwrap();
    assert_eq!(store.downloads().len(), 2);
}
