// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex;
use std::io::Cursor;

/// Deterministic, poorly compressible payload
fn payload(len: usize) -> Vec<u8> {
    let mut state: u32 = 0x9e37_79b9;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as u8
        })
        .collect()
}

fn gunzip(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    MultiGzDecoder::new(data).read_to_end(&mut out).unwrap();
    out
}

fn recorder() -> (Progress, Arc<Mutex<Vec<f64>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (Arc::new(move |f| sink.lock().push(f)), seen)
}

#[test]
fn gzip_bytes_emits_gzip_magic() {
    let compressed = gzip_bytes(b"frame data").unwrap();
    assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
    assert_eq!(gunzip(&compressed), b"frame data");
}

#[test]
fn gzip_to_file_reports_monotonic_progress_ending_at_one() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.gz");
    let data = payload(300 * 1024);
    let (progress, seen) = recorder();

    let size = gzip_to_file(Cursor::new(&data), data.len() as u64, &dest, Some(&progress)).unwrap();

    let on_disk = std::fs::read(&dest).unwrap();
    assert_eq!(size, on_disk.len() as u64);
    assert_eq!(gunzip(&on_disk), data);
    let seen = seen.lock();
    assert!(seen.len() > 1);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.last().copied(), Some(1.0));
}

#[test]
fn progress_is_clamped_when_source_outgrows_total() {
    let dir = tempfile::tempdir().unwrap();
    let (progress, seen) = recorder();
    // Source grew after it was stat'ed
    gzip_to_file(Cursor::new(vec![7u8; 1000]), 10, &dir.path().join("o.gz"), Some(&progress)).unwrap();
    assert!(seen.lock().iter().all(|f| (0.0..=1.0).contains(f)));
}

#[tokio::test]
async fn inflate_round_trips_multi_chunk_payload() {
    let dir = tempfile::tempdir().unwrap();
    let data = payload(CHUNK_SIZE * CHANNEL_DEPTH * 3 + 17);
    let compressed = gzip_bytes(&data).unwrap();
    let dest = dir.path().join("1.dump");

    let n = inflate_to_file(Box::new(Cursor::new(compressed)), dest.clone()).await.unwrap();

    assert_eq!(n, data.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), data);
}

#[tokio::test]
async fn inflate_rejects_non_gzip() {
    let dir = tempfile::tempdir().unwrap();
    let err = inflate_to_file(Box::new(Cursor::new(b"plain text, not gzip".to_vec())), dir.path().join("x"))
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData));
}

#[tokio::test]
async fn inflate_reports_truncated_stream() {
    let dir = tempfile::tempdir().unwrap();
    let mut compressed = gzip_bytes(&payload(200 * 1024)).unwrap();
    compressed.truncate(compressed.len() / 2);
    let err = inflate_to_file(Box::new(Cursor::new(compressed)), dir.path().join("x")).await.unwrap_err();
    assert!(matches!(
        err.kind(),
        io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData
    ));
}

#[test]
fn report_clamps() {
    let (progress, seen) = recorder();
    report(Some(&progress), 1.5);
    report(Some(&progress), -0.2);
    report(None, 0.5);
    assert_eq!(*seen.lock(), vec![1.0, 0.0]);
}
