// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tokio::io::AsyncReadExt;

#[yare::parameterized(
    nested      = { "trajectory-t1/timestep-3.dump.gz", true },
    flat        = { "object", true },
    empty       = { "", false },
    absolute    = { "/etc/passwd", false },
    parent      = { "a/../b", false },
    current     = { "./a", false },
    double_sep  = { "a//b", false },
    trailing    = { "a/", false },
    backslash   = { "a\\b", false },
)]
fn object_name_validation(name: &str, ok: bool) {
    assert_eq!(validate_name(name).is_ok(), ok);
}

#[test]
fn upload_body_len() {
    assert_eq!(UploadBody::Bytes(vec![1, 2, 3]).len(), 3);
    assert!(UploadBody::Bytes(Vec::new()).is_empty());
    let staged = UploadBody::File { path: PathBuf::from("/tmp/x"), len: 42 };
    assert_eq!(staged.len(), 42);
}

#[test]
fn object_meta_builder() {
    let meta = ObjectMeta::new("application/gzip").encoding("gzip");
    assert_eq!(meta.content_type, "application/gzip");
    assert_eq!(meta.content_encoding.as_deref(), Some("gzip"));
}

#[tokio::test]
async fn fake_round_trips_and_records_calls() {
    let store = FakeBlobStore::new();
    let meta = ObjectMeta::new("text/plain");
    store.upload("p/a", UploadBody::Bytes(b"hello".to_vec()), &meta).await.unwrap();

    let mut body = Vec::new();
    store.get_stream("p/a").await.unwrap().read_to_end(&mut body).await.unwrap();
    assert_eq!(body, b"hello");
    assert_eq!(store.downloads(), vec!["p/a"]);
    assert_eq!(store.uploads(), vec!["p/a"]);
    assert_eq!(store.meta("p/a"), Some(meta));
    assert_eq!(store.stat("p/a").await.unwrap().size, 5);
}

#[tokio::test]
async fn fake_missing_object_is_not_found() {
    let store = FakeBlobStore::new();
    assert!(matches!(store.get_stream("nope").await, Err(BlobStoreError::NotFound(_))));
    assert!(matches!(store.stat("nope").await, Err(BlobStoreError::NotFound(_))));
    assert!(!store.exists("nope").await.unwrap());
}

#[tokio::test]
async fn fake_prefix_operations() {
    let store = FakeBlobStore::new();
    store.put_object("t1/b", b"1".to_vec());
    store.put_object("t1/a", b"2".to_vec());
    store.put_object("t10/a", b"3".to_vec());

    assert_eq!(store.list_by_prefix("t1/").await.unwrap(), vec!["t1/a", "t1/b"]);
    assert_eq!(store.delete_by_prefix("t1/").await.unwrap(), 2);
    assert_eq!(store.object_names(), vec!["t10/a"]);
}

#[tokio::test]
async fn fake_stat_failure_is_injectable() {
    let store = FakeBlobStore::new();
    store.put_object("a", b"x".to_vec());
    store.fail_stat_for("a");
    assert!(matches!(store.stat("a").await, Err(BlobStoreError::Backend(_))));
}
