// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn tid(s: &str) -> TrajectoryId {
    TrajectoryId::parse(s).unwrap()
}

#[tokio::test]
async fn noop_index_never_reports_unfinished() {
    assert!(!NoopAnalysisIndex::new().has_unfinished(&tid("t1")).await.unwrap());
}

#[tokio::test]
async fn fake_index_tracks_unfinished_set() {
    let index = FakeAnalysisIndex::new();
    index.set_unfinished(&tid("t1"), true);

    assert!(index.has_unfinished(&tid("t1")).await.unwrap());
    assert!(!index.has_unfinished(&tid("t2")).await.unwrap());

    index.set_unfinished(&tid("t1"), false);
    assert!(!index.has_unfinished(&tid("t1")).await.unwrap());
    assert_eq!(index.queries().len(), 3);
}

#[tokio::test]
async fn fake_index_failure_surfaces() {
    let index = FakeAnalysisIndex::new();
    index.set_failing(true);
    assert!(index.has_unfinished(&tid("t1")).await.is_err());
}
