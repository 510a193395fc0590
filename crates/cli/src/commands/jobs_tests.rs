// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::exit_error::exit_status;
use serial_test::serial;

#[test]
#[serial]
fn queues_come_from_environment() {
    std::env::set_var("DX_QUEUES", "rasterizer,cloud-upload");
    assert_eq!(tracker_config().queues, ["rasterizer", "cloud-upload"]);
    std::env::remove_var("DX_QUEUES");
    assert_eq!(tracker_config(), TrackerConfig::default());
}

#[test]
fn lock_conflict_exits_with_code_two() {
    let id = TrajectoryId::parse("traj-1").unwrap();
    let err = lock_conflict(TrackerError::LockConflict(id));
    let (code, message) = exit_status(&err);
    assert_eq!(code, 2);
    assert!(message.unwrap().contains("traj-1"));
}

#[test]
fn other_tracker_errors_exit_one() {
    let err = lock_conflict(TrackerError::Cleanup(dx_adapters::CleanupError::Failed("boom".into())));
    assert_eq!(exit_status(&err).0, 1);
}
