// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_is_past_2024() {
    assert!(SystemClock.epoch_ms() > 1_704_067_200_000);
}

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::starting_at(10_000);
    clock.advance(Duration::from_secs(60));
    assert_eq!(clock.epoch_ms(), 70_000);
}

#[test]
fn fake_clock_clones_share_time() {
    let a = FakeClock::new();
    let b = a.clone();
    b.advance(Duration::from_millis(5));
    assert_eq!(a.epoch_ms(), b.epoch_ms());
    assert_eq!(a.epoch_ms(), 1_700_000_000_005);
}

#[test]
fn expiry_after_adds_ttl() {
    let clock = FakeClock::starting_at(1_000);
    assert_eq!(clock.expiry_after(Duration::from_secs(60)), 61_000);
}

#[test]
fn expiry_after_saturates() {
    let clock = FakeClock::starting_at(u64::MAX - 1);
    assert_eq!(clock.expiry_after(Duration::from_secs(1)), u64::MAX);
}
