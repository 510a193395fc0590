// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    zero = { 0, "0 B" },
    below_kib = { 1023, "1023 B" },
    one_kib = { 1024, "1.0 KiB" },
    mib_and_a_half = { 1024 * 1024 * 3 / 2, "1.5 MiB" },
    gib = { 5 * 1024 * 1024 * 1024, "5.0 GiB" },
)]
fn bytes(n: u64, expected: &str) {
    assert_eq!(format_bytes(n), expected);
}

#[parameterized(
    seconds = { 59, "59s" },
    minutes = { 125, "2m" },
    hours = { 7200, "2h" },
    days = { 3 * 86_400 + 5, "3d" },
)]
fn elapsed(secs: u64, expected: &str) {
    assert_eq!(format_elapsed(secs), expected);
}

#[test]
fn time_ago_handles_missing_and_future_stamps() {
    assert_eq!(format_time_ago(None, 10_000), "-");
    assert_eq!(format_time_ago(Some(4_000), 10_000), "6s ago");
    assert_eq!(format_time_ago(Some(20_000), 10_000), "0s ago");
}
