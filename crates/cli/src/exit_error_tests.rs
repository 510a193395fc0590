// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use anyhow::Context;

#[test]
fn typed_exit_errors_keep_their_code() {
    let err = anyhow::Error::new(ExitError::lock_conflict("busy"));
    assert_eq!(exit_status(&err), (2, Some("busy".to_string())));
}

#[test]
fn silent_errors_print_nothing() {
    let err = anyhow::Error::new(ExitError::silent(EXIT_NOT_FOUND));
    assert_eq!(exit_status(&err), (1, None));
}

#[test]
fn other_errors_exit_one_with_context_chain() {
    let err = Err::<(), _>(std::io::Error::other("disk gone")).context("saving dump").unwrap_err();
    assert_eq!(exit_status(&err), (1, Some("saving dump: disk gone".to_string())));
}
