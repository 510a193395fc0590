// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type that carries a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! directly, allowing `main()` to handle process termination.

use std::fmt;

/// Requested dump or trajectory does not exist
pub const EXIT_NOT_FOUND: i32 = 1;

/// Another process holds the trajectory's cleanup lock
pub const EXIT_LOCK_CONFLICT: i32 = 2;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(EXIT_NOT_FOUND, message)
    }

    pub fn lock_conflict(message: impl Into<String>) -> Self {
        Self::new(EXIT_LOCK_CONFLICT, message)
    }

    /// Exit code without a message, for yes/no style commands
    pub fn silent(code: i32) -> Self {
        Self::new(code, String::new())
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

/// Exit code and message for a failed command
pub fn exit_status(err: &anyhow::Error) -> (i32, Option<String>) {
    match err.downcast_ref::<ExitError>() {
        Some(exit) if exit.message.is_empty() => (exit.code, None),
        Some(exit) => (exit.code, Some(exit.message.clone())),
        None => (1, Some(format!("{err:#}"))),
    }
}

#[cfg(test)]
#[path = "exit_error_tests.rs"]
mod tests;
