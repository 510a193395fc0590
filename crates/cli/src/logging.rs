// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tracing_subscriber::EnvFilter;

/// Log to stderr so stdout stays clean for dump bytes and JSON output
pub fn init() {
    tracing_subscriber::fmt().with_env_filter(env_filter()).with_writer(std::io::stderr).with_target(false).init();
}

/// `DX_LOG`, then `RUST_LOG`, then `warn`
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("DX_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
