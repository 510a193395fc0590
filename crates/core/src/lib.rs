// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dx-core: domain types shared by the dump storage and job tracking crates

pub mod macros;

pub mod clock;
pub mod dump;
pub mod job;
pub mod keys;
pub mod trajectory;

pub use clock::{Clock, FakeClock, SystemClock};
pub use dump::{parse_timestep, DumpKey, DUMP_CONTENT_ENCODING, DUMP_CONTENT_TYPE};
pub use job::{JobContext, JobMetadata, JobOutcome, JobStatus, JobStatusRecord, ScannedJob};
pub use keys::{JobKeys, COUNTER_PATTERN};
pub use trajectory::{InvalidTrajectoryId, TrajectoryId};
