// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job context, queue status records, and per-trajectory job metadata.

use crate::keys::fields;
use crate::trajectory::TrajectoryId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifies one job dispatched for a trajectory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobContext {
    pub trajectory_id: TrajectoryId,
    /// Queue namespace the job was dispatched to
    pub queue: String,
    pub job_id: String,
    pub team_id: Option<String>,
    pub session_id: Option<String>,
}

impl JobContext {
    pub fn new(trajectory_id: TrajectoryId, queue: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self { trajectory_id, queue: queue.into(), job_id: job_id.into(), team_id: None, session_id: None }
    }

    pub fn team_id(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// How a job left the active set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobOutcome {
    Completed,
    Failed,
}

crate::wire_name! {
    JobOutcome {
        Completed => "completed",
        Failed => "failed",
    }
}

/// Job state as published by the queues in their status blobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Retrying,
    #[serde(other)]
    Unknown,
}

crate::wire_name! {
    JobStatus {
        Queued => "queued",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Retrying => "retrying",
        Unknown => "unknown",
    }
}

impl JobStatus {
    /// Statuses that still claim the trajectory's artifacts
    pub const ACTIVE: [JobStatus; 3] = [JobStatus::Queued, JobStatus::Running, JobStatus::Retrying];

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "retrying" => Ok(Self::Retrying),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// Status blob stored by a queue under `<queue>_queue:status:<jobId>`.
///
/// Only the fields this crate reads are modelled; everything else in the
/// blob is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusRecord {
    pub job_id: String,
    #[serde(default)]
    pub trajectory_id: Option<String>,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
}

impl JobStatusRecord {
    pub fn belongs_to(&self, trajectory_id: &TrajectoryId) -> bool {
        self.trajectory_id.as_deref() == Some(trajectory_id.as_str())
    }
}

/// A status record found while scanning, with where it was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScannedJob {
    #[serde(flatten)]
    pub record: JobStatusRecord,
    pub queue: String,
    pub key: String,
}

/// Snapshot of a trajectory's tracking state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMetadata {
    /// Current value of the active-job counter
    pub active: i64,
    pub total_added: u64,
    pub total_completed: u64,
    pub total_failed: u64,
    pub first_job_at: Option<u64>,
    pub last_job_at: Option<u64>,
    pub queues: Vec<String>,
}

impl JobMetadata {
    /// Build from the raw metadata hash. Missing or malformed fields read as
    /// zero / absent.
    pub fn from_hash(active: i64, hash: &HashMap<String, String>, mut queues: Vec<String>) -> Self {
        let number = |field: &str| hash.get(field).and_then(|v| v.parse::<u64>().ok());
        queues.sort();
        Self {
            active,
            total_added: number(fields::TOTAL_ADDED).unwrap_or(0),
            total_completed: number(fields::TOTAL_COMPLETED).unwrap_or(0),
            total_failed: number(fields::TOTAL_FAILED).unwrap_or(0),
            first_job_at: number(fields::FIRST_JOB_AT),
            last_job_at: number(fields::LAST_JOB_AT),
            queues,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
