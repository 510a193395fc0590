// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live queue state.
//!
//! Queues publish a JSON status blob per job under
//! `<queue>_queue:status:<jobId>`. Scanning every queue's status keys is the
//! authoritative answer to "does this trajectory still have work".

use crate::config::ANALYSIS_QUEUE;
use dx_adapters::{CoordinationError, CoordinationStore};
use dx_core::keys::{job_retries_key, queue_status_pattern};
use dx_core::{JobStatus, JobStatusRecord, ScannedJob, TrajectoryId};
use std::collections::BTreeSet;

#[derive(Clone)]
pub struct QueueScanner<S> {
    store: S,
    queues: Vec<String>,
    batch: usize,
}

impl<S: CoordinationStore> QueueScanner<S> {
    pub fn new(store: S, queues: Vec<String>, batch: usize) -> Self {
        Self { store, queues, batch: batch.max(1) }
    }

    pub fn queues(&self) -> &[String] {
        &self.queues
    }

    /// Every status record of `trajectory_id` across all queues, optionally
    /// limited to `statuses`
    pub async fn scan_jobs(
        &self,
        trajectory_id: &TrajectoryId,
        statuses: Option<&[JobStatus]>,
    ) -> Result<Vec<ScannedJob>, CoordinationError> {
        let mut jobs = Vec::new();
        for queue in &self.queues {
            let keys = self.store.scan(&queue_status_pattern(queue)).await?;
            for chunk in keys.chunks(self.batch) {
                let values = self.store.get_many(chunk).await?;
                for (key, raw) in chunk.iter().zip(values) {
                    // Expired or deleted since the scan
                    let Some(raw) = raw else { continue };
                    let record: JobStatusRecord = match serde_json::from_str(&raw) {
                        Ok(record) => record,
                        Err(e) => {
                            tracing::warn!(%key, error = %e, "skipping unparseable job status");
                            continue;
                        }
                    };
                    if !record.belongs_to(trajectory_id) {
                        continue;
                    }
                    if statuses.is_some_and(|s| !s.contains(&record.status)) {
                        continue;
                    }
                    jobs.push(ScannedJob { record, queue: queue.clone(), key: key.clone() });
                }
            }
        }
        Ok(jobs)
    }

    /// Jobs still queued, running, or retrying
    pub async fn count_active(&self, trajectory_id: &TrajectoryId) -> Result<usize, CoordinationError> {
        let active = self.scan_jobs(trajectory_id, Some(&JobStatus::ACTIVE)).await?;
        for job in &active {
            tracing::debug!(
                %trajectory_id,
                queue = %job.queue,
                job_id = %job.record.job_id,
                status = %job.record.status,
                "found active job"
            );
        }
        Ok(active.len())
    }

    /// Delete each job's status key and retry counter. Returns how many jobs
    /// were removed; a failure on one job does not stop the rest.
    pub async fn delete_jobs(&self, jobs: &[ScannedJob]) -> usize {
        let mut deleted = 0;
        for job in jobs {
            let keys = [job.key.clone(), job_retries_key(&job.record.job_id)];
            match self.store.delete(&keys).await {
                Ok(_) => deleted += 1,
                Err(e) => tracing::error!(job_id = %job.record.job_id, error = %e, "failed to delete job"),
            }
        }
        deleted
    }
}

/// Analysis ids referenced by `jobs`: the explicit `analysisId` field, or
/// for analysis-queue jobs the job id minus its trailing `-<frameIndex>`
pub fn analysis_ids(jobs: &[ScannedJob]) -> Vec<String> {
    let mut ids = BTreeSet::new();
    for job in jobs {
        if job.queue == ANALYSIS_QUEUE {
            if let Some((analysis, _frame)) = job.record.job_id.rsplit_once('-') {
                if !analysis.is_empty() {
                    ids.insert(analysis.to_string());
                }
            }
        }
        if let Some(id) = &job.record.analysis_id {
            ids.insert(id.clone());
        }
    }
    ids.into_iter().collect()
}

#[cfg(test)]
#[path = "scanner_tests.rs"]
mod tests;
