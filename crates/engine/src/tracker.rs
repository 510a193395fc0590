// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job completion tracker.
//!
//! Workers report each enqueue and each completion. The per-trajectory
//! counter only decides *when* to look: once it drops to zero the tracker
//! takes the cleanup lease, confirms against the live queues and the
//! analysis index that nothing is outstanding, and only then runs cleanup
//! and drops the tracking keys.

use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::lease::CleanupLease;
use crate::scanner::QueueScanner;
use dx_adapters::{AnalysisIndex, CleanupExecutor, CoordinationStore};
use dx_core::{
    keys::parse_counter_key, Clock, JobContext, JobKeys, JobMetadata, JobOutcome, JobStatus, ScannedJob,
    TrajectoryId, COUNTER_PATTERN,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// Collaborators a tracker runs against
pub struct TrackerDeps<S, A, X> {
    pub store: S,
    pub analyses: A,
    pub cleanup: X,
}

/// Result of an administrative history operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearOutcome {
    pub deleted_jobs: usize,
}

/// Marks a trajectory as being verified by this process until dropped
struct InProgressGuard {
    set: Arc<Mutex<HashSet<TrajectoryId>>>,
    trajectory_id: TrajectoryId,
}

impl InProgressGuard {
    fn enter(set: &Arc<Mutex<HashSet<TrajectoryId>>>, trajectory_id: &TrajectoryId) -> Option<Self> {
        if !set.lock().insert(trajectory_id.clone()) {
            return None;
        }
        Some(Self { set: Arc::clone(set), trajectory_id: trajectory_id.clone() })
    }
}

impl Drop for InProgressGuard {
    fn drop(&mut self) {
        self.set.lock().remove(&self.trajectory_id);
    }
}

#[derive(Clone)]
pub struct JobTracker<S, A, X, C: Clock> {
    store: S,
    analyses: A,
    cleanup: X,
    clock: C,
    config: TrackerConfig,
    scanner: QueueScanner<S>,
    in_progress: Arc<Mutex<HashSet<TrajectoryId>>>,
}

impl<S, A, X, C> JobTracker<S, A, X, C>
where
    S: CoordinationStore,
    A: AnalysisIndex,
    X: CleanupExecutor,
    C: Clock,
{
    pub fn new(deps: TrackerDeps<S, A, X>, config: TrackerConfig, clock: C) -> Self {
        let scanner = QueueScanner::new(deps.store.clone(), config.queues.clone(), config.scan_batch);
        Self {
            store: deps.store,
            analyses: deps.analyses,
            cleanup: deps.cleanup,
            clock,
            config,
            scanner,
            in_progress: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn scanner(&self) -> &QueueScanner<S> {
        &self.scanner
    }

    /// Record a job enqueued for `ctx.trajectory_id`. Returns the new count.
    pub async fn increment_job_count(&self, ctx: &JobContext) -> Result<i64, TrackerError> {
        let keys = JobKeys::new(&ctx.trajectory_id);
        let count = self
            .store
            .increment_jobs(&keys, &ctx.queue, self.clock.epoch_ms(), self.config.counter_ttl)
            .await?;
        tracing::info!(
            trajectory_id = %ctx.trajectory_id,
            queue = %ctx.queue,
            job_id = %ctx.job_id,
            count,
            "job count incremented"
        );
        Ok(count)
    }

    /// Record a finished job. Returns whether this call ran cleanup.
    pub async fn decrement_job_count(&self, ctx: &JobContext, outcome: JobOutcome) -> Result<bool, TrackerError> {
        let keys = JobKeys::new(&ctx.trajectory_id);
        let transition = self
            .store
            .decrement_jobs(&keys, outcome, self.clock.epoch_ms(), self.config.counter_ttl)
            .await?;
        tracing::info!(
            trajectory_id = %ctx.trajectory_id,
            queue = %ctx.queue,
            job_id = %ctx.job_id,
            %outcome,
            before = transition.before,
            after = transition.after,
            "job count decremented"
        );
        if !transition.reached_zero() {
            return Ok(false);
        }
        if transition.after < 0 {
            tracing::warn!(trajectory_id = %ctx.trajectory_id, count = transition.after, "job counter went negative");
        }
        self.verify_and_cleanup(&ctx.trajectory_id).await
    }

    /// Confirm nothing is outstanding for `trajectory_id` and clean it up.
    ///
    /// Returns false without error when another holder is already handling
    /// the trajectory or when verification finds remaining work. Cleanup
    /// failures propagate and leave the tracking keys in place for a retry.
    pub async fn verify_and_cleanup(&self, trajectory_id: &TrajectoryId) -> Result<bool, TrackerError> {
        let Some(_guard) = InProgressGuard::enter(&self.in_progress, trajectory_id) else {
            tracing::warn!(%trajectory_id, "cleanup already in progress in this process");
            return Ok(false);
        };

        let keys = JobKeys::new(trajectory_id);
        let lease =
            CleanupLease::acquire(&self.store, &keys.cleanup_lock, self.config.lock_ttl, self.clock.epoch_ms())
                .await?;
        let Some(lease) = lease else {
            tracing::warn!(%trajectory_id, "cleanup lock held elsewhere, skipping");
            return Ok(false);
        };
        tracing::info!(%trajectory_id, "cleanup lock acquired");

        let result = self.verify_locked(trajectory_id, &keys).await;
        self.release(trajectory_id, lease).await;
        result
    }

    async fn verify_locked(&self, trajectory_id: &TrajectoryId, keys: &JobKeys) -> Result<bool, TrackerError> {
        let active = self.scanner.count_active(trajectory_id).await?;
        if active > 0 {
            tracing::warn!(%trajectory_id, active, "counter disagrees with live queues, resetting");
            self.store.set_counter(&keys.counter, active as i64, self.config.counter_ttl).await?;
            return Ok(false);
        }

        if self.analyses.has_unfinished(trajectory_id).await? {
            tracing::info!(%trajectory_id, "analysis still running, deferring cleanup");
            return Ok(false);
        }

        if let Err(e) = self.cleanup.cleanup(trajectory_id).await {
            tracing::error!(%trajectory_id, error = %e, "cleanup failed, keeping job tracking keys");
            return Err(e.into());
        }
        let removed = self.store.delete(&keys.tracking()).await?;
        tracing::info!(%trajectory_id, removed_keys = removed, "cleanup executed");
        Ok(true)
    }

    async fn release(&self, trajectory_id: &TrajectoryId, lease: CleanupLease) {
        match lease.release(&self.store).await {
            Ok(true) => tracing::info!(%trajectory_id, "cleanup lock released"),
            Ok(false) => tracing::warn!(%trajectory_id, "cleanup lock expired before release"),
            Err(e) => tracing::warn!(%trajectory_id, error = %e, "failed to release cleanup lock"),
        }
    }

    /// Overwrite the counter with the number of active jobs in the queues
    pub async fn reset_counter(&self, trajectory_id: &TrajectoryId) -> Result<usize, TrackerError> {
        let active = self.scanner.count_active(trajectory_id).await?;
        let keys = JobKeys::new(trajectory_id);
        self.store.set_counter(&keys.counter, active as i64, self.config.counter_ttl).await?;
        tracing::info!(%trajectory_id, active, "job counter reset");
        Ok(active)
    }

    /// Reset every live counter from the queues. Run once at startup.
    /// Never triggers cleanup. Returns the number of counters reset.
    pub async fn recover_counters(&self) -> Result<usize, TrackerError> {
        let mut trajectories = BTreeSet::new();
        for key in self.store.scan(COUNTER_PATTERN).await? {
            let Some(raw) = parse_counter_key(&key) else { continue };
            match TrajectoryId::parse(raw) {
                Ok(id) => {
                    trajectories.insert(id);
                }
                Err(e) => tracing::warn!(%key, error = %e, "ignoring counter with invalid trajectory id"),
            }
        }

        for trajectory_id in &trajectories {
            self.reset_counter(trajectory_id).await?;
        }
        tracing::info!(counters = trajectories.len(), "job counters recovered");
        Ok(trajectories.len())
    }

    /// Counter and metadata for `trajectory_id`, or `None` if untracked
    pub async fn job_metadata(&self, trajectory_id: &TrajectoryId) -> Result<Option<JobMetadata>, TrackerError> {
        let keys = JobKeys::new(trajectory_id);
        let active = self.store.get_counter(&keys.counter).await?;
        let hash = self.store.hash_get_all(&keys.metadata).await?;
        if active.is_none() && hash.is_empty() {
            return Ok(None);
        }
        let queues = self.store.set_members(&keys.queues).await?;
        Ok(Some(JobMetadata::from_hash(active.unwrap_or(0), &hash, queues)))
    }

    pub async fn scan_jobs(
        &self,
        trajectory_id: &TrajectoryId,
        statuses: Option<&[JobStatus]>,
    ) -> Result<Vec<ScannedJob>, TrackerError> {
        Ok(self.scanner.scan_jobs(trajectory_id, statuses).await?)
    }

    pub async fn failed_jobs(&self, trajectory_id: &TrajectoryId) -> Result<Vec<ScannedJob>, TrackerError> {
        self.scan_jobs(trajectory_id, Some(&[JobStatus::Failed])).await
    }

    /// Delete every job record of `trajectory_id` and its tracking keys
    pub async fn clear_history(&self, trajectory_id: &TrajectoryId) -> Result<ClearOutcome, TrackerError> {
        let keys = JobKeys::new(trajectory_id);
        let lease = self.admin_lease(trajectory_id, &keys).await?;
        let result = async {
            let jobs = self.scanner.scan_jobs(trajectory_id, None).await?;
            let deleted_jobs = self.scanner.delete_jobs(&jobs).await;
            self.store.delete(&keys.tracking()).await?;
            tracing::info!(%trajectory_id, deleted_jobs, "job history cleared");
            Ok::<_, TrackerError>(ClearOutcome { deleted_jobs })
        }
        .await;
        self.release(trajectory_id, lease).await;
        result
    }

    /// Delete queued, running and retrying jobs of `trajectory_id`. The
    /// tracking keys go too once no job record is left.
    pub async fn remove_active_jobs(&self, trajectory_id: &TrajectoryId) -> Result<ClearOutcome, TrackerError> {
        let keys = JobKeys::new(trajectory_id);
        let lease = self.admin_lease(trajectory_id, &keys).await?;
        let result = async {
            let active = self.scanner.scan_jobs(trajectory_id, Some(&JobStatus::ACTIVE)).await?;
            if active.is_empty() {
                return Ok::<_, TrackerError>(ClearOutcome { deleted_jobs: 0 });
            }
            let deleted_jobs = self.scanner.delete_jobs(&active).await;
            if self.scanner.scan_jobs(trajectory_id, None).await?.is_empty() {
                self.store.delete(&keys.tracking()).await?;
            }
            tracing::info!(%trajectory_id, deleted_jobs, "active jobs removed");
            Ok::<_, TrackerError>(ClearOutcome { deleted_jobs })
        }
        .await;
        self.release(trajectory_id, lease).await;
        result
    }

    async fn admin_lease(&self, trajectory_id: &TrajectoryId, keys: &JobKeys) -> Result<CleanupLease, TrackerError> {
        let ttl = self.config.admin_lock_ttl;
        CleanupLease::acquire(&self.store, &keys.cleanup_lock, ttl, self.clock.epoch_ms())
            .await?
            .ok_or_else(|| TrackerError::LockConflict(trajectory_id.clone()))
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
