// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job tracking command handlers

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use dx_adapters::{DirectoryCleanup, NoopAnalysisIndex, RedisCoordinationStore};
use dx_core::{Clock, JobStatus, SystemClock, TrajectoryId};
use dx_engine::{analysis_ids, ClearOutcome, JobTracker, TrackerConfig, TrackerDeps, TrackerError};

use crate::color;
use crate::env;
use crate::exit_error::ExitError;
use crate::output::{format_time_ago, print_json, OutputFormat};

pub type CliTracker = JobTracker<RedisCoordinationStore, NoopAnalysisIndex, DirectoryCleanup, SystemClock>;

#[derive(Args)]
pub struct JobsArgs {
    #[command(subcommand)]
    pub command: JobsCommand,
}

#[derive(Subcommand)]
pub enum JobsCommand {
    /// Reset every job counter from the live queues
    Recover,
    /// Show the job counter and totals of a trajectory
    Show { trajectory: TrajectoryId },
    /// List job records of a trajectory across all queues
    Scan {
        trajectory: TrajectoryId,
        /// Only jobs in this status (repeatable)
        #[arg(long = "status", value_name = "STATUS")]
        status: Vec<JobStatus>,
    },
    /// Delete the job history of a trajectory
    Clear {
        trajectory: TrajectoryId,
        /// Only delete queued, running and retrying jobs
        #[arg(long)]
        active_only: bool,
    },
}

pub fn tracker_config() -> TrackerConfig {
    match env::queues() {
        Some(queues) => TrackerConfig::default().queues(queues),
        None => TrackerConfig::default(),
    }
}

pub async fn connect() -> Result<CliTracker> {
    let url = env::redis_url();
    tracing::debug!(%url, "connecting to coordination store");
    let store = RedisCoordinationStore::connect(&url)
        .await
        .with_context(|| format!("connecting to coordination store at {url}"))?;
    let deps = TrackerDeps {
        store,
        analyses: NoopAnalysisIndex::new(),
        cleanup: DirectoryCleanup::new(env::artifact_dirs()),
    };
    Ok(JobTracker::new(deps, tracker_config(), SystemClock))
}

fn lock_conflict(err: TrackerError) -> anyhow::Error {
    match err {
        TrackerError::LockConflict(id) => {
            ExitError::lock_conflict(format!("trajectory {id} is being cleaned up by another process")).into()
        }
        other => other.into(),
    }
}

pub async fn handle(command: JobsCommand, tracker: &CliTracker, format: OutputFormat) -> Result<()> {
    match command {
        JobsCommand::Recover => {
            let reset = tracker.recover_counters().await?;
            match format {
                OutputFormat::Text => println!("Reset {reset} job counter(s)"),
                OutputFormat::Json => print_json(&serde_json::json!({ "reset": reset }))?,
            }
        }
        JobsCommand::Show { trajectory } => {
            let meta = tracker
                .job_metadata(&trajectory)
                .await?
                .ok_or_else(|| ExitError::not_found(format!("no job tracking for trajectory {trajectory}")))?;
            match format {
                OutputFormat::Text => {
                    let now = SystemClock.epoch_ms();
                    println!("{} {}", color::header("Trajectory:"), trajectory);
                    println!("{} {}", color::header("Active:"), meta.active);
                    println!(
                        "{} {} added, {} completed, {} failed",
                        color::header("Totals:"),
                        meta.total_added,
                        meta.total_completed,
                        meta.total_failed
                    );
                    println!("{} {}", color::header("First job:"), format_time_ago(meta.first_job_at, now));
                    println!("{} {}", color::header("Last job:"), format_time_ago(meta.last_job_at, now));
                    println!("{} {}", color::header("Queues:"), meta.queues.join(", "));
                }
                OutputFormat::Json => print_json(&meta)?,
            }
        }
        JobsCommand::Scan { trajectory, status } => {
            let filter = (!status.is_empty()).then_some(status.as_slice());
            let jobs = tracker.scan_jobs(&trajectory, filter).await?;
            let analyses = analysis_ids(&jobs);
            match format {
                OutputFormat::Text => {
                    if jobs.is_empty() {
                        println!("No jobs found for {trajectory}");
                    }
                    for job in &jobs {
                        println!(
                            "{:<24} {:<10} {} {}",
                            job.queue,
                            job.record.status.as_str(),
                            job.record.job_id,
                            color::muted(&job.key)
                        );
                    }
                    if !analyses.is_empty() {
                        println!("{} {}", color::header("Analyses:"), analyses.join(", "));
                    }
                }
                OutputFormat::Json => print_json(&serde_json::json!({ "jobs": jobs, "analysisIds": analyses }))?,
            }
        }
        JobsCommand::Clear { trajectory, active_only } => {
            let outcome: ClearOutcome = if active_only {
                tracker.remove_active_jobs(&trajectory).await
            } else {
                tracker.clear_history(&trajectory).await
            }
            .map_err(lock_conflict)?;
            match format {
                OutputFormat::Text => println!("Deleted {} job(s) of {trajectory}", outcome.deleted_jobs),
                OutputFormat::Json => print_json(&outcome)?,
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
