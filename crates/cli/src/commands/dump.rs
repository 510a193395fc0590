// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dump command handlers

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;

use dx_adapters::FsBlobStore;
use dx_core::TrajectoryId;
use dx_storage::{DumpSource, DumpStorage, DumpStorageConfig};

use crate::env;
use crate::exit_error::{ExitError, EXIT_NOT_FOUND};
use crate::output::{format_bytes, print_json, OutputFormat};

#[derive(Args)]
pub struct DumpArgs {
    #[command(subcommand)]
    pub command: DumpCommand,
}

#[derive(Subcommand)]
pub enum DumpCommand {
    /// Compress and upload a dump file
    Save {
        trajectory: TrajectoryId,
        timestep: u64,
        /// Uncompressed dump file
        file: PathBuf,
    },
    /// Fetch a dump into the local cache and print its path
    Get { trajectory: TrajectoryId, timestep: u64 },
    /// Write a decompressed dump to stdout
    Cat { trajectory: TrajectoryId, timestep: u64 },
    /// List stored timesteps of a trajectory
    List { trajectory: TrajectoryId },
    /// Total stored (compressed) size of a trajectory's dumps
    Size { trajectory: TrajectoryId },
    /// Delete every dump of a trajectory, remote and cached
    Rm { trajectory: TrajectoryId },
    /// Exit 0 if the dump exists, 1 otherwise
    Exists { trajectory: TrajectoryId, timestep: u64 },
    /// Empty the local dump cache
    ClearCache,
}

/// Storage over the filesystem bucket `<object root>/<bucket>`
pub fn storage() -> DumpStorage<FsBlobStore> {
    let store = FsBlobStore::new(env::object_root().join(env::bucket()));
    let mut config = DumpStorageConfig::new(env::cache_dir());
    tracing::debug!(objects = %store.root().display(), cache = %config.cache_root().display(), "dump storage");
    if let Some(ttl) = env::cache_ttl() {
        config = config.cache_ttl(ttl);
    }
    DumpStorage::new(store, config)
}

fn missing(trajectory: &TrajectoryId, timestep: u64) -> anyhow::Error {
    ExitError::not_found(format!("no dump for trajectory {trajectory} at timestep {timestep}")).into()
}

pub async fn handle(command: DumpCommand, storage: &DumpStorage<FsBlobStore>, format: OutputFormat) -> Result<()> {
    match command {
        DumpCommand::Save { trajectory, timestep, file } => {
            if !tokio::fs::try_exists(&file).await.unwrap_or(false) {
                anyhow::bail!("dump file not found: {}", file.display());
            }
            let object = storage
                .save_dump(&trajectory, timestep, DumpSource::Path(file), None)
                .await
                .with_context(|| format!("saving dump {trajectory}/{timestep}"))?;
            match format {
                OutputFormat::Text => println!("{object}"),
                OutputFormat::Json => print_json(&serde_json::json!({ "object": object }))?,
            }
        }
        DumpCommand::Get { trajectory, timestep } => {
            let path = storage.get_dump(&trajectory, timestep).await?.ok_or_else(|| missing(&trajectory, timestep))?;
            match format {
                OutputFormat::Text => println!("{}", path.display()),
                OutputFormat::Json => print_json(&serde_json::json!({ "path": path }))?,
            }
        }
        DumpCommand::Cat { trajectory, timestep } => {
            let mut file = storage
                .get_dump_stream(&trajectory, timestep)
                .await?
                .ok_or_else(|| missing(&trajectory, timestep))?;
            let mut stdout = tokio::io::stdout();
            tokio::io::copy(&mut file, &mut stdout).await?;
            tokio::io::AsyncWriteExt::flush(&mut stdout).await?;
        }
        DumpCommand::List { trajectory } => {
            let timesteps = storage.list_dumps(&trajectory).await?;
            match format {
                OutputFormat::Text => {
                    for timestep in &timesteps {
                        println!("{timestep}");
                    }
                }
                OutputFormat::Json => print_json(&timesteps)?,
            }
        }
        DumpCommand::Size { trajectory } => {
            let bytes = storage.calculate_size(&trajectory).await?;
            match format {
                OutputFormat::Text => println!("{} ({bytes} bytes)", format_bytes(bytes)),
                OutputFormat::Json => print_json(&serde_json::json!({ "bytes": bytes }))?,
            }
        }
        DumpCommand::Rm { trajectory } => {
            let deleted = storage.delete_dumps(&trajectory).await?;
            match format {
                OutputFormat::Text => println!("Deleted {deleted} dump(s) of {trajectory}"),
                OutputFormat::Json => print_json(&serde_json::json!({ "deleted": deleted }))?,
            }
        }
        DumpCommand::Exists { trajectory, timestep } => {
            let exists = storage.exists(&trajectory, timestep).await?;
            if format == OutputFormat::Json {
                print_json(&serde_json::json!({ "exists": exists }))?;
            }
            if !exists {
                return Err(ExitError::silent(EXIT_NOT_FOUND).into());
            }
        }
        DumpCommand::ClearCache => {
            storage.clear_cache().await?;
            match format {
                OutputFormat::Text => println!("Cleared {}", storage.config().cache_root().display()),
                OutputFormat::Json => print_json(&serde_json::json!({ "cleared": storage.config().cache_root() }))?,
            }
        }
    }
    Ok(())
}
