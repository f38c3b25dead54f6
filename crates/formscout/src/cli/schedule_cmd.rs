// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! `formscout schedule`: run the group sequence every day at a fixed time.

use super::run_cmd::run_task;
use super::{spawn_spinner, GlobalArgs, Services};
use crate::daily::{parse_run_time, run_daily};
use crate::progress::{self, Progress};
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{info, warn};

/// PID file used by `schedule --daemon`.
pub fn pid_file_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".formscout/formscout.pid")
}

/// PID of a live scheduler, if any. Removes a stale PID file.
pub fn check_already_running() -> Option<i32> {
    let pid_path = pid_file_path();
    let pid: i32 = std::fs::read_to_string(&pid_path).ok()?.trim().parse().ok()?;

    #[cfg(unix)]
    {
        let output = std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .output();
        if matches!(output, Ok(o) if o.status.success()) {
            return Some(pid);
        }
    }

    let _ = std::fs::remove_file(&pid_path);
    None
}

pub async fn run(args: &GlobalArgs, time: &str, daemon: bool) -> Result<()> {
    let at = parse_run_time(time)?;

    let pid_path = pid_file_path();
    if daemon {
        if let Some(pid) = check_already_running() {
            bail!("scheduler already running (PID {pid})");
        }
        if let Some(parent) = pid_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        std::fs::write(&pid_path, std::process::id().to_string())
            .context("failed to write PID file")?;
        info!("scheduler PID {} written to {}", std::process::id(), pid_path.display());
    }

    let (tx, rx) = progress::channel();
    let spinner = if daemon { None } else { spawn_spinner(rx) };
    let services = Services::from_args(args, Progress::new(tx))?;

    let shutdown = Arc::new(Notify::new());
    let signal = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received shutdown signal");
        signal.notify_one();
    });

    let services_ref = &services;
    run_daily(at, shutdown, || async move {
        if let Err(e) = run_task(services_ref, args, None, false).await {
            warn!("daily run failed, retrying tomorrow: {e:#}");
        }
    })
    .await;

    drop(services);
    if let Some(handle) = spinner {
        let _ = handle.await;
    }
    if daemon {
        let _ = std::fs::remove_file(&pid_path);
    }
    info!("scheduler stopped");
    Ok(())
}
