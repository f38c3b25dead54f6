// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! `formscout run`: one pass over the group sequence, right now.

use super::{spawn_spinner, GlobalArgs, Services};
use crate::progress::{self, Progress};
use anyhow::Result;
use chrono::Local;
use tracing::{error, info, warn};

/// Announce the start, then run the sequence from `group`.
///
/// Shared with the daily scheduler. Errors are returned after logging.
pub async fn run_task(services: &Services, args: &GlobalArgs, group: Option<&str>, single: bool) -> Result<()> {
    let started = Local::now().format("%Y-%m-%d %H:%M:%S");
    if !services
        .notifier
        .send_text(&format!("Starting form acquisition - {started}"))
        .await
    {
        warn!("start notification was not delivered");
    }

    let mut config = args.run_config(&services.table, group, single);
    info!(
        "run {} starting at group {} (single: {}, realtime write: {})",
        services.progress.run_id(),
        config.group_name,
        config.single_group,
        config.acquisition.realtime_write
    );
    match services.run_sequence(&mut config).await {
        Ok(groups) => {
            for stats in &groups {
                info!(
                    "group {}: {}/{} in {} batches ({})",
                    stats.group,
                    stats.actual,
                    stats.target,
                    stats.batches,
                    stats.status()
                );
            }
            Ok(())
        }
        Err(e) => {
            error!("run aborted: {e:#}");
            Err(e)
        }
    }
}

pub async fn run(args: &GlobalArgs, group: Option<&str>, single: bool) -> Result<()> {
    let (tx, rx) = progress::channel();
    let spinner = spawn_spinner(rx);
    let services = Services::from_args(args, Progress::new(tx))?;

    let result = run_task(&services, args, group, single).await;

    // Dropping the last sender closes the channel and stops the spinner.
    drop(services);
    if let Some(handle) = spinner {
        let _ = handle.await;
    }
    result
}
