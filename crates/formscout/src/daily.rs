// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Daily timer: runs a task once a day at a fixed local time until shutdown
//! is signaled.

use crate::error::ScoutError;
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Notify;

/// Parse an `HH:MM` run time.
pub fn parse_run_time(raw: &str) -> Result<NaiveTime, ScoutError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|e| ScoutError::Config(format!("invalid run time '{raw}' (expected HH:MM): {e}")))
}

/// First moment strictly after `now` whose time of day is `at`.
pub fn next_run_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}

/// Call `task` every day at `at` until `shutdown` is notified.
///
/// A run in progress is not interrupted; shutdown is observed while waiting.
pub async fn run_daily<F, Fut>(at: NaiveTime, shutdown: Arc<Notify>, mut task: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    tracing::info!("daily schedule set for {}", at.format("%H:%M"));
    loop {
        let now = Local::now().naive_local();
        let next = next_run_after(now, at);
        let wait = (next - now).to_std().unwrap_or_default();
        tracing::info!("next run at {next} (in {}s)", wait.as_secs());

        tokio::select! {
            _ = shutdown.notified() => {
                tracing::info!("scheduler stopping");
                break;
            }
            _ = tokio::time::sleep(wait) => {
                task().await;
            }
        }
    }
}
