// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Persistence sinks for qualifying rows.
//!
//! Every sink appends `[href, param, date, owner, status]` rows to a named
//! worksheet and silently skips rows whose href the worksheet already holds.

pub mod sheets;
pub mod sqlite;

pub use sheets::SheetsSink;
pub use sqlite::SqliteSink;

use crate::record::SheetRow;
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// Outcome of one append call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AppendSummary {
    pub appended: usize,
    /// Rows skipped because their href was already present.
    pub duplicates: usize,
}

/// Destination for qualifying rows, deduplicated by href.
#[async_trait]
pub trait RowSink: Send + Sync {
    /// Append rows to `worksheet`.
    async fn append(&self, worksheet: &str, rows: &[SheetRow]) -> Result<AppendSummary>;
    /// Human-readable destination, for logs and the doctor report.
    fn describe(&self) -> String;
}

/// Append with up to `attempts` tries, sleeping `base * 2^(n-1)` after the
/// n-th failure.
pub async fn write_with_retry(
    sink: &dyn RowSink,
    worksheet: &str,
    rows: &[SheetRow],
    attempts: u32,
    base: Duration,
) -> Result<AppendSummary> {
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match sink.append(worksheet, rows).await {
            Ok(summary) => {
                info!(
                    "wrote {} rows to {} ({} duplicates skipped)",
                    summary.appended,
                    sink.describe(),
                    summary.duplicates
                );
                return Ok(summary);
            }
            Err(e) if attempt < attempts => {
                let delay = base * 2u32.saturating_pow(attempt - 1);
                warn!("write attempt {attempt}/{attempts} failed, retrying in {delay:?}: {e:#}");
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return Err(e.context(format!("write failed after {attempts} attempts")));
            }
        }
    }
}
