// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Runs the acquisition loop across the ordered group sequence and sends the
//! summary report after the last group.

use crate::acquisition::AcquisitionLoop;
use crate::config::{GroupTable, RunConfig};
use crate::notify::Notifier;
use crate::stats::{GroupStats, RunContext};
use anyhow::Result;
use chrono::Local;
use std::sync::Arc;
use tracing::{info, warn};

/// What happens after a group finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceStep {
    /// The config now targets this group; run it next.
    Next(String),
    /// The last group finished; the report was sent and statistics cleared.
    Reported,
    /// Nothing follows (single-group override or group outside the sequence).
    Stop,
}

/// Chains group runs in a fixed order.
pub struct RunSequencer {
    table: GroupTable,
    sequence: Vec<String>,
    acquisition: AcquisitionLoop,
    notifier: Arc<dyn Notifier>,
    report_link: Option<String>,
}

impl RunSequencer {
    pub fn new(
        table: GroupTable,
        sequence: Vec<String>,
        acquisition: AcquisitionLoop,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            table,
            sequence,
            acquisition,
            notifier,
            report_link: None,
        }
    }

    /// Link appended to the summary report.
    pub fn with_report_link(mut self, link: Option<String>) -> Self {
        self.report_link = link;
        self
    }

    /// Run `config`'s group and every group after it in the sequence.
    ///
    /// Returns each group's outcome in run order. Only a lost browser stops
    /// the sequence early.
    pub async fn run(&self, config: &mut RunConfig, ctx: &mut RunContext) -> Result<Vec<GroupStats>> {
        let mut finished = Vec::new();
        loop {
            let outcome = self.acquisition.run(config, ctx).await?;
            finished.push(GroupStats {
                group: config.group_name.clone(),
                target: config.min_results,
                actual: outcome.records.len(),
                batches: outcome.batches,
            });

            match self.advance(config, ctx).await {
                SequenceStep::Next(group) => info!("continuing with group {group}"),
                SequenceStep::Reported | SequenceStep::Stop => return Ok(finished),
            }
        }
    }

    /// Decide what follows the group `config` currently names.
    ///
    /// Moves `config` to the next group's filter and target, or, after the
    /// last group, sends the report and clears `ctx`.
    pub async fn advance(&self, config: &mut RunConfig, ctx: &mut RunContext) -> SequenceStep {
        if config.single_group {
            info!("single group '{}' finished", config.group_name);
            return SequenceStep::Stop;
        }
        let Some(position) = self.sequence.iter().position(|g| *g == config.group_name) else {
            info!("group '{}' is not part of the sequence; stopping", config.group_name);
            return SequenceStep::Stop;
        };

        match self.sequence.get(position + 1) {
            Some(next) => {
                config.switch_group(&self.table, next);
                SequenceStep::Next(next.clone())
            }
            None => {
                let report = ctx.report(Local::now().naive_local(), self.report_link.as_deref());
                if !self.notifier.send_text(&report).await {
                    warn!("summary report was not delivered");
                }
                ctx.clear();
                SequenceStep::Reported
            }
        }
    }
}
