// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Target-driven acquisition loop for one URL group.
//!
//! Each iteration fetches a page of candidates, drops URLs already seen in
//! this run, checks the rest through a [`FormChecker`] and accumulates the
//! qualifying records. The loop stops once the group's target is met, the
//! batch budget is spent, or the URL ceiling is reached. Iterations never
//! overlap.

use crate::config::RunConfig;
use crate::progress::{Progress, ProgressEventKind};
use crate::record::{rows_for, CandidateRecord};
use crate::scheduler::{ConcurrencyPlan, FormChecker};
use crate::sink::{write_with_retry, RowSink};
use crate::source::{CandidateSource, FetchRequest};
use crate::stats::{GroupStats, RunContext};
use crate::url_norm::normalize;
use anyhow::Result;
use chrono::{Local, NaiveDate};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, warn};

/// What one group run produced.
#[derive(Debug, Clone, Default)]
pub struct AcquisitionOutcome {
    /// Qualifying records, in discovery order.
    pub records: Vec<CandidateRecord>,
    /// Iterations executed, including empty ones.
    pub batches: usize,
    /// Distinct URLs dispatched for checking.
    pub processed: usize,
}

/// Keep the records whose normalized URL is not in `processed`, first
/// occurrence only.
pub fn select_new(fetched: &[CandidateRecord], processed: &HashSet<String>) -> Vec<CandidateRecord> {
    let mut seen = HashSet::new();
    fetched
        .iter()
        .filter(|r| {
            let key = normalize(&r.href);
            !processed.contains(&key) && seen.insert(key)
        })
        .cloned()
        .collect()
}

/// Drives fetch → check → persist iterations for one group.
pub struct AcquisitionLoop {
    source: Arc<dyn CandidateSource>,
    checker: Arc<dyn FormChecker>,
    sink: Arc<dyn RowSink>,
    progress: Progress,
}

impl AcquisitionLoop {
    pub fn new(
        source: Arc<dyn CandidateSource>,
        checker: Arc<dyn FormChecker>,
        sink: Arc<dyn RowSink>,
        progress: Progress,
    ) -> Self {
        Self {
            source,
            checker,
            sink,
            progress,
        }
    }

    /// Run the loop for `config`'s group, recording statistics in `ctx`.
    ///
    /// Fails only when the browser is lost; rows accumulated so far are
    /// persisted first.
    pub async fn run(&self, config: &RunConfig, ctx: &mut RunContext) -> Result<AcquisitionOutcome> {
        let group = config.group_name.as_str();
        let target = config.min_results;
        let acq = &config.acquisition;
        info!(
            "group {group}: target {target}, batch size {}, max batches {}",
            acq.batch_size, acq.max_batches
        );

        let mut outcome = AcquisitionOutcome::default();
        let mut processed: HashSet<String> = HashSet::new();
        let mut skip = 0;
        ctx.record(group_stats(group, target, &outcome));

        loop {
            if outcome.records.len() >= target {
                info!("group {group}: target {target} reached");
                break;
            }
            if outcome.batches >= acq.max_batches {
                info!("group {group}: batch budget of {} spent", acq.max_batches);
                break;
            }
            if acq.max_urls.is_some_and(|max| processed.len() >= max) {
                info!("group {group}: URL ceiling reached");
                break;
            }
            if outcome.batches > 0 && !acq.iteration_pause.is_zero() {
                tokio::time::sleep(acq.iteration_pause).await;
            }

            outcome.batches += 1;
            let batch = outcome.batches;
            let request = FetchRequest::new(today(), acq.cache_date_len, acq.batch_size, skip, &config.url_filter);
            skip += acq.batch_size;

            let fetched = match self.source.fetch(group, &request).await {
                Ok(records) => records,
                Err(e) => {
                    warn!("group {group} batch {batch}: fetch failed, treating as empty: {e:#}");
                    Vec::new()
                }
            };
            let mut fresh = select_new(&fetched, &processed);
            if fresh.is_empty() {
                info!(
                    "group {group} batch {batch}: no new URLs ({} fetched)",
                    fetched.len()
                );
                ctx.record(group_stats(group, target, &outcome));
                continue;
            }
            if let Some(max) = acq.max_urls {
                fresh.truncate(max.saturating_sub(processed.len()));
            }
            processed.extend(fresh.iter().map(|r| normalize(&r.href)));
            outcome.processed = processed.len();

            let found = match self.check(group, batch, &fresh).await {
                Ok(found) => found,
                Err(e) => {
                    if !acq.realtime_write {
                        self.write_all(group, &outcome.records).await;
                    }
                    return Err(e);
                }
            };

            if acq.realtime_write && !found.is_empty() {
                let rows = rows_for(&found, today());
                if let Err(e) =
                    write_with_retry(self.sink.as_ref(), group, &rows, acq.write_retry, acq.retry_base).await
                {
                    error!(
                        "group {group} batch {batch}: {} rows not persisted: {e:#}",
                        rows.len()
                    );
                }
            }

            outcome.records.extend(found.iter().cloned());
            ctx.record(group_stats(group, target, &outcome));
            self.progress.emit(ProgressEventKind::BatchFinished {
                group: group.to_string(),
                batch,
                found: found.len(),
                accumulated: outcome.records.len(),
                target,
            });
            info!(
                "group {group} batch {batch}: checked {}, found {}, total {}/{target}",
                fresh.len(),
                found.len(),
                outcome.records.len()
            );
        }

        if !acq.realtime_write {
            self.write_all(group, &outcome.records).await;
        }

        ctx.record(group_stats(group, target, &outcome));
        self.progress.emit(ProgressEventKind::GroupFinished {
            group: group.to_string(),
            actual: outcome.records.len(),
            target,
            batches: outcome.batches,
        });
        info!(
            "group {group}: {} batches, {} URLs checked, {} qualifying",
            outcome.batches,
            outcome.processed,
            outcome.records.len()
        );
        Ok(outcome)
    }

    /// Check one iteration's records; map confirmed URLs back to records.
    async fn check(&self, group: &str, batch: usize, fresh: &[CandidateRecord]) -> Result<Vec<CandidateRecord>> {
        let plan = ConcurrencyPlan::for_batch(fresh.len());
        self.progress.emit(ProgressEventKind::BatchStarted {
            group: group.to_string(),
            batch,
            urls: fresh.len(),
            sessions: plan.sessions,
            pages_per_context: plan.pages_per_context,
        });
        info!(
            "group {group} batch {batch}: checking {} URLs ({} sessions x {} pages)",
            fresh.len(),
            plan.sessions,
            plan.pages_per_context
        );

        let hrefs: Vec<String> = fresh.iter().map(|r| r.href.clone()).collect();
        let confirmed = self
            .checker
            .check_all(&hrefs, plan.sessions, plan.pages_per_context)
            .await?;

        let by_href: HashMap<&str, &CandidateRecord> =
            fresh.iter().map(|r| (r.href.as_str(), r)).collect();
        Ok(confirmed
            .iter()
            .map(|url| {
                by_href
                    .get(url.as_str())
                    .map(|r| (*r).clone())
                    .unwrap_or_else(|| CandidateRecord::bare(url.as_str()))
            })
            .collect())
    }

    /// Single bulk write used when incremental writes are off.
    async fn write_all(&self, group: &str, records: &[CandidateRecord]) {
        if records.is_empty() {
            return;
        }
        let rows = rows_for(records, today());
        match self.sink.append(group, &rows).await {
            Ok(summary) => info!(
                "group {group}: wrote {} rows ({} duplicates skipped)",
                summary.appended, summary.duplicates
            ),
            Err(e) => error!("group {group}: bulk write of {} rows failed: {e:#}", rows.len()),
        }
    }
}

fn group_stats(group: &str, target: usize, outcome: &AcquisitionOutcome) -> GroupStats {
    GroupStats {
        group: group.to_string(),
        target,
        actual: outcome.records.len(),
        batches: outcome.batches,
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
