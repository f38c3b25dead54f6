// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-group run statistics and the summary report built from them.

use chrono::NaiveDateTime;
use serde::Serialize;

/// Outcome of one group's acquisition loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub group: String,
    pub target: usize,
    pub actual: usize,
    pub batches: usize,
}

impl GroupStats {
    /// `actual / target` as a percentage rounded to one decimal; 0 without a
    /// target.
    pub fn completion_rate(&self) -> f64 {
        rate(self.actual, self.target)
    }

    pub fn reached_target(&self) -> bool {
        self.actual >= self.target
    }

    pub fn status(&self) -> &'static str {
        if self.reached_target() {
            "complete"
        } else {
            "below target"
        }
    }
}

fn rate(actual: usize, target: usize) -> f64 {
    if target == 0 {
        return 0.0;
    }
    (actual as f64 / target as f64 * 1000.0).round() / 10.0
}

/// Statistics for one pass over the group sequence, owned by the driver.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    groups: Vec<GroupStats>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) a group's outcome. Groups keep first-recorded order.
    pub fn record(&mut self, stats: GroupStats) {
        match self.groups.iter_mut().find(|g| g.group == stats.group) {
            Some(existing) => *existing = stats,
            None => self.groups.push(stats),
        }
    }

    pub fn get(&self, group: &str) -> Option<&GroupStats> {
        self.groups.iter().find(|g| g.group == group)
    }

    pub fn groups(&self) -> &[GroupStats] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    /// Multi-line summary report, finished at `now`.
    pub fn report(&self, now: NaiveDateTime, link: Option<&str>) -> String {
        if self.groups.is_empty() {
            return "Run finished, but no statistics were recorded".to_string();
        }

        let rule = "-".repeat(32);
        let mut lines = vec![
            "Form acquisition summary".to_string(),
            format!("Finished: {}", now.format("%Y-%m-%d %H:%M:%S")),
            rule.clone(),
        ];

        let mut total_target = 0;
        let mut total_actual = 0;
        for g in &self.groups {
            total_target += g.target;
            total_actual += g.actual;
            lines.push(format!("Worksheet {}:", g.group));
            lines.push(format!("   target: {} | actual: {}", g.target, g.actual));
            lines.push(format!("   completion: {:.1}% | {}", g.completion_rate(), g.status()));
            lines.push(format!("   batches: {}", g.batches));
            lines.push(String::new());
        }

        lines.push("Overall:".to_string());
        lines.push(format!("   total target: {total_target} | total actual: {total_actual}"));
        lines.push(format!("   completion: {:.1}%", rate(total_actual, total_target)));
        lines.push(rule);
        match link {
            Some(link) => lines.push(format!("All worksheets processed, see {link}")),
            None => lines.push("All worksheets processed".to_string()),
        }
        lines.join("\n")
    }
}
