// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Append-only daily log of raw candidate-API responses.
//!
//! One JSON line per response, in `<dir>/res_data_<group>_<YYYYMMDD>.jsonl`.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One logged API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEntry {
    pub timestamp: String,
    pub group: String,
    pub skip: usize,
    /// HTTP status, when a response arrived at all.
    pub status: Option<u16>,
    /// Parsed body, or the raw text as a JSON string when unparseable.
    pub body: serde_json::Value,
}

impl ResponseEntry {
    pub fn new(group: &str, skip: usize, status: Option<u16>, body: serde_json::Value) -> Self {
        Self {
            timestamp: Local::now().to_rfc3339(),
            group: group.to_string(),
            skip,
            status,
            body,
        }
    }
}

/// Writer for the per-group daily response files.
#[derive(Debug, Clone)]
pub struct ResponseLog {
    dir: PathBuf,
}

impl ResponseLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding `group`'s responses for `date`.
    pub fn path_for(&self, group: &str, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("res_data_{group}_{}.jsonl", date.format("%Y%m%d")))
    }

    /// Append one entry to today's file for its group.
    pub fn append(&self, entry: &ResponseEntry) -> Result<PathBuf> {
        self.append_on(entry, Local::now().date_naive())
    }

    pub fn append_on(&self, entry: &ResponseEntry, date: NaiveDate) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create log dir: {}", self.dir.display()))?;
        let path = self.path_for(&entry.group, date);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open response log: {}", path.display()))?;
        let json = serde_json::to_string(entry)?;
        writeln!(file, "{json}")?;
        Ok(path)
    }
}
