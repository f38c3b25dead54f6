// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Candidate records and the spreadsheet rows built from them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A candidate URL handed out by the upstream API.
///
/// Built once at the API boundary; `param` already holds only the first
/// comma-separated token of the raw value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub href: String,
    pub param: String,
}

impl CandidateRecord {
    /// Build a record from the raw API fields.
    pub fn new(href: impl Into<String>, raw_param: Option<&str>) -> Self {
        Self {
            href: href.into(),
            param: first_param_token(raw_param),
        }
    }

    /// A record known only by its href.
    pub fn bare(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            param: String::new(),
        }
    }
}

/// First comma-separated token of a raw param string, or empty.
pub fn first_param_token(raw: Option<&str>) -> String {
    raw.and_then(|p| p.split(',').next())
        .unwrap_or_default()
        .to_string()
}

/// Header row written to an empty worksheet.
pub const SHEET_HEADER: [&str; 5] = ["href", "param", "date", "owner", "status"];

/// One persisted row: `[href, param, date, owner, status]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRow {
    pub href: String,
    pub param: String,
    pub date: String,
    pub owner: String,
    pub status: String,
}

impl SheetRow {
    /// Row for a qualifying record found on `date`.
    pub fn from_record(record: &CandidateRecord, date: NaiveDate) -> Self {
        Self {
            href: record.href.clone(),
            param: first_param_token(Some(&record.param)),
            date: date.format("%Y-%m-%d").to_string(),
            owner: String::new(),
            status: String::new(),
        }
    }

    pub fn cells(&self) -> [String; 5] {
        [
            self.href.clone(),
            self.param.clone(),
            self.date.clone(),
            self.owner.clone(),
            self.status.clone(),
        ]
    }
}

/// Rows for a batch of qualifying records, all stamped with `date`.
pub fn rows_for(records: &[CandidateRecord], date: NaiveDate) -> Vec<SheetRow> {
    records.iter().map(|r| SheetRow::from_record(r, date)).collect()
}
