// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Candidate-URL sources.
//!
//! The acquisition loop pulls pages of [`CandidateRecord`]s through the
//! [`CandidateSource`] trait. [`ApiSource`] is the HTTP implementation for the
//! upstream export API.

pub mod response_log;

pub use response_log::{ResponseEntry, ResponseLog};

use crate::error::ScoutError;
use crate::record::CandidateRecord;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Request body of the export API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub author: String,
    pub begin_date: String,
    pub end_date: String,
    pub top_n: usize,
    pub skip: usize,
    pub meet_template: u8,
    pub meet_fz: u8,
    pub repeat_sent: u8,
    pub filter_collect: u8,
    /// Group filter string: comma-separated domains.
    pub urls: String,
}

impl FetchRequest {
    /// Request for `top_n` records after `skip`, looking back `lookback_days`
    /// from the start of `today - lookback_days` through the end of `today`.
    pub fn new(today: NaiveDate, lookback_days: u32, top_n: usize, skip: usize, urls: &str) -> Self {
        let begin = today - ChronoDuration::days(i64::from(lookback_days));
        Self {
            kind: "json".to_string(),
            author: "admin".to_string(),
            begin_date: format!("{} 00:00:00", begin.format("%Y-%m-%d")),
            end_date: format!("{} 23:59:59", today.format("%Y-%m-%d")),
            top_n,
            skip,
            meet_template: 1,
            meet_fz: 1,
            repeat_sent: 1,
            filter_collect: 1,
            urls: urls.to_string(),
        }
    }
}

/// A paged supplier of candidate records.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Fetch one page of records for `group`.
    ///
    /// An unusable payload yields an empty page; `Err` is reserved for
    /// transport failures, which the caller also treats as empty.
    async fn fetch(&self, group: &str, request: &FetchRequest) -> Result<Vec<CandidateRecord>>;
}

/// Parse an API payload into records.
///
/// Returns `None` unless the payload is a list. List items may be bare href
/// strings or `{href, param}` objects; anything else is skipped.
pub fn parse_records(payload: &serde_json::Value) -> Option<Vec<CandidateRecord>> {
    let items = payload.as_array()?;
    let mut records = Vec::with_capacity(items.len());
    for item in items {
        match item {
            serde_json::Value::String(href) if !href.is_empty() => {
                records.push(CandidateRecord::bare(href.as_str()));
            }
            serde_json::Value::Object(fields) => {
                let href = fields.get("href").and_then(|v| v.as_str()).unwrap_or_default();
                if href.is_empty() {
                    debug!("skipping record without href: {item}");
                    continue;
                }
                let param = fields.get("param").and_then(|v| v.as_str());
                records.push(CandidateRecord::new(href, param));
            }
            other => debug!("skipping record of unknown shape: {other}"),
        }
    }
    Some(records)
}

/// HTTP client for the upstream export API.
#[derive(Clone)]
pub struct ApiSource {
    client: reqwest::Client,
    api_url: String,
    log: Option<ResponseLog>,
}

impl ApiSource {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_url: api_url.into(),
            log: None,
        }
    }

    /// Duplicate every raw response into `log`.
    pub fn with_response_log(mut self, log: ResponseLog) -> Self {
        self.log = Some(log);
        self
    }

    fn record_response(&self, group: &str, skip: usize, status: Option<u16>, body: serde_json::Value) {
        if let Some(log) = &self.log {
            let entry = ResponseEntry::new(group, skip, status, body);
            if let Err(e) = log.append(&entry) {
                warn!("failed to write response log: {e:#}");
            }
        }
    }
}

#[async_trait]
impl CandidateSource for ApiSource {
    async fn fetch(&self, group: &str, request: &FetchRequest) -> Result<Vec<CandidateRecord>> {
        debug!("calling API {} (skip {}, top {})", self.api_url, request.skip, request.top_n);
        let response = self
            .client
            .post(&self.api_url)
            .json(request)
            .send()
            .await
            .map_err(|e| ScoutError::Api(format!("request failed: {e}")))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ScoutError::Api(format!("failed to read body: {e}")))?;

        let payload: serde_json::Value = match serde_json::from_str(&text) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("API returned non-JSON body (status {status}): {e}");
                self.record_response(group, request.skip, Some(status), serde_json::Value::String(text));
                return Ok(Vec::new());
            }
        };
        self.record_response(group, request.skip, Some(status), payload.clone());

        match parse_records(&payload) {
            Some(records) => Ok(records),
            None => {
                warn!("API returned a non-list payload (status {status}); treating as empty");
                Ok(Vec::new())
            }
        }
    }
}
