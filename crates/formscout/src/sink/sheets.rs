// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Google Sheets row sink over the Sheets v4 REST API.
//!
//! Appending to a worksheet:
//! 1. create the worksheet when the spreadsheet lacks it,
//! 2. read column A; an empty sheet gets the header row first,
//! 3. drop rows whose href is already in column A (or earlier in the batch),
//! 4. append the remainder with `values:append`.

use super::{AppendSummary, RowSink};
use crate::error::ScoutError;
use crate::record::{SheetRow, SHEET_HEADER};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Public Sheets API endpoint.
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

/// Contents of the credentials file: a pre-issued OAuth access token.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetsCredentials {
    pub access_token: String,
}

impl SheetsCredentials {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read credentials: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid credentials file: {}", path.display()))
    }
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Appends rows to worksheets of one spreadsheet.
pub struct SheetsSink {
    client: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    token: String,
}

impl SheetsSink {
    pub fn new(spreadsheet_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_base_url(SHEETS_API_BASE, spreadsheet_id, token)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            token: token.into(),
        }
    }

    /// URL under `spreadsheets/<id>`, with each extra segment escaped.
    fn endpoint(&self, segments: &[&str]) -> Result<url::Url> {
        let mut url = url::Url::parse(&format!("{}/v4/spreadsheets", self.base_url))
            .map_err(|e| ScoutError::Config(format!("bad Sheets base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ScoutError::Config("Sheets base URL cannot be a base".into()))?
            .push(&self.spreadsheet_id)
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ScoutError::Sink(format!("{what}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScoutError::Sink(format!("{what}: HTTP {status}: {body}")).into());
        }
        Ok(response)
    }

    async fn worksheet_titles(&self) -> Result<Vec<String>> {
        let mut url = self.endpoint(&[])?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties.title");
        let meta: SpreadsheetMeta = self
            .send(self.client.get(url), "read spreadsheet")
            .await?
            .json()
            .await
            .map_err(|e| ScoutError::Sink(format!("bad spreadsheet metadata: {e}")))?;
        Ok(meta.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    async fn ensure_worksheet(&self, worksheet: &str) -> Result<()> {
        if self.worksheet_titles().await?.iter().any(|t| t == worksheet) {
            return Ok(());
        }
        info!("worksheet '{worksheet}' missing, creating it");
        let url = self.endpoint(&[])?;
        let url = url::Url::parse(&format!("{url}:batchUpdate"))
            .map_err(|e| ScoutError::Sink(format!("bad batchUpdate URL: {e}")))?;
        let body = json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": worksheet,
                        "gridProperties": {"rowCount": 100, "columnCount": 20}
                    }
                }
            }]
        });
        self.send(self.client.post(url).json(&body), "create worksheet").await?;
        Ok(())
    }

    /// Column A of `worksheet`, header included.
    async fn existing_hrefs(&self, worksheet: &str) -> Result<Vec<String>> {
        let range = format!("{worksheet}!A:A");
        let url = self.endpoint(&["values", &range])?;
        let values: ValueRange = self
            .send(self.client.get(url), "read worksheet")
            .await?
            .json()
            .await
            .map_err(|e| ScoutError::Sink(format!("bad value range: {e}")))?;
        Ok(values
            .values
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .collect())
    }
}

#[async_trait]
impl RowSink for SheetsSink {
    async fn append(&self, worksheet: &str, rows: &[SheetRow]) -> Result<AppendSummary> {
        self.ensure_worksheet(worksheet).await?;
        let column = self.existing_hrefs(worksheet).await?;

        let mut values: Vec<Vec<String>> = Vec::with_capacity(rows.len() + 1);
        if column.is_empty() {
            debug!("worksheet '{worksheet}' is empty, writing header");
            values.push(SHEET_HEADER.iter().map(|h| h.to_string()).collect());
        }
        let mut seen: HashSet<String> = column.into_iter().skip(1).collect();

        let mut appended = 0;
        let mut duplicates = 0;
        for row in rows {
            if seen.insert(row.href.clone()) {
                values.push(row.cells().to_vec());
                appended += 1;
            } else {
                duplicates += 1;
            }
        }

        if !values.is_empty() {
            let range = format!("{worksheet}!A1:append");
            let mut url = self.endpoint(&["values", &range])?;
            url.query_pairs_mut()
                .append_pair("valueInputOption", "RAW")
                .append_pair("insertDataOption", "INSERT_ROWS");
            self.send(
                self.client.post(url).json(&json!({ "values": values })),
                "append rows",
            )
            .await?;
        }

        Ok(AppendSummary {
            appended,
            duplicates,
        })
    }

    fn describe(&self) -> String {
        format!("sheets:{}", self.spreadsheet_id)
    }
}
