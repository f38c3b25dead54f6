// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! SQLite row sink. One table, keyed by `(worksheet, href)`.

use super::{AppendSummary, RowSink};
use crate::error::ScoutError;
use crate::record::SheetRow;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Local SQLite store standing in for the spreadsheet.
pub struct SqliteSink {
    db: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteSink {
    /// Open or create the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let db = Connection::open(path)
            .with_context(|| format!("failed to open database: {}", path.display()))?;

        db.execute_batch(
            "CREATE TABLE IF NOT EXISTS rows (
                worksheet TEXT NOT NULL,
                href TEXT NOT NULL,
                param TEXT NOT NULL DEFAULT '',
                date TEXT NOT NULL,
                owner TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT '',
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (worksheet, href)
            );",
        )
        .context("failed to create rows table")?;

        Ok(Self {
            db: Mutex::new(db),
            path: path.to_path_buf(),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| ScoutError::Sink("database lock poisoned".into()).into())
    }

    /// All rows of `worksheet`, in insertion order.
    pub fn rows(&self, worksheet: &str) -> Result<Vec<SheetRow>> {
        let db = self.lock()?;
        let mut stmt = db.prepare(
            "SELECT href, param, date, owner, status FROM rows
             WHERE worksheet = ?1 ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map(params![worksheet], |row| {
                Ok(SheetRow {
                    href: row.get(0)?,
                    param: row.get(1)?,
                    date: row.get(2)?,
                    owner: row.get(3)?,
                    status: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[async_trait]
impl RowSink for SqliteSink {
    async fn append(&self, worksheet: &str, rows: &[SheetRow]) -> Result<AppendSummary> {
        let mut db = self.lock()?;
        let tx = db.transaction().map_err(ScoutError::from)?;
        let mut appended = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO rows (worksheet, href, param, date, owner, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for row in rows {
                appended += stmt.execute(params![
                    worksheet, row.href, row.param, row.date, row.owner, row.status
                ])?;
            }
        }
        tx.commit().map_err(ScoutError::from)?;

        Ok(AppendSummary {
            appended,
            duplicates: rows.len() - appended,
        })
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }
}
