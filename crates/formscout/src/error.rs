// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types shared across the pipeline.
//!
//! Most internals return `anyhow::Result` and attach context as they go.
//! `ScoutError` names the failure classes the pipeline reacts to: the batch
//! scheduler re-raises `BrowserUnavailable` and swallows everything else at
//! the narrowest scope that keeps the run moving.

/// All classified errors raised by formscout.
#[derive(thiserror::Error, Debug)]
pub enum ScoutError {
    /// The browser process is gone or could not be launched.
    #[error("Browser unavailable: {0}")]
    BrowserUnavailable(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("{what} timed out after {ms}ms")]
    Timeout { what: String, ms: u64 },

    #[error("Script error: {0}")]
    Script(String),

    /// The candidate-URL API returned an error or could not be reached.
    #[error("API error: {0}")]
    Api(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl ScoutError {
    /// Whether this error means no further page can be rendered in this process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScoutError::BrowserUnavailable(_))
    }
}

/// Returns true when any error in the chain is a fatal [`ScoutError`].
pub fn is_fatal(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<ScoutError>())
        .any(ScoutError::is_fatal)
}
