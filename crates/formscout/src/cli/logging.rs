// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tracing subscriber setup: stderr plus an optional append-only log file.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `level`. With `json`, both outputs emit JSON lines.
pub fn init(level: &str, json: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file = match log_file.filter(|p| !p.as_os_str().is_empty()) {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create log dir: {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file: {}", path.display()))?;
            Some(Mutex::new(file))
        }
        None => None,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(file.map(|f| fmt::layer().json().with_ansi(false).with_writer(f)))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(file.map(|f| fmt::layer().with_ansi(false).with_writer(f)))
            .try_init()
    };
    result.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
