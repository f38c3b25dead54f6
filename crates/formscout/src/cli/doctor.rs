// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Environment readiness check.

use super::{GlobalArgs, SinkKind};
use crate::renderer::chromium::find_chromium;
use crate::sink::sheets::SheetsCredentials;
use crate::sink::sqlite::SqliteSink;
use anyhow::Result;
use std::path::Path;

/// Check the browser binary, log directories, group table and sink.
pub async fn run(args: &GlobalArgs) -> Result<()> {
    println!("Formscout Doctor");
    println!("================");
    println!();
    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    let chromium = find_chromium();
    match &chromium {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!("[!!] Chromium NOT found. Install Chrome/Chromium or set FORMSCOUT_CHROMIUM_PATH."),
    }

    let log_dir_ok = check_dir("response log dir", &args.response_log_dir);
    if let Some(parent) = args.log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        check_dir("log file dir", parent);
    }

    match args.group_table() {
        Ok(table) => println!("[OK] Group table: {} groups", table.len()),
        Err(e) => println!("[!!] Group table: {e:#}"),
    }

    let sink_ok = match args.sink {
        SinkKind::Sqlite => match SqliteSink::open(&args.db) {
            Ok(_) => {
                println!("[OK] SQLite sink: {}", args.db.display());
                true
            }
            Err(e) => {
                println!("[!!] SQLite sink: {e:#}");
                false
            }
        },
        SinkKind::Sheets => match SheetsCredentials::load(&args.credentials) {
            Ok(_) => {
                println!("[OK] Sheets credentials: {}", args.credentials.display());
                true
            }
            Err(e) => {
                println!("[!!] Sheets credentials: {e:#}");
                false
            }
        },
    };

    match &args.webhook_url {
        Some(url) if !url.is_empty() => println!("[OK] Notifications: webhook configured"),
        _ => println!("[??] Notifications: no webhook, messages go to the log"),
    }

    println!();
    if chromium.is_some() && log_dir_ok && sink_ok {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }
    Ok(())
}

fn check_dir(label: &str, dir: &Path) -> bool {
    match std::fs::create_dir_all(dir) {
        Ok(()) => {
            println!("[OK] {label}: {}", dir.display());
            true
        }
        Err(e) => {
            println!("[!!] {label} {} is not writable: {e}", dir.display());
            false
        }
    }
}
