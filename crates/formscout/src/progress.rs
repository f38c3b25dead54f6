// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Progress event types and broadcast channel for run telemetry.
//!
//! The acquisition loop and the page-pool sessions emit `ProgressEvent`s that
//! flow through a `tokio::sync::broadcast` channel to whoever listens (the
//! CLI spinner, tests). When no subscriber exists, events are dropped.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A progress event emitted during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The run this event belongs to.
    pub run_id: String,
    /// Monotonically increasing sequence number.
    pub seq: u64,
    pub event: ProgressEventKind,
}

/// The specific kind of progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEventKind {
    /// An acquisition iteration dispatched URLs for checking.
    BatchStarted {
        group: String,
        batch: usize,
        urls: usize,
        sessions: usize,
        pages_per_context: usize,
    },
    /// A single URL got its verdict.
    UrlChecked {
        url: String,
        has_form: bool,
        cached: bool,
    },
    /// An acquisition iteration finished.
    BatchFinished {
        group: String,
        batch: usize,
        found: usize,
        accumulated: usize,
        target: usize,
    },
    /// A group's acquisition loop terminated.
    GroupFinished {
        group: String,
        actual: usize,
        target: usize,
        batches: usize,
    },
    /// A non-fatal warning occurred.
    Warning { message: String },
}

/// Sender handle for emitting progress events.
pub type ProgressSender = tokio::sync::broadcast::Sender<ProgressEvent>;

/// Receiver handle for consuming progress events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<ProgressEvent>;

/// Create a new progress broadcast channel with a bounded buffer.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(512)
}

/// Cloneable emitter shared by every component of one run.
#[derive(Clone, Default)]
pub struct Progress {
    tx: Option<ProgressSender>,
    run_id: String,
    seq: Arc<AtomicU64>,
}

impl Progress {
    /// An emitter that drops everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// An emitter tagged with a fresh run id.
    pub fn new(tx: ProgressSender) -> Self {
        Self {
            tx: Some(tx),
            run_id: uuid::Uuid::new_v4().to_string(),
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Emit an event, ignoring send errors (no receivers listening).
    pub fn emit(&self, event: ProgressEventKind) {
        if let Some(ref sender) = self.tx {
            let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
            let _ = sender.send(ProgressEvent {
                run_id: self.run_id.clone(),
                seq,
                event,
            });
        }
    }
}
