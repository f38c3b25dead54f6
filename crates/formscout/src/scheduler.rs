// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Batch scheduler: fans a URL list out over concurrent page-pool sessions.

use crate::error::is_fatal;
use crate::renderer::Renderer;
use crate::session::PageSession;
use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

/// Sessions and pages used for one scheduler call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyPlan {
    pub sessions: usize,
    pub pages_per_context: usize,
}

impl ConcurrencyPlan {
    /// Derive concurrency from the number of URLs to check:
    /// `sessions = clamp(n / 15, 2, 4)`, `pages = clamp(n / sessions / 3, 3, 6)`.
    pub fn for_batch(url_count: usize) -> Self {
        let sessions = (url_count / 15).clamp(2, 4);
        let pages_per_context = (url_count / sessions / 3).clamp(3, 6);
        Self {
            sessions,
            pages_per_context,
        }
    }
}

/// Split `items` into at most `parts` contiguous chunks of
/// `ceil(len / parts)`; the last chunk may be smaller.
pub fn partition<T: Clone>(items: &[T], parts: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    let size = items.len().div_ceil(parts.max(1));
    items.chunks(size).map(|c| c.to_vec()).collect()
}

/// Checks a flat URL list and returns the URLs that have a form.
#[async_trait]
pub trait FormChecker: Send + Sync {
    async fn check_all(
        &self,
        urls: &[String],
        max_concurrent_sessions: usize,
        pages_per_context: usize,
    ) -> Result<Vec<String>>;
}

/// Drives one shared browser across concurrent sessions.
#[derive(Clone)]
pub struct BatchScheduler {
    renderer: Arc<dyn Renderer>,
    session: Arc<PageSession>,
}

impl BatchScheduler {
    pub fn new(renderer: Arc<dyn Renderer>, session: Arc<PageSession>) -> Self {
        Self { renderer, session }
    }
}

#[async_trait]
impl FormChecker for BatchScheduler {
    /// Check every URL; returns those confirmed to have a form.
    ///
    /// A failed session contributes nothing and is logged. A lost browser is
    /// returned as an error once all sessions have settled.
    async fn check_all(
        &self,
        urls: &[String],
        max_concurrent_sessions: usize,
        pages_per_context: usize,
    ) -> Result<Vec<String>> {
        let batches = partition(urls, max_concurrent_sessions);
        if batches.is_empty() {
            return Ok(Vec::new());
        }
        info!(
            "checking {} URLs in {} sessions x {} pages",
            urls.len(),
            batches.len(),
            pages_per_context
        );

        let sessions = batches.iter().enumerate().map(|(i, batch)| {
            self.session
                .check_batch(self.renderer.as_ref(), batch, i + 1, pages_per_context)
        });

        let mut confirmed = Vec::new();
        let mut fatal = None;
        for (i, outcome) in join_all(sessions).await.into_iter().enumerate() {
            match outcome {
                Ok(found) => confirmed.extend(found),
                Err(e) if is_fatal(&e) => {
                    warn!("session {}: browser lost: {e:#}", i + 1);
                    fatal.get_or_insert(e);
                }
                Err(e) => {
                    let message = format!("session {} failed, batch skipped: {e:#}", i + 1);
                    warn!("{message}");
                    self.session.report_warning(message);
                }
            }
        }
        if let Some(e) = fatal {
            return Err(e);
        }

        info!("{} of {} URLs have forms", confirmed.len(), urls.len());
        Ok(confirmed)
    }
}
