// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Renderer abstraction for browser-based page checks.
//!
//! Defines the `Renderer`, `RenderContext` and `RenderPage` traits that
//! abstract over the browser engine (currently Chromium via chromiumoxide).
//! A renderer hands out isolated contexts; each context owns the pages the
//! session navigates.

pub mod chromium;
pub mod scripts;

pub use scripts::{FrameInfo, PageScript};

use crate::config::BrowserProfile;
use crate::error::ScoutError;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Poll interval while waiting for the DOM to become ready.
const READY_POLL: Duration = Duration::from_millis(50);

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time until the DOM became ready, in milliseconds.
    pub load_time_ms: u64,
}

/// A browser engine that can create isolated contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new isolated context (own cookies and storage) with the
    /// profile's identity and resource blocking.
    async fn new_context(&self, profile: &BrowserProfile) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently open contexts.
    fn active_contexts(&self) -> usize;
}

/// One isolated browsing context.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Open a blank page inside this context.
    async fn new_page(&self) -> Result<Box<dyn RenderPage>>;
    /// Dispose of the context and everything opened in it.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A single page handle. Serves one navigation at a time.
#[async_trait]
pub trait RenderPage: Send + Sync {
    /// Navigate to a URL; completes once the DOM is ready or fails after
    /// `timeout`.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<NavigationResult>;
    /// Evaluate a script against the top-level document.
    async fn evaluate(&self, script: PageScript) -> Result<serde_json::Value>;
    /// Evaluate a script against the document of the `index`-th iframe.
    ///
    /// `Ok(None)` means the frame's document is not accessible.
    async fn evaluate_in_frame(
        &self,
        index: usize,
        script: PageScript,
    ) -> Result<Option<serde_json::Value>>;
    /// The page's current URL.
    async fn current_url(&self) -> Result<String>;
    /// Close this page.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Run `op`, failing with [`ScoutError::Timeout`] once `timeout` elapses.
pub async fn bounded<T, F>(what: &str, timeout: Duration, op: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, op).await {
        Ok(result) => result,
        Err(_) => Err(ScoutError::Timeout {
            what: what.to_string(),
            ms: timeout.as_millis() as u64,
        }
        .into()),
    }
}

/// Wait until `document.readyState` leaves `loading`, bounded by `timeout`.
pub async fn wait_for_dom_ready(page: &dyn RenderPage, timeout: Duration) -> Result<()> {
    let poll = async {
        loop {
            let state = page.evaluate(PageScript::ReadyState).await?;
            if matches!(state.as_str(), Some("interactive") | Some("complete")) {
                return Ok::<(), anyhow::Error>(());
            }
            tokio::time::sleep(READY_POLL).await;
        }
    };
    bounded("DOM ready", timeout, poll).await
}
