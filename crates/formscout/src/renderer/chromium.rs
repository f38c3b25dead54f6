// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Chromium-based renderer using chromiumoxide.

use super::{bounded, scripts, NavigationResult, PageScript, RenderContext, RenderPage, Renderer};
use crate::config::BrowserProfile;
use crate::error::ScoutError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::fetch::{
    EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::network::{
    ErrorReason, ResourceType, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. FORMSCOUT_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("FORMSCOUT_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.formscout/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".formscout/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".formscout/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
            ]
        } else {
            vec![home.join(".formscout/chromium/chrome-linux64/chrome")]
        };
        if let Some(found) = candidates.into_iter().find(|c| c.exists()) {
            return Some(found);
        }
    }

    // 3. System PATH
    ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"]
        .iter()
        .find_map(|name| which::which(name).ok())
        .or_else(|| {
            let common =
                PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
            (cfg!(target_os = "macos") && common.exists()).then_some(common)
        })
}

/// Map a profile resource-type name to its CDP counterpart.
fn resource_type(name: &str) -> Option<ResourceType> {
    match name {
        "image" => Some(ResourceType::Image),
        "stylesheet" => Some(ResourceType::Stylesheet),
        "font" => Some(ResourceType::Font),
        "media" => Some(ResourceType::Media),
        _ => None,
    }
}

/// Chromium-based renderer. One browser process, shared by every session.
pub struct ChromiumRenderer {
    browser: Arc<Browser>,
    alive: Arc<AtomicBool>,
    active_count: Arc<AtomicUsize>,
    handler: JoinHandle<()>,
}

impl ChromiumRenderer {
    /// Launch a Chromium instance configured by `profile`.
    pub async fn launch(profile: &BrowserProfile) -> Result<Self> {
        let chrome_path = find_chromium().ok_or_else(|| {
            ScoutError::BrowserUnavailable(
                "Chromium not found; set FORMSCOUT_CHROMIUM_PATH".to_string(),
            )
        })?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(profile.viewport_width, profile.viewport_height)
            .request_timeout(profile.page_timeout);
        if !profile.headless {
            builder = builder.with_head();
        }
        for arg in &profile.launch_args {
            builder = builder.arg(arg.as_str());
        }
        let config = builder
            .build()
            .map_err(|e| ScoutError::BrowserUnavailable(format!("bad browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScoutError::BrowserUnavailable(format!("failed to launch Chromium: {e}")))?;

        let alive = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&alive);
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("CDP handler error: {e}");
                }
            }
            flag.store(false, Ordering::SeqCst);
            tracing::warn!("Chromium handler stream ended; browser is no longer available");
        });

        tracing::info!("Chromium launched (headless: {})", profile.headless);
        Ok(Self {
            browser: Arc::new(browser),
            alive,
            active_count: Arc::new(AtomicUsize::new(0)),
            handler,
        })
    }

    /// Whether the CDP connection is still up.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self, profile: &BrowserProfile) -> Result<Box<dyn RenderContext>> {
        if !self.is_alive() {
            return Err(ScoutError::BrowserUnavailable("browser process has exited".into()).into());
        }

        let created = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| lost_or(&self.alive, anyhow::anyhow!("failed to create browser context: {e}")))?;

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumContext {
            browser: Arc::clone(&self.browser),
            context_id: created.result.browser_context_id.clone(),
            profile: profile.clone(),
            alive: Arc::clone(&self.alive),
            active_count: Arc::clone(&self.active_count),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        // The process is killed when the last `Browser` handle drops.
        self.handler.abort();
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// Turn an error into `BrowserUnavailable` once the browser is gone.
fn lost_or(alive: &AtomicBool, err: anyhow::Error) -> anyhow::Error {
    if alive.load(Ordering::SeqCst) {
        err
    } else {
        ScoutError::BrowserUnavailable(format!("{err:#}")).into()
    }
}

/// An isolated Chromium browser context.
pub struct ChromiumContext {
    browser: Arc<Browser>,
    context_id: BrowserContextId,
    profile: BrowserProfile,
    alive: Arc<AtomicBool>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumContext {
    /// Apply the profile's identity to a fresh page.
    async fn configure(&self, page: &Page) -> Result<()> {
        page.execute(SetUserAgentOverrideParams::new(self.profile.user_agent.clone()))
            .await
            .context("failed to set user agent")?;
        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(self.profile.viewport_width),
            i64::from(self.profile.viewport_height),
            1.0,
            false,
        ))
        .await
        .context("failed to set viewport")?;
        Ok(())
    }

    /// Abort requests for the profile's blocked resource types.
    async fn block_resources(&self, page: &Page) -> Result<Option<JoinHandle<()>>> {
        let patterns: Vec<RequestPattern> = self
            .profile
            .blocked_resources
            .iter()
            .filter_map(|name| resource_type(name))
            .map(|rt| RequestPattern::builder().resource_type(rt).build())
            .collect();
        if patterns.is_empty() {
            return Ok(None);
        }

        let mut paused = page
            .event_listener::<EventRequestPaused>()
            .await
            .context("failed to listen for paused requests")?;
        page.execute(EnableParams::builder().patterns(patterns).build())
            .await
            .context("failed to enable request interception")?;

        let page = page.clone();
        Ok(Some(tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let fail = FailRequestParams::new(event.request_id.clone(), ErrorReason::BlockedByClient);
                let _ = page.execute(fail).await;
            }
        })))
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn new_page(&self) -> Result<Box<dyn RenderPage>> {
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(self.context_id.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("bad target params: {e}"))?;
        let page = self
            .browser
            .new_page(params)
            .await
            .map_err(|e| lost_or(&self.alive, anyhow::anyhow!("failed to open page: {e}")))?;

        self.configure(&page).await?;
        let interceptor = self.block_resources(&page).await?;

        Ok(Box::new(ChromiumPage {
            page,
            interceptor,
            alive: Arc::clone(&self.alive),
            script_timeout: self.profile.page_timeout,
        }))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        if let Err(e) = self
            .browser
            .execute(DisposeBrowserContextParams::new(self.context_id.clone()))
            .await
        {
            tracing::debug!("failed to dispose browser context: {e}");
        }
        Ok(())
    }
}

/// A single Chromium page.
pub struct ChromiumPage {
    page: Page,
    interceptor: Option<JoinHandle<()>>,
    alive: Arc<AtomicBool>,
    script_timeout: Duration,
}

impl ChromiumPage {
    async fn eval_raw(&self, expression: String, what: &str) -> Result<serde_json::Value> {
        let evaluation = async {
            self.page
                .evaluate(expression)
                .await
                .map_err(|e| lost_or(&self.alive, ScoutError::Script(format!("{what}: {e}")).into()))
        };
        let result = bounded(what, self.script_timeout, evaluation).await?;
        result
            .into_value::<serde_json::Value>()
            .map_err(|e| ScoutError::Script(format!("{what}: bad result: {e}")).into())
    }

    async fn navigate_inner(&self, url: &str) -> Result<()> {
        let response = self
            .page
            .execute(NavigateParams::new(url))
            .await
            .map_err(|e| lost_or(&self.alive, anyhow::anyhow!("navigate command failed: {e}")))?;
        if let Some(reason) = response.result.error_text.clone() {
            return Err(ScoutError::Navigation {
                url: url.to_string(),
                reason,
            }
            .into());
        }

        loop {
            let state = self
                .eval_raw(PageScript::ReadyState.on_page(), PageScript::ReadyState.name())
                .await?;
            if matches!(state.as_str(), Some("interactive") | Some("complete")) {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

#[async_trait]
impl RenderPage for ChromiumPage {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<NavigationResult> {
        let start = Instant::now();
        match tokio::time::timeout(timeout, self.navigate_inner(url)).await {
            Ok(Ok(())) => {
                let final_url = self.current_url().await.unwrap_or_else(|_| url.to_string());
                Ok(NavigationResult {
                    final_url,
                    load_time_ms: start.elapsed().as_millis() as u64,
                })
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ScoutError::Timeout {
                what: format!("navigation to {url}"),
                ms: timeout.as_millis() as u64,
            }
            .into()),
        }
    }

    async fn evaluate(&self, script: PageScript) -> Result<serde_json::Value> {
        self.eval_raw(script.on_page(), script.name()).await
    }

    async fn evaluate_in_frame(
        &self,
        index: usize,
        script: PageScript,
    ) -> Result<Option<serde_json::Value>> {
        let raw = self.eval_raw(script.in_frame(index), script.name()).await?;
        Ok(scripts::unwrap_frame_result(raw))
    }

    async fn current_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .context("failed to get URL")?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        if let Some(handle) = &self.interceptor {
            handle.abort();
        }
        let ChromiumPage { page, .. } = *self;
        let _ = page.close().await;
        Ok(())
    }
}
