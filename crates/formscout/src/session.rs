// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Page-pool sessions: one isolated browser context checking a batch of URLs
//! across several pre-opened pages.
//!
//! URL `i` of a batch is assigned to page `i mod pages`. URLs sharing a page
//! run one after another on it; the pages themselves run concurrently. A
//! failing URL never aborts its siblings. The only error that escapes a
//! session once its context is open is a lost browser.

use crate::cache::SharedCache;
use crate::config::PerformanceConfig;
use crate::detector::FormDetector;
use crate::error::is_fatal;
use crate::progress::{Progress, ProgressEventKind};
use crate::prober::{keyword_links, probe_links};
use crate::renderer::{bounded, RenderContext, RenderPage, Renderer};
use crate::url_norm::normalize;
use anyhow::{bail, Context, Result};
use futures::future::join_all;
use tracing::{debug, info, warn};

/// Checks URLs for forms, sharing one verdict cache across all sessions.
pub struct PageSession {
    perf: PerformanceConfig,
    cache: SharedCache,
    detector: FormDetector,
    progress: Progress,
}

impl PageSession {
    pub fn new(perf: PerformanceConfig, cache: SharedCache, progress: Progress) -> Self {
        let detector = FormDetector::new(perf.page_load_wait, perf.browser.page_timeout);
        Self {
            perf,
            cache,
            detector,
            progress,
        }
    }

    /// Surface a swallowed failure to progress subscribers.
    pub fn report_warning(&self, message: String) {
        self.progress.emit(ProgressEventKind::Warning { message });
    }

    /// Check a batch in a fresh context; returns the URLs confirmed to have a
    /// form, in batch order.
    pub async fn check_batch(
        &self,
        renderer: &dyn Renderer,
        urls: &[String],
        session_id: usize,
        pages_per_context: usize,
    ) -> Result<Vec<String>> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }
        let ctx = renderer
            .new_context(&self.perf.browser)
            .await
            .with_context(|| format!("session {session_id}: failed to create browser context"))?;

        let result = self.run_pages(&*ctx, urls, session_id, pages_per_context).await;

        if let Err(e) = ctx.close().await {
            debug!("session {session_id}: context close failed: {e:#}");
        }
        if let Ok(found) = &result {
            info!(
                "session {session_id}: finished, {} of {} URLs have forms",
                found.len(),
                urls.len()
            );
        }
        result
    }

    async fn run_pages(
        &self,
        ctx: &dyn RenderContext,
        urls: &[String],
        session_id: usize,
        pages_per_context: usize,
    ) -> Result<Vec<String>> {
        let wanted = pages_per_context.clamp(1, urls.len());
        let mut pages: Vec<Box<dyn RenderPage>> = Vec::with_capacity(wanted);
        for _ in 0..wanted {
            match ctx.new_page().await {
                Ok(page) => pages.push(page),
                Err(e) if is_fatal(&e) => return Err(e),
                Err(e) => {
                    warn!("session {session_id}: failed to open page: {e:#}");
                    self.report_warning(format!("session {session_id}: failed to open page: {e:#}"));
                }
            }
        }
        if pages.is_empty() {
            bail!("session {session_id}: no page could be opened");
        }
        info!(
            "session {session_id}: checking {} URLs on {} pages",
            urls.len(),
            pages.len()
        );

        let lane_count = pages.len();
        let lanes = pages.into_iter().enumerate().map(|(lane, mut page)| {
            let assigned: Vec<(usize, &String)> = urls
                .iter()
                .enumerate()
                .filter(|(i, _)| i % lane_count == lane)
                .collect();
            async move {
                let mut found = Vec::new();
                let mut fatal = None;
                for (index, url) in assigned {
                    match self.check_url(page.as_mut(), url).await {
                        Ok(true) => {
                            info!("session {session_id}-P{}: {url} has a form", lane + 1);
                            found.push(index);
                        }
                        Ok(false) => debug!("session {session_id}-P{}: {url} has no form", lane + 1),
                        Err(e) => {
                            fatal = Some(e);
                            break;
                        }
                    }
                }
                if let Err(e) = page.close().await {
                    debug!("session {session_id}: page close failed: {e:#}");
                }
                (found, fatal)
            }
        });

        let mut confirmed = Vec::new();
        let mut fatal = None;
        for (found, err) in join_all(lanes).await {
            confirmed.extend(found);
            if fatal.is_none() {
                fatal = err;
            }
        }
        if let Some(e) = fatal {
            return Err(e);
        }
        confirmed.sort_unstable();
        Ok(confirmed.into_iter().map(|i| urls[i].clone()).collect())
    }

    /// Check one candidate: cache, then main page, then secondary pages.
    ///
    /// Returns `Err` only for a lost browser; every other failure counts as
    /// "no form" and is cached as such.
    pub async fn check_url(&self, page: &mut dyn RenderPage, href: &str) -> Result<bool> {
        let url = normalize(href);

        if let Some(hit) = self.cached(&url) {
            debug!("cache hit for {url}: {hit}");
            self.emit_checked(&url, hit, true);
            return Ok(hit);
        }

        debug!("checking {url}");
        let has_form = match self.check_uncached(page, &url).await {
            Ok(found) => found,
            Err(e) if is_fatal(&e) => return Err(e),
            Err(e) => {
                info!("cannot check {url}: {e:#}");
                false
            }
        };

        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .set(&url, has_form);
        self.emit_checked(&url, has_form, false);
        Ok(has_form)
    }

    fn cached(&self, url: &str) -> Option<bool> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(url)
    }

    fn emit_checked(&self, url: &str, has_form: bool, cached: bool) {
        self.progress.emit(ProgressEventKind::UrlChecked {
            url: url.to_string(),
            has_form,
            cached,
        });
    }

    async fn check_uncached(&self, page: &mut dyn RenderPage, url: &str) -> Result<bool> {
        page.navigate(url, self.perf.navigation_timeout).await?;
        if self.detector.detect(&*page, url, 1).await?.found {
            return Ok(true);
        }

        let strategy = &self.perf.strategy;
        if strategy.check_main_page_only {
            return Ok(false);
        }

        let timeout = self.perf.browser.page_timeout;
        let links = if strategy.prioritize_contact_pages {
            let query = keyword_links(&*page, &strategy.contact_keywords, strategy.max_secondary_links);
            bounded("link collection", timeout, query).await
        } else {
            bounded("link collection", timeout, probe_links(&*page, strategy.max_secondary_links)).await
        };
        let links = match links {
            Ok(links) => links,
            Err(e) if is_fatal(&e) => return Err(e),
            Err(e) => {
                debug!("link collection failed on {url}: {e:#}");
                return Ok(false);
            }
        };
        if links.is_empty() {
            return Ok(false);
        }

        debug!("probing {} secondary links of {url}", links.len());
        for link in links {
            match page.navigate(&link, self.perf.secondary_page_timeout).await {
                Ok(_) => {}
                Err(e) if is_fatal(&e) => return Err(e),
                Err(e) => {
                    debug!("secondary page {link} failed: {e:#}");
                    continue;
                }
            }
            match self.detector.detect(&*page, &link, 2).await {
                Ok(detection) if detection.found => {
                    info!("form found on secondary page {link} of {url}");
                    return Ok(true);
                }
                Ok(_) => {}
                Err(e) if is_fatal(&e) => return Err(e),
                Err(e) => debug!("detection failed on secondary page {link}: {e:#}"),
            }
        }
        Ok(false)
    }
}
