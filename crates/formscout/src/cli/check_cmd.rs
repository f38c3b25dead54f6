// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! `formscout check`: ad-hoc form check of explicit URLs.

use super::GlobalArgs;
use crate::cache::ResultCache;
use crate::progress::Progress;
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::Renderer;
use crate::scheduler::{BatchScheduler, ConcurrencyPlan, FormChecker};
use crate::session::PageSession;
use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

pub async fn run(args: &GlobalArgs, urls: &[String]) -> Result<()> {
    let perf = args.performance();
    let cache = ResultCache::new(perf.cache_expire, perf.cache_max_size, perf.cache_cleanup_size).shared();
    let renderer = Arc::new(ChromiumRenderer::launch(&perf.browser).await?);
    let session = Arc::new(PageSession::new(perf, cache, Progress::disabled()));
    let scheduler = BatchScheduler::new(renderer.clone(), session);

    let plan = ConcurrencyPlan::for_batch(urls.len());
    let result = scheduler
        .check_all(urls, plan.sessions, plan.pages_per_context)
        .await;
    if let Err(e) = renderer.shutdown().await {
        warn!("browser shutdown failed: {e:#}");
    }
    let confirmed: HashSet<String> = result?.into_iter().collect();

    println!();
    for url in urls {
        let mark = if confirmed.contains(url) { "[OK]" } else { "[--]" };
        println!("  {mark} {url}");
    }
    println!();
    println!("  {} of {} URLs have a form", confirmed.len(), urls.len());
    Ok(())
}
