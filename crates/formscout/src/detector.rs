// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Form detection on a rendered page.
//!
//! A page qualifies when it holds at least one *effective form*: a `form`
//! element with an `input` descendant. When the top-level document has none,
//! same-origin iframes are inspected and their counts summed. Cross-origin
//! frames are skipped silently.

use crate::error::is_fatal;
use crate::renderer::{bounded, wait_for_dom_ready, FrameInfo, PageScript, RenderPage};
use crate::url_norm::host_of;
use anyhow::Result;
use std::time::Duration;
use tracing::debug;

/// Outcome of one detection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Detection {
    pub found: bool,
    /// Effective forms counted on the page, or across its frames.
    pub count: usize,
}

impl Detection {
    fn of(count: usize) -> Self {
        Self {
            found: count > 0,
            count,
        }
    }
}

/// Whether an iframe belongs to the page's origin.
///
/// Frames without a source, with inline `srcdoc` content, or with a relative
/// source are same-origin. Protocol-relative (`//host/...`) and absolute
/// sources are same-origin only when their host equals `page_host`.
pub fn is_same_origin_frame(frame: &FrameInfo, page_host: Option<&str>) -> bool {
    let src = frame.src.trim();
    if src.is_empty() || !frame.srcdoc.is_empty() {
        return true;
    }

    let absolute = if let Some(rest) = src.strip_prefix("//") {
        format!("https://{rest}")
    } else if src.starts_with('/') {
        return true;
    } else {
        let lower = src.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return true;
        }
        src.to_string()
    };

    match (host_of(&absolute), page_host) {
        (Some(frame_host), Some(page_host)) => frame_host.eq_ignore_ascii_case(page_host),
        _ => false,
    }
}

/// Counts effective forms on a page and its same-origin frames.
#[derive(Debug, Clone)]
pub struct FormDetector {
    dom_ready_timeout: Duration,
    /// Bound on each detection script.
    script_timeout: Duration,
}

impl FormDetector {
    pub fn new(dom_ready_timeout: Duration, script_timeout: Duration) -> Self {
        Self {
            dom_ready_timeout,
            script_timeout,
        }
    }

    /// Detect forms on the page currently loaded from `url`.
    ///
    /// `depth` is 1 for the candidate itself and 2 for secondary pages; it
    /// only affects logging. Errors downgrade to "no form" except a lost
    /// browser, which is returned.
    pub async fn detect(&self, page: &dyn RenderPage, url: &str, depth: usize) -> Result<Detection> {
        match self.try_detect(page, url).await {
            Ok(detection) => {
                if detection.found {
                    debug!(depth, url, count = detection.count, "effective forms found");
                } else {
                    debug!(depth, url, "no effective form");
                }
                Ok(detection)
            }
            Err(e) if is_fatal(&e) => Err(e),
            Err(e) => {
                debug!(depth, url, "form check failed: {e:#}");
                Ok(Detection::default())
            }
        }
    }

    async fn try_detect(&self, page: &dyn RenderPage, url: &str) -> Result<Detection> {
        wait_for_dom_ready(page, self.dom_ready_timeout).await?;

        let count = as_count(
            &bounded(
                "form count",
                self.script_timeout,
                page.evaluate(PageScript::CountEffectiveForms),
            )
            .await?,
        );
        if count > 0 {
            return Ok(Detection::of(count));
        }
        Ok(Detection::of(self.count_in_frames(page, url).await?))
    }

    /// Sum of effective forms across the page's same-origin frames.
    async fn count_in_frames(&self, page: &dyn RenderPage, url: &str) -> Result<usize> {
        let listing = bounded("frame listing", self.script_timeout, page.evaluate(PageScript::ListFrames));
        let frames: Vec<FrameInfo> = match listing.await {
            Ok(raw) => serde_json::from_value(raw).unwrap_or_default(),
            Err(e) if is_fatal(&e) => return Err(e),
            Err(e) => {
                debug!(url, "frame listing failed: {e:#}");
                return Ok(0);
            }
        };
        if frames.is_empty() {
            return Ok(0);
        }

        let page_host = host_of(url);
        let mut total = 0;
        for (index, frame) in frames.iter().enumerate() {
            if !is_same_origin_frame(frame, page_host.as_deref()) {
                debug!(url, frame = index + 1, src = %frame.src, "cross-origin frame skipped");
                continue;
            }
            let counted = bounded(
                "frame form count",
                self.script_timeout,
                page.evaluate_in_frame(index, PageScript::CountEffectiveForms),
            );
            match counted.await {
                Ok(Some(raw)) => total += as_count(&raw),
                Ok(None) => debug!(url, frame = index + 1, "frame document not accessible"),
                Err(e) if is_fatal(&e) => return Err(e),
                Err(e) => debug!(url, frame = index + 1, "frame check failed: {e:#}"),
            }
        }
        Ok(total)
    }
}

fn as_count(value: &serde_json::Value) -> usize {
    value.as_u64().unwrap_or(0) as usize
}
