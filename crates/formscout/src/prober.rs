// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Secondary-link selection for pages without a form.
//!
//! Two selection modes exist: [`probe_links`] orders every outbound web link
//! with contact pages first, and [`keyword_links`] keeps only links whose URL
//! mentions one of the configured contact keywords.

use crate::renderer::{PageScript, RenderPage};
use crate::url_norm::is_web_url;
use anyhow::Result;

/// Anchor hrefs of the loaded page, absolute `http(s)` only, document order.
async fn web_links(page: &dyn RenderPage) -> Result<Vec<String>> {
    let raw = page.evaluate(PageScript::CollectLinks).await?;
    let links: Vec<String> = serde_json::from_value(raw).unwrap_or_default();
    Ok(links.into_iter().filter(|l| is_web_url(l)).collect())
}

/// Up to `max_links` web links, those whose path mentions "contact" first.
pub async fn probe_links(page: &dyn RenderPage, max_links: usize) -> Result<Vec<String>> {
    Ok(contact_first(web_links(page).await?, max_links))
}

/// Up to `max_links` distinct web links whose URL contains any of `keywords`.
pub async fn keyword_links(
    page: &dyn RenderPage,
    keywords: &[String],
    max_links: usize,
) -> Result<Vec<String>> {
    Ok(matching_keywords(web_links(page).await?, keywords, max_links))
}

/// Stable partition: contact-like links, then the rest, truncated.
pub fn contact_first(links: Vec<String>, max_links: usize) -> Vec<String> {
    let (mut contact, other): (Vec<String>, Vec<String>) =
        links.into_iter().partition(|link| path_of(link).contains("contact"));
    contact.extend(other);
    contact.truncate(max_links);
    contact
}

/// Links matching a keyword (case-insensitive), first occurrence only.
pub fn matching_keywords(links: Vec<String>, keywords: &[String], max_links: usize) -> Vec<String> {
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_ascii_lowercase()).collect();
    let mut selected: Vec<String> = Vec::new();
    for link in links {
        if selected.len() >= max_links {
            break;
        }
        let lower = link.to_ascii_lowercase();
        if keywords.iter().any(|k| lower.contains(k.as_str())) && !selected.contains(&link) {
            selected.push(link);
        }
    }
    selected
}

fn path_of(link: &str) -> String {
    url::Url::parse(link)
        .map(|u| u.path().to_ascii_lowercase())
        .unwrap_or_default()
}
