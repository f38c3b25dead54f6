// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! URL normalization and identity helpers.

use fnv::FnvHasher;
use std::hash::Hasher;

/// Ensure a candidate href carries a protocol prefix (`https://` when missing).
///
/// Idempotent: a normalized URL is returned unchanged.
pub fn normalize(href: &str) -> String {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("https://{href}")
    }
}

/// Stable 64-bit identity of a normalized URL, used as the cache key.
pub fn url_key(normalized: &str) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(normalized.as_bytes());
    hasher.finish()
}

/// Host part of a URL, normalizing first so bare domains parse.
pub fn host_of(url: &str) -> Option<String> {
    url::Url::parse(&normalize(url))
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}

/// True for absolute `http`/`https` URLs.
pub fn is_web_url(url: &str) -> bool {
    url::Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}
