// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Formscout: finds candidate websites that expose a contact or lead form.
//!
//! Candidate URLs come from an upstream API in named groups. Each URL is
//! rendered in headless Chromium and checked for forms on the page itself,
//! inside same-origin iframes, and on a few contact-like secondary pages.
//! Qualifying URLs are persisted to a row sink until each group reaches its
//! target, and a summary goes out once the whole group sequence is done.

pub mod acquisition;
pub mod cache;
pub mod cli;
pub mod config;
pub mod daily;
pub mod detector;
pub mod error;
pub mod notify;
pub mod progress;
pub mod prober;
pub mod record;
pub mod renderer;
pub mod scheduler;
pub mod sequencer;
pub mod session;
pub mod sink;
pub mod source;
pub mod stats;
pub mod url_norm;
