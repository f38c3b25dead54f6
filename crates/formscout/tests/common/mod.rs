// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-memory stand-ins for the browser and the pipeline's outer
//! collaborators, shared by the integration tests.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use formscout::config::BrowserProfile;
use formscout::error::ScoutError;
use formscout::notify::Notifier;
use formscout::record::{CandidateRecord, SheetRow};
use formscout::renderer::{FrameInfo, NavigationResult, PageScript, RenderContext, RenderPage, Renderer};
use formscout::sink::{AppendSummary, RowSink};
use formscout::source::{CandidateSource, FetchRequest};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One fake page: its forms, iframes and outbound links.
#[derive(Debug, Clone, Default)]
pub struct FakeSite {
    pub forms: usize,
    /// Frame attributes and the forms inside each frame's document.
    pub frames: Vec<(FrameInfo, usize)>,
    pub links: Vec<String>,
    /// Navigation to this page fails.
    pub broken: bool,
}

impl FakeSite {
    pub fn with_forms(forms: usize) -> Self {
        Self {
            forms,
            ..Self::default()
        }
    }

    pub fn linking_to(links: &[&str]) -> Self {
        Self {
            links: links.iter().map(|l| l.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    pub fn frame(mut self, src: &str, forms: usize) -> Self {
        self.frames.push((
            FrameInfo {
                src: src.to_string(),
                srcdoc: String::new(),
            },
            forms,
        ));
        self
    }
}

/// A fake web keyed by exact URL, plus a browser kill switch.
#[derive(Clone, Default)]
pub struct FakeWeb {
    sites: Arc<Mutex<HashMap<String, FakeSite>>>,
    visits: Arc<Mutex<Vec<String>>>,
    dead: Arc<AtomicBool>,
    no_pages: Arc<AtomicBool>,
    contexts_opened: Arc<AtomicUsize>,
    open_contexts: Arc<AtomicUsize>,
}

impl FakeWeb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn site(self, url: &str, site: FakeSite) -> Self {
        self.sites.lock().unwrap().insert(url.to_string(), site);
        self
    }

    /// Every navigation attempted so far, in order.
    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }

    pub fn visit_count(&self, url: &str) -> usize {
        self.visits().iter().filter(|v| *v == url).count()
    }

    /// Make every further browser call fail as a lost browser.
    pub fn kill(&self) {
        self.dead.store(true, Ordering::SeqCst);
    }

    /// Make every further page open fail; the browser itself stays up.
    pub fn refuse_pages(&self) {
        self.no_pages.store(true, Ordering::SeqCst);
    }

    pub fn contexts_opened(&self) -> usize {
        self.contexts_opened.load(Ordering::SeqCst)
    }

    pub fn renderer(&self) -> Arc<dyn Renderer> {
        Arc::new(FakeRenderer { web: self.clone() })
    }

    fn lost(&self) -> Result<()> {
        if self.dead.load(Ordering::SeqCst) {
            return Err(ScoutError::BrowserUnavailable("fake browser killed".into()).into());
        }
        Ok(())
    }
}

pub struct FakeRenderer {
    web: FakeWeb,
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn new_context(&self, _profile: &BrowserProfile) -> Result<Box<dyn RenderContext>> {
        self.web.lost()?;
        self.web.contexts_opened.fetch_add(1, Ordering::SeqCst);
        self.web.open_contexts.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeContext { web: self.web.clone() }))
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.web.open_contexts.load(Ordering::SeqCst)
    }
}

struct FakeContext {
    web: FakeWeb,
}

#[async_trait]
impl RenderContext for FakeContext {
    async fn new_page(&self) -> Result<Box<dyn RenderPage>> {
        self.web.lost()?;
        if self.web.no_pages.load(Ordering::SeqCst) {
            return Err(ScoutError::Script("page limit reached".into()).into());
        }
        Ok(Box::new(FakePage {
            web: self.web.clone(),
            current: None,
        }))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.web.open_contexts.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakePage {
    web: FakeWeb,
    current: Option<(String, FakeSite)>,
}

impl FakePage {
    fn loaded(&self) -> Result<&FakeSite> {
        self.web.lost()?;
        self.current
            .as_ref()
            .map(|(_, site)| site)
            .ok_or_else(|| ScoutError::Script("no page loaded".into()).into())
    }
}

#[async_trait]
impl RenderPage for FakePage {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<NavigationResult> {
        self.web.visits.lock().unwrap().push(url.to_string());
        self.web.lost()?;
        self.current = None;
        let site = self.web.sites.lock().unwrap().get(url).cloned();
        match site {
            Some(site) if !site.broken => {
                self.current = Some((url.to_string(), site));
                // Let sibling lanes interleave like real navigations do.
                tokio::task::yield_now().await;
                Ok(NavigationResult {
                    final_url: url.to_string(),
                    load_time_ms: 1,
                })
            }
            _ => Err(ScoutError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".into(),
            }
            .into()),
        }
    }

    async fn evaluate(&self, script: PageScript) -> Result<Value> {
        let site = self.loaded()?;
        Ok(match script {
            PageScript::ReadyState => json!("complete"),
            PageScript::CountEffectiveForms => json!(site.forms),
            PageScript::CollectLinks => json!(site.links),
            PageScript::ListFrames => Value::Array(
                site.frames
                    .iter()
                    .map(|(f, _)| json!({"src": f.src, "srcdoc": f.srcdoc}))
                    .collect(),
            ),
        })
    }

    async fn evaluate_in_frame(&self, index: usize, script: PageScript) -> Result<Option<Value>> {
        let site = self.loaded()?;
        Ok(match (script, site.frames.get(index)) {
            (PageScript::CountEffectiveForms, Some((_, forms))) => Some(json!(forms)),
            _ => None,
        })
    }

    async fn current_url(&self) -> Result<String> {
        self.web.lost()?;
        Ok(self
            .current
            .as_ref()
            .map(|(url, _)| url.clone())
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Candidate source replaying canned pages by call order.
#[derive(Default)]
pub struct ScriptedSource {
    /// Remaining pages, last served first; `None` is an API failure.
    pages: Mutex<Vec<Option<Vec<CandidateRecord>>>>,
    requests: Mutex<Vec<(String, FetchRequest)>>,
}

impl ScriptedSource {
    /// Serve `pages` in order, then empty pages forever.
    pub fn new(pages: Vec<Vec<CandidateRecord>>) -> Self {
        Self::with_outages(pages.into_iter().map(Some).collect())
    }

    /// Like [`ScriptedSource::new`], but a `None` page fails the call.
    pub fn with_outages(pages: Vec<Option<Vec<CandidateRecord>>>) -> Self {
        Self {
            pages: Mutex::new(pages.into_iter().rev().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<(String, FetchRequest)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CandidateSource for ScriptedSource {
    async fn fetch(&self, group: &str, request: &FetchRequest) -> Result<Vec<CandidateRecord>> {
        self.requests
            .lock()
            .unwrap()
            .push((group.to_string(), request.clone()));
        match self.pages.lock().unwrap().pop() {
            Some(Some(page)) => Ok(page),
            Some(None) => Err(ScoutError::Api("HTTP 503 from export API".into()).into()),
            None => Ok(Vec::new()),
        }
    }
}

/// Candidate source that never runs dry: every call returns `per_page`
/// hrefs nobody has seen before.
pub struct EndlessSource {
    per_page: usize,
    calls: AtomicUsize,
}

impl EndlessSource {
    pub fn new(per_page: usize) -> Self {
        Self {
            per_page,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandidateSource for EndlessSource {
    async fn fetch(&self, _group: &str, _request: &FetchRequest) -> Result<Vec<CandidateRecord>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((0..self.per_page)
            .map(|i| CandidateRecord::bare(format!("site{call}-{i}.com")))
            .collect())
    }
}

/// Row sink keeping everything in memory.
#[derive(Default)]
pub struct MemorySink {
    rows: Mutex<Vec<(String, SheetRow)>>,
    calls: AtomicUsize,
}

impl MemorySink {
    pub fn rows(&self, worksheet: &str) -> Vec<SheetRow> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|(ws, _)| ws == worksheet)
            .map(|(_, row)| row.clone())
            .collect()
    }

    pub fn append_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RowSink for MemorySink {
    async fn append(&self, worksheet: &str, rows: &[SheetRow]) -> Result<AppendSummary> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut stored = self.rows.lock().unwrap();
        stored.extend(rows.iter().map(|r| (worksheet.to_string(), r.clone())));
        Ok(AppendSummary {
            appended: rows.len(),
            duplicates: 0,
        })
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Row sink whose every append fails.
#[derive(Default)]
pub struct FailingSink {
    attempts: AtomicUsize,
}

impl FailingSink {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RowSink for FailingSink {
    async fn append(&self, _worksheet: &str, _rows: &[SheetRow]) -> Result<AppendSummary> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ScoutError::Sink("HTTP 500 from spreadsheet".into()).into())
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}

/// Notifier recording every message.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_text(&self, message: &str) -> bool {
        self.messages.lock().unwrap().push(message.to_string());
        true
    }
}
