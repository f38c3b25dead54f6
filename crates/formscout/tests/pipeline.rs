// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Session, scheduler, acquisition loop and sequencer against a fake browser.

mod common;

use anyhow::Result;
use async_trait::async_trait;
use common::{EndlessSource, FailingSink, FakeSite, FakeWeb, MemorySink, RecordingNotifier, ScriptedSource};
use formscout::acquisition::AcquisitionLoop;
use formscout::cache::{ResultCache, SharedCache};
use formscout::config::{GroupEntry, GroupTable, PerformanceConfig, RunConfig};
use formscout::error::{is_fatal, ScoutError};
use formscout::progress::{self, Progress, ProgressEventKind};
use formscout::record::CandidateRecord;
use formscout::scheduler::{BatchScheduler, FormChecker};
use formscout::sequencer::{RunSequencer, SequenceStep};
use formscout::session::PageSession;
use formscout::sink::sqlite::SqliteSink;
use formscout::stats::RunContext;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn fresh_cache() -> SharedCache {
    ResultCache::new(Duration::from_secs(3600), 100, 50).shared()
}

fn fast_perf() -> PerformanceConfig {
    let mut perf = PerformanceConfig::default();
    perf.page_load_wait = Duration::from_millis(200);
    perf
}

fn scheduler_for(web: &FakeWeb, perf: PerformanceConfig) -> BatchScheduler {
    let session = Arc::new(PageSession::new(perf, fresh_cache(), Progress::disabled()));
    BatchScheduler::new(web.renderer(), session)
}

fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn today() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Checker with canned verdicts; optionally loses the browser on one call.
struct StubChecker {
    with_form: HashSet<String>,
    fail_on_call: Option<usize>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl StubChecker {
    fn accepting(hrefs: &[&str]) -> Self {
        Self {
            with_form: hrefs.iter().map(|s| s.to_string()).collect(),
            fail_on_call: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FormChecker for StubChecker {
    async fn check_all(&self, urls: &[String], _sessions: usize, _pages: usize) -> Result<Vec<String>> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(urls.to_vec());
            calls.len()
        };
        if self.fail_on_call == Some(call) {
            return Err(ScoutError::BrowserUnavailable("browser crashed".into()).into());
        }
        Ok(urls.iter().filter(|u| self.with_form.contains(*u)).cloned().collect())
    }
}

fn run_config(table: &GroupTable, group: &str) -> RunConfig {
    let mut config = RunConfig::for_group(table, group, 1);
    config.acquisition.iteration_pause = Duration::ZERO;
    config.acquisition.retry_base = Duration::from_millis(1);
    config
}

fn single_group_table(target: usize) -> GroupTable {
    let mut groups = HashMap::new();
    groups.insert(
        "00".to_string(),
        GroupEntry {
            urls: "a.com,b.com".to_string(),
            min_results: target,
        },
    );
    GroupTable::new(groups)
}

// ---- page-pool session ----

#[tokio::test]
async fn test_main_page_form_is_detected() {
    let web = FakeWeb::new()
        .site("https://a.com", FakeSite::with_forms(1))
        .site("https://b.com", FakeSite::default());
    let scheduler = scheduler_for(&web, fast_perf());

    let found = scheduler
        .check_all(&urls(&["a.com", "b.com"]), 1, 2)
        .await
        .unwrap();
    assert_eq!(found, vec!["a.com".to_string()]);
}

#[tokio::test]
async fn test_same_origin_frames_are_counted_cross_origin_ignored() {
    let web = FakeWeb::new()
        .site(
            "https://framed.com",
            FakeSite::default().frame("/embed/form", 2).frame("https://ads.net/x", 4),
        )
        .site(
            "https://foreign.com",
            FakeSite::default().frame("https://widgets.other.com/f", 3),
        );
    let scheduler = scheduler_for(&web, fast_perf());

    let found = scheduler
        .check_all(&urls(&["framed.com", "foreign.com"]), 1, 1)
        .await
        .unwrap();
    assert_eq!(found, vec!["framed.com".to_string()]);
}

#[tokio::test]
async fn test_contact_page_form_found_by_secondary_pass() {
    let web = FakeWeb::new()
        .site(
            "https://b.com",
            FakeSite::linking_to(&["https://b.com/about", "https://b.com/contact-us"]),
        )
        .site("https://b.com/contact-us", FakeSite::with_forms(1));
    let scheduler = scheduler_for(&web, fast_perf());

    let found = scheduler.check_all(&urls(&["b.com"]), 1, 1).await.unwrap();
    assert_eq!(found, vec!["b.com".to_string()]);
    assert_eq!(web.visit_count("https://b.com/about"), 0);
}

#[tokio::test]
async fn test_keyword_pass_skips_links_without_keywords() {
    let web = FakeWeb::new()
        .site(
            "https://d.com",
            FakeSite::linking_to(&["https://d.com/about", "https://d.com/inquiry"]),
        )
        .site("https://d.com/about", FakeSite::with_forms(1))
        .site("https://d.com/inquiry", FakeSite::default());
    let scheduler = scheduler_for(&web, fast_perf());

    let found = scheduler.check_all(&urls(&["d.com"]), 1, 1).await.unwrap();
    assert!(found.is_empty());
    assert_eq!(web.visits(), urls(&["https://d.com", "https://d.com/inquiry"]));
}

#[tokio::test]
async fn test_main_page_only_skips_secondary_pass() {
    let web = FakeWeb::new()
        .site("https://b.com", FakeSite::linking_to(&["https://b.com/contact"]))
        .site("https://b.com/contact", FakeSite::with_forms(1));
    let mut perf = fast_perf();
    perf.strategy.check_main_page_only = true;
    let scheduler = scheduler_for(&web, perf);

    let found = scheduler.check_all(&urls(&["b.com"]), 1, 1).await.unwrap();
    assert!(found.is_empty());
    assert_eq!(web.visits(), vec!["https://b.com".to_string()]);
}

#[tokio::test]
async fn test_generic_probe_prefers_contact_links() {
    let web = FakeWeb::new()
        .site(
            "https://c.com",
            FakeSite::linking_to(&["https://c.com/a", "https://c.com/b", "https://c.com/contact"]),
        )
        .site("https://c.com/a", FakeSite::default())
        .site("https://c.com/contact", FakeSite::default());
    let mut perf = fast_perf();
    perf.strategy.prioritize_contact_pages = false;
    let scheduler = scheduler_for(&web, perf);

    let found = scheduler.check_all(&urls(&["c.com"]), 1, 1).await.unwrap();
    assert!(found.is_empty());
    assert_eq!(
        web.visits(),
        urls(&["https://c.com", "https://c.com/contact", "https://c.com/a"])
    );
}

#[tokio::test]
async fn test_broken_url_does_not_abort_siblings() {
    let web = FakeWeb::new()
        .site("https://down.com", FakeSite::broken())
        .site("https://up.com", FakeSite::with_forms(1))
        .site("https://up2.com", FakeSite::with_forms(2));
    let scheduler = scheduler_for(&web, fast_perf());

    let found = scheduler
        .check_all(&urls(&["down.com", "up.com", "up2.com"]), 1, 1)
        .await
        .unwrap();
    assert_eq!(found, urls(&["up.com", "up2.com"]));
}

#[tokio::test]
async fn test_verdicts_are_cached_across_batches() {
    let web = FakeWeb::new()
        .site("https://a.com", FakeSite::with_forms(1))
        .site("https://down.com", FakeSite::broken());
    let scheduler = scheduler_for(&web, fast_perf());

    for _ in 0..2 {
        let found = scheduler
            .check_all(&urls(&["a.com", "http://down.com", "down.com"]), 2, 3)
            .await
            .unwrap();
        assert_eq!(found, vec!["a.com".to_string()]);
    }
    assert_eq!(web.visit_count("https://a.com"), 1);
    assert_eq!(web.visit_count("https://down.com"), 1);
}

#[tokio::test]
async fn test_progress_reports_each_verdict() {
    let web = FakeWeb::new().site("https://a.com", FakeSite::with_forms(1));
    let (tx, mut rx) = progress::channel();
    let session = Arc::new(PageSession::new(fast_perf(), fresh_cache(), Progress::new(tx)));
    let scheduler = BatchScheduler::new(web.renderer(), session);

    scheduler.check_all(&urls(&["a.com"]), 1, 1).await.unwrap();
    let event = rx.recv().await.unwrap();
    match event.event {
        ProgressEventKind::UrlChecked { url, has_form, cached } => {
            assert_eq!(url, "https://a.com");
            assert!(has_form);
            assert!(!cached);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

// ---- batch scheduler ----

#[tokio::test]
async fn test_failed_session_is_skipped_with_warning() {
    let web = FakeWeb::new().site("https://a.com", FakeSite::with_forms(1));
    web.refuse_pages();
    let (tx, mut rx) = progress::channel();
    let session = Arc::new(PageSession::new(fast_perf(), fresh_cache(), Progress::new(tx)));
    let scheduler = BatchScheduler::new(web.renderer(), session);

    let found = scheduler.check_all(&urls(&["a.com"]), 1, 1).await.unwrap();
    assert!(found.is_empty());

    let mut warnings = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let ProgressEventKind::Warning { message } = event.event {
            warnings.push(message);
        }
    }
    assert!(warnings.iter().any(|m| m.contains("failed to open page")));
    assert!(warnings.iter().any(|m| m.contains("session 1 failed, batch skipped")));
}

#[tokio::test]
async fn test_result_independent_of_partitioning() {
    let mut web = FakeWeb::new();
    let mut all = Vec::new();
    for i in 0..11 {
        let url = format!("site{i}.com");
        let site = match i % 4 {
            0 => FakeSite::with_forms(1),
            1 => FakeSite::broken(),
            2 => FakeSite::default().frame("/inner", 1),
            _ => FakeSite::default(),
        };
        web = web.site(&format!("https://{url}"), site);
        all.push(url);
    }

    let sequential: HashSet<String> = scheduler_for(&web, fast_perf())
        .check_all(&all, 1, 1)
        .await
        .unwrap()
        .into_iter()
        .collect();
    let concurrent: HashSet<String> = scheduler_for(&web, fast_perf())
        .check_all(&all, 4, 3)
        .await
        .unwrap()
        .into_iter()
        .collect();

    assert_eq!(sequential, concurrent);
    assert_eq!(sequential.len(), 6);
}

#[tokio::test]
async fn test_session_count_follows_ceil_partition() {
    let mut web = FakeWeb::new();
    let list: Vec<String> = (0..10).map(|i| format!("s{i}.com")).collect();
    for url in &list {
        web = web.site(&format!("https://{url}"), FakeSite::default());
    }
    scheduler_for(&web, fast_perf())
        .check_all(&list, 3, 2)
        .await
        .unwrap();
    assert_eq!(web.contexts_opened(), 3);
}

#[tokio::test]
async fn test_lost_browser_propagates() {
    let web = FakeWeb::new().site("https://a.com", FakeSite::with_forms(1));
    web.kill();
    let err = scheduler_for(&web, fast_perf())
        .check_all(&urls(&["a.com", "b.com"]), 2, 1)
        .await
        .unwrap_err();
    assert!(is_fatal(&err));
}

#[tokio::test]
async fn test_empty_url_list_is_noop() {
    let web = FakeWeb::new();
    let found = scheduler_for(&web, fast_perf()).check_all(&[], 4, 6).await.unwrap();
    assert!(found.is_empty());
    assert_eq!(web.contexts_opened(), 0);
}

// ---- acquisition loop ----

#[tokio::test]
async fn test_loop_stops_at_target_and_persists_row() {
    let web = FakeWeb::new()
        .site("https://a.com", FakeSite::with_forms(1))
        .site("https://b.com", FakeSite::default());
    let source = Arc::new(ScriptedSource::new(vec![
        vec![CandidateRecord::new("a.com", Some("x,y"))],
        vec![CandidateRecord::new("b.com", Some(""))],
    ]));
    let sink = Arc::new(MemorySink::default());
    let acquisition = AcquisitionLoop::new(
        source.clone(),
        Arc::new(scheduler_for(&web, fast_perf())),
        sink.clone(),
        Progress::disabled(),
    );

    let table = single_group_table(1);
    let mut ctx = RunContext::new();
    let outcome = acquisition.run(&run_config(&table, "00"), &mut ctx).await.unwrap();

    assert_eq!(outcome.records, vec![CandidateRecord::new("a.com", Some("x"))]);
    assert_eq!(outcome.batches, 1);
    assert_eq!(source.requests().len(), 1);

    let rows = sink.rows("00");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].cells(), ["a.com".to_string(), "x".into(), today(), String::new(), String::new()]);

    let stats = ctx.get("00").unwrap();
    assert_eq!((stats.target, stats.actual, stats.batches), (1, 1, 1));
}

#[tokio::test]
async fn test_loop_respects_batch_budget_and_advances_skip() {
    let source = Arc::new(ScriptedSource::new(Vec::new()));
    let checker = Arc::new(StubChecker::accepting(&[]));
    let acquisition = AcquisitionLoop::new(
        source.clone(),
        checker.clone(),
        Arc::new(MemorySink::default()),
        Progress::disabled(),
    );

    let table = single_group_table(5);
    let mut config = run_config(&table, "00");
    config.acquisition.max_batches = 3;
    config.acquisition.batch_size = 20;

    let mut ctx = RunContext::new();
    let outcome = acquisition.run(&config, &mut ctx).await.unwrap();

    assert_eq!(outcome.batches, 3);
    assert!(outcome.records.is_empty());
    assert!(checker.calls().is_empty());
    let skips: Vec<usize> = source.requests().iter().map(|(_, r)| r.skip).collect();
    assert_eq!(skips, vec![0, 20, 40]);
    assert!(source.requests().iter().all(|(g, r)| g == "00" && r.urls == "a.com,b.com"));
    assert_eq!(ctx.get("00").unwrap().batches, 3);
}

#[tokio::test]
async fn test_loop_never_rechecks_processed_urls() {
    let source = Arc::new(ScriptedSource::new(vec![
        vec![CandidateRecord::bare("a.com"), CandidateRecord::bare("b.com")],
        vec![CandidateRecord::bare("https://a.com"), CandidateRecord::bare("c.com")],
    ]));
    let checker = Arc::new(StubChecker::accepting(&["c.com"]));
    let acquisition = AcquisitionLoop::new(
        source,
        checker.clone(),
        Arc::new(MemorySink::default()),
        Progress::disabled(),
    );

    let table = single_group_table(1);
    let outcome = acquisition
        .run(&run_config(&table, "00"), &mut RunContext::new())
        .await
        .unwrap();

    assert_eq!(checker.calls(), vec![urls(&["a.com", "b.com"]), urls(&["c.com"])]);
    assert_eq!(outcome.records, vec![CandidateRecord::bare("c.com")]);
    assert_eq!(outcome.processed, 3);
}

#[tokio::test]
async fn test_loop_stops_at_url_ceiling() {
    let source = Arc::new(ScriptedSource::new(vec![
        vec![CandidateRecord::bare("a.com"), CandidateRecord::bare("b.com")],
        vec![CandidateRecord::bare("c.com"), CandidateRecord::bare("d.com")],
        vec![CandidateRecord::bare("e.com")],
    ]));
    let checker = Arc::new(StubChecker::accepting(&[]));
    let acquisition = AcquisitionLoop::new(
        source,
        checker.clone(),
        Arc::new(MemorySink::default()),
        Progress::disabled(),
    );

    let table = single_group_table(10);
    let mut config = run_config(&table, "00");
    config.acquisition.max_urls = Some(3);
    let outcome = acquisition.run(&config, &mut RunContext::new()).await.unwrap();

    assert_eq!(checker.calls(), vec![urls(&["a.com", "b.com"]), urls(&["c.com"])]);
    assert_eq!(outcome.processed, 3);
    assert_eq!(outcome.batches, 2);
}

#[tokio::test]
async fn test_bulk_write_happens_once_at_the_end() {
    let source = Arc::new(ScriptedSource::new(vec![
        vec![CandidateRecord::bare("a.com")],
        vec![CandidateRecord::bare("b.com")],
    ]));
    let sink = Arc::new(MemorySink::default());
    let acquisition = AcquisitionLoop::new(
        source,
        Arc::new(StubChecker::accepting(&["a.com", "b.com"])),
        sink.clone(),
        Progress::disabled(),
    );

    let table = single_group_table(2);
    let mut config = run_config(&table, "00");
    config.acquisition.realtime_write = false;
    acquisition.run(&config, &mut RunContext::new()).await.unwrap();

    assert_eq!(sink.append_calls(), 1);
    assert_eq!(sink.rows("00").len(), 2);
}

#[tokio::test]
async fn test_lost_browser_flushes_accumulated_rows() {
    let source = Arc::new(ScriptedSource::new(vec![
        vec![CandidateRecord::new("a.com", Some("p1,p2"))],
        vec![CandidateRecord::bare("b.com")],
    ]));
    let checker = Arc::new(StubChecker {
        fail_on_call: Some(2),
        ..StubChecker::accepting(&["a.com", "b.com"])
    });
    let sink = Arc::new(MemorySink::default());
    let acquisition = AcquisitionLoop::new(source, checker, sink.clone(), Progress::disabled());

    let table = single_group_table(5);
    let mut config = run_config(&table, "00");
    config.acquisition.realtime_write = false;
    let err = acquisition.run(&config, &mut RunContext::new()).await.unwrap_err();

    assert!(is_fatal(&err));
    let rows = sink.rows("00");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].param, "p1");
}

#[tokio::test]
async fn test_failing_sink_does_not_stop_the_loop() {
    let source = Arc::new(ScriptedSource::new(vec![
        vec![CandidateRecord::bare("a.com")],
        vec![CandidateRecord::bare("b.com")],
    ]));
    let sink = Arc::new(FailingSink::default());
    let acquisition = AcquisitionLoop::new(
        source,
        Arc::new(StubChecker::accepting(&["a.com", "b.com"])),
        sink.clone(),
        Progress::disabled(),
    );

    let table = single_group_table(2);
    let mut config = run_config(&table, "00");
    config.acquisition.realtime_write = true;
    config.acquisition.write_retry = 3;
    let outcome = acquisition.run(&config, &mut RunContext::new()).await.unwrap();

    assert_eq!(outcome.batches, 2);
    assert_eq!(
        outcome.records,
        vec![CandidateRecord::bare("a.com"), CandidateRecord::bare("b.com")]
    );
    assert_eq!(sink.attempts(), 6);
}

#[tokio::test]
async fn test_failed_fetch_counts_as_empty_iteration() {
    let source = Arc::new(ScriptedSource::with_outages(vec![
        None,
        Some(vec![CandidateRecord::bare("a.com")]),
    ]));
    let checker = Arc::new(StubChecker::accepting(&["a.com"]));
    let acquisition = AcquisitionLoop::new(
        source.clone(),
        checker.clone(),
        Arc::new(MemorySink::default()),
        Progress::disabled(),
    );

    let table = single_group_table(1);
    let mut config = run_config(&table, "00");
    config.acquisition.batch_size = 10;
    let mut ctx = RunContext::new();
    let outcome = acquisition.run(&config, &mut ctx).await.unwrap();

    assert_eq!(outcome.batches, 2);
    assert_eq!(outcome.records, vec![CandidateRecord::bare("a.com")]);
    assert_eq!(checker.calls(), vec![urls(&["a.com"])]);
    let skips: Vec<usize> = source.requests().iter().map(|(_, r)| r.skip).collect();
    assert_eq!(skips, vec![0, 10]);
    assert_eq!(ctx.get("00").unwrap().batches, 2);
}

#[tokio::test]
async fn test_endless_source_without_forms_stops_at_batch_budget() {
    let source = Arc::new(EndlessSource::new(4));
    let checker = Arc::new(StubChecker::accepting(&[]));
    let acquisition = AcquisitionLoop::new(
        source.clone(),
        checker.clone(),
        Arc::new(MemorySink::default()),
        Progress::disabled(),
    );

    let table = single_group_table(5);
    let mut config = run_config(&table, "00");
    config.acquisition.max_batches = 3;
    let outcome = acquisition.run(&config, &mut RunContext::new()).await.unwrap();

    assert_eq!(outcome.batches, 3);
    assert_eq!(source.calls(), 3);
    assert_eq!(checker.calls().len(), 3);
    assert!(checker.calls().iter().all(|batch| batch.len() == 4));
    assert_eq!(outcome.processed, 12);
    assert!(outcome.records.is_empty());
}

#[tokio::test]
async fn test_end_to_end_into_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(SqliteSink::open(&dir.path().join("rows.db")).unwrap());
    let web = FakeWeb::new()
        .site("https://a.com", FakeSite::with_forms(1))
        .site("https://b.com", FakeSite::default());
    let source = Arc::new(ScriptedSource::new(vec![vec![
        CandidateRecord::new("a.com", Some("x")),
        CandidateRecord::new("b.com", None),
    ]]));
    let acquisition = AcquisitionLoop::new(
        source,
        Arc::new(scheduler_for(&web, fast_perf())),
        sink.clone(),
        Progress::disabled(),
    );

    let table = single_group_table(1);
    acquisition
        .run(&run_config(&table, "00"), &mut RunContext::new())
        .await
        .unwrap();

    let rows = sink.rows("00").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].href, "a.com");
    assert_eq!(rows[0].param, "x");
    assert_eq!(rows[0].date, today());
}

// ---- run sequencer ----

fn two_group_table() -> GroupTable {
    let mut groups = HashMap::new();
    groups.insert(
        "g1".to_string(),
        GroupEntry {
            urls: "one.example".to_string(),
            min_results: 1,
        },
    );
    groups.insert(
        "g2".to_string(),
        GroupEntry {
            urls: "two.example".to_string(),
            min_results: 2,
        },
    );
    GroupTable::new(groups)
}

fn sequencer_with(
    source: Arc<ScriptedSource>,
    notifier: Arc<RecordingNotifier>,
    sink: Arc<MemorySink>,
) -> RunSequencer {
    let acquisition = AcquisitionLoop::new(
        source,
        Arc::new(StubChecker::accepting(&["x1.com", "y1.com", "y2.com"])),
        sink,
        Progress::disabled(),
    );
    RunSequencer::new(two_group_table(), urls(&["g1", "g2"]), acquisition, notifier)
        .with_report_link(Some("https://sheets.example/doc".to_string()))
}

#[tokio::test]
async fn test_sequence_runs_every_group_and_reports_once() {
    let source = Arc::new(ScriptedSource::new(vec![
        vec![CandidateRecord::bare("x1.com")],
        vec![CandidateRecord::bare("y1.com"), CandidateRecord::bare("y2.com")],
    ]));
    let notifier = Arc::new(RecordingNotifier::default());
    let sink = Arc::new(MemorySink::default());
    let sequencer = sequencer_with(source.clone(), notifier.clone(), sink.clone());

    let table = two_group_table();
    let mut config = run_config(&table, "g1");
    let mut ctx = RunContext::new();
    let finished = sequencer.run(&mut config, &mut ctx).await.unwrap();

    let summary: Vec<(String, usize, usize)> = finished
        .iter()
        .map(|g| (g.group.clone(), g.target, g.actual))
        .collect();
    assert_eq!(summary, vec![("g1".into(), 1, 1), ("g2".into(), 2, 2)]);

    let requests = source.requests();
    assert_eq!(requests[0].0, "g1");
    assert_eq!(requests[0].1.urls, "one.example");
    assert_eq!(requests[1].0, "g2");
    assert_eq!(requests[1].1.urls, "two.example");

    assert_eq!(sink.rows("g1").len(), 1);
    assert_eq!(sink.rows("g2").len(), 2);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Worksheet g1:"));
    assert!(messages[0].contains("Worksheet g2:"));
    assert!(messages[0].contains("total target: 3 | total actual: 3"));
    assert!(messages[0].contains("https://sheets.example/doc"));
    assert!(ctx.is_empty());
}

#[tokio::test]
async fn test_advance_switches_to_next_group() {
    let sequencer = sequencer_with(
        Arc::new(ScriptedSource::new(Vec::new())),
        Arc::new(RecordingNotifier::default()),
        Arc::new(MemorySink::default()),
    );
    let table = two_group_table();
    let mut config = run_config(&table, "g1");
    let step = sequencer.advance(&mut config, &mut RunContext::new()).await;

    assert_eq!(step, SequenceStep::Next("g2".to_string()));
    assert_eq!(config.group_name, "g2");
    assert_eq!(config.url_filter, "two.example");
    assert_eq!(config.min_results, 2);
}

#[tokio::test]
async fn test_single_group_override_sends_no_report() {
    let source = Arc::new(ScriptedSource::new(vec![vec![CandidateRecord::bare("x1.com")]]));
    let notifier = Arc::new(RecordingNotifier::default());
    let sequencer = sequencer_with(source.clone(), notifier.clone(), Arc::new(MemorySink::default()));

    let table = two_group_table();
    let mut config = run_config(&table, "g1");
    config.single_group = true;
    let finished = sequencer.run(&mut config, &mut RunContext::new()).await.unwrap();

    assert_eq!(finished.len(), 1);
    assert!(source.requests().iter().all(|(g, _)| g == "g1"));
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn test_group_outside_sequence_stops_without_report() {
    let notifier = Arc::new(RecordingNotifier::default());
    let sequencer = sequencer_with(
        Arc::new(ScriptedSource::new(Vec::new())),
        notifier.clone(),
        Arc::new(MemorySink::default()),
    );
    let table = two_group_table();
    let mut config = run_config(&table, "adhoc");
    let mut ctx = RunContext::new();

    assert_eq!(sequencer.advance(&mut config, &mut ctx).await, SequenceStep::Stop);
    assert_eq!(config.group_name, "adhoc");
    assert!(notifier.messages().is_empty());
}
