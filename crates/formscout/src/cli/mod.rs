// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Command-line surface: global options and the wiring that turns them into
//! a running pipeline.

pub mod check_cmd;
pub mod doctor;
pub mod logging;
pub mod run_cmd;
pub mod schedule_cmd;

use crate::acquisition::AcquisitionLoop;
use crate::cache::{ResultCache, SharedCache};
use crate::config::{
    AcquisitionConfig, GroupTable, PerformanceConfig, RunConfig, DEFAULT_API_URL, DEFAULT_BATCH_SIZE,
    DEFAULT_CACHE_DATE_LEN, DEFAULT_CREDENTIALS_PATH, DEFAULT_LOG_FILE, DEFAULT_MAX_BATCHES,
    DEFAULT_MIN_RESULTS, DEFAULT_SEQUENCE, DEFAULT_SHEET_NAME, DEFAULT_WORKSHEET_NAME,
    DEFAULT_WRITE_RETRY,
};
use crate::notify::{LogNotifier, Notifier, WebhookNotifier};
use crate::progress::{Progress, ProgressEventKind, ProgressReceiver};
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::Renderer;
use crate::scheduler::BatchScheduler;
use crate::sequencer::RunSequencer;
use crate::session::PageSession;
use crate::sink::sheets::{SheetsCredentials, SheetsSink};
use crate::sink::sqlite::SqliteSink;
use crate::sink::RowSink;
use crate::source::response_log::ResponseLog;
use crate::source::{ApiSource, CandidateSource};
use crate::stats::{GroupStats, RunContext};
use anyhow::Result;
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Where qualifying rows are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    /// Local SQLite database (`--db`).
    Sqlite,
    /// Google Sheets spreadsheet (`--sheet-name` is the spreadsheet id).
    Sheets,
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Candidate URL API endpoint.
    #[arg(long, global = true, env = "FORMSCOUT_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Sink credentials file (Sheets access token JSON).
    #[arg(long, global = true, env = "FORMSCOUT_CREDENTIALS", default_value = DEFAULT_CREDENTIALS_PATH)]
    pub credentials: PathBuf,

    /// Destination spreadsheet.
    #[arg(long, global = true, env = "FORMSCOUT_SHEET_NAME", default_value = DEFAULT_SHEET_NAME)]
    pub sheet_name: String,

    /// Group the run starts with; also the first worksheet written.
    #[arg(long, global = true, env = "FORMSCOUT_WORKSHEET_NAME", default_value = DEFAULT_WORKSHEET_NAME)]
    pub worksheet_name: String,

    /// API lookback window in days.
    #[arg(long, global = true, env = "FORMSCOUT_CACHE_DATE_LEN", default_value_t = DEFAULT_CACHE_DATE_LEN)]
    pub cache_date_len: u32,

    /// Stop a group after this many URLs were checked.
    #[arg(long, global = true, env = "FORMSCOUT_MAX_URLS")]
    pub max_urls: Option<usize>,

    /// Target for groups without their own threshold.
    #[arg(long, global = true, env = "FORMSCOUT_MIN_RESULTS", default_value_t = DEFAULT_MIN_RESULTS)]
    pub min_results: usize,

    /// Records requested per API call.
    #[arg(long, global = true, env = "FORMSCOUT_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Iteration budget per group.
    #[arg(long, global = true, env = "FORMSCOUT_MAX_BATCHES", default_value_t = DEFAULT_MAX_BATCHES)]
    pub max_batches: usize,

    /// Navigation timeout in milliseconds.
    #[arg(long, global = true, env = "FORMSCOUT_TIMEOUT", default_value_t = 8000)]
    pub timeout: u64,

    /// Run the browser headless (default).
    #[arg(long, global = true, overrides_with = "headed")]
    pub headless: bool,

    /// Show the browser window.
    #[arg(long, global = true, env = "FORMSCOUT_HEADED", overrides_with = "headless")]
    pub headed: bool,

    /// Persist every batch as it completes (default).
    #[arg(long, global = true, overrides_with = "no_realtime_write")]
    pub realtime_write: bool,

    /// Persist once per group instead of after every batch.
    #[arg(long, global = true, env = "FORMSCOUT_NO_REALTIME_WRITE", overrides_with = "realtime_write")]
    pub no_realtime_write: bool,

    /// Attempts per incremental write.
    #[arg(long, global = true, env = "FORMSCOUT_WRITE_RETRY", default_value_t = DEFAULT_WRITE_RETRY)]
    pub write_retry: u32,

    /// Log level when RUST_LOG is unset.
    #[arg(long, global = true, env = "FORMSCOUT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "FORMSCOUT_LOG_JSON")]
    pub log_json: bool,

    /// Duplicate logs to this file; pass an empty value to disable.
    #[arg(long, global = true, env = "FORMSCOUT_LOG_FILE", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Directory for raw API response logs.
    #[arg(long, global = true, env = "FORMSCOUT_RESPONSE_LOG_DIR", default_value = "log")]
    pub response_log_dir: PathBuf,

    /// Notification webhook; without it notifications go to the log.
    #[arg(long, global = true, env = "FORMSCOUT_WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Row sink.
    #[arg(long, global = true, env = "FORMSCOUT_SINK", value_enum, default_value = "sqlite")]
    pub sink: SinkKind,

    /// SQLite database for `--sink sqlite`.
    #[arg(long, global = true, env = "FORMSCOUT_DB", default_value = "formscout.db")]
    pub db: PathBuf,

    /// JSON file replacing the built-in group table.
    #[arg(long, global = true, env = "FORMSCOUT_GROUPS_FILE")]
    pub groups_file: Option<PathBuf>,

    /// Link appended to the summary report.
    #[arg(long, global = true, env = "FORMSCOUT_REPORT_LINK")]
    pub report_link: Option<String>,
}

impl GlobalArgs {
    pub fn headless(&self) -> bool {
        !self.headed
    }

    pub fn realtime_write(&self) -> bool {
        !self.no_realtime_write
    }

    /// Performance profile with the command-line overrides applied.
    pub fn performance(&self) -> PerformanceConfig {
        let mut perf = PerformanceConfig::default();
        perf.navigation_timeout = Duration::from_millis(self.timeout);
        perf.browser.headless = self.headless();
        perf.browser.page_timeout = Duration::from_millis(self.timeout);
        perf
    }

    pub fn acquisition(&self) -> AcquisitionConfig {
        AcquisitionConfig {
            batch_size: self.batch_size,
            max_batches: self.max_batches,
            max_urls: self.max_urls,
            cache_date_len: self.cache_date_len,
            realtime_write: self.realtime_write(),
            write_retry: self.write_retry,
            ..AcquisitionConfig::default()
        }
    }

    pub fn group_table(&self) -> Result<GroupTable> {
        match &self.groups_file {
            Some(path) => GroupTable::load(path),
            None => Ok(GroupTable::builtin()),
        }
    }

    /// Run configuration starting at `group` (or `--worksheet-name`).
    pub fn run_config(&self, table: &GroupTable, group: Option<&str>, single: bool) -> RunConfig {
        let start = group.unwrap_or(&self.worksheet_name);
        let mut config = RunConfig::for_group(table, start, self.min_results);
        config.single_group = single;
        config.acquisition = self.acquisition();
        config
    }

    pub fn open_sink(&self) -> Result<Arc<dyn RowSink>> {
        Ok(match self.sink {
            SinkKind::Sqlite => Arc::new(SqliteSink::open(&self.db)?),
            SinkKind::Sheets => {
                let credentials = SheetsCredentials::load(&self.credentials)?;
                Arc::new(SheetsSink::new(&self.sheet_name, credentials.access_token))
            }
        })
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        match &self.webhook_url {
            Some(url) if !url.is_empty() => Arc::new(WebhookNotifier::new(url.as_str())),
            _ => Arc::new(LogNotifier),
        }
    }
}

/// Long-lived collaborators reused across runs of one process.
pub struct Services {
    pub perf: PerformanceConfig,
    pub cache: SharedCache,
    pub table: GroupTable,
    pub source: Arc<dyn CandidateSource>,
    pub sink: Arc<dyn RowSink>,
    pub notifier: Arc<dyn Notifier>,
    pub progress: Progress,
    pub report_link: Option<String>,
}

impl Services {
    pub fn from_args(args: &GlobalArgs, progress: Progress) -> Result<Self> {
        let perf = args.performance();
        let cache = ResultCache::new(perf.cache_expire, perf.cache_max_size, perf.cache_cleanup_size).shared();
        let source = ApiSource::new(&args.api_url, Duration::from_secs(30))
            .with_response_log(ResponseLog::new(&args.response_log_dir));
        Ok(Self {
            perf,
            cache,
            table: args.group_table()?,
            source: Arc::new(source),
            sink: args.open_sink()?,
            notifier: args.notifier(),
            progress,
            report_link: args.report_link.clone(),
        })
    }

    /// Launch a browser, run the sequence from `config`'s group, and shut
    /// the browser down again.
    pub async fn run_sequence(&self, config: &mut RunConfig) -> Result<Vec<GroupStats>> {
        self.cache
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .cleanup_expired();

        let renderer = Arc::new(ChromiumRenderer::launch(&self.perf.browser).await?);
        let session = Arc::new(PageSession::new(
            self.perf.clone(),
            self.cache.clone(),
            self.progress.clone(),
        ));
        let checker = Arc::new(BatchScheduler::new(renderer.clone(), session));
        let acquisition = AcquisitionLoop::new(
            self.source.clone(),
            checker,
            self.sink.clone(),
            self.progress.clone(),
        );
        let sequence = DEFAULT_SEQUENCE.iter().map(|s| s.to_string()).collect();
        let sequencer = RunSequencer::new(self.table.clone(), sequence, acquisition, self.notifier.clone())
            .with_report_link(self.report_link.clone());

        info!("sink: {}", self.sink.describe());
        let mut ctx = RunContext::new();
        let result = sequencer.run(config, &mut ctx).await;
        if let Err(e) = renderer.shutdown().await {
            warn!("browser shutdown failed: {e:#}");
        }
        result
    }
}

/// Render progress events on a terminal spinner until the channel closes.
///
/// Returns `None` when stderr is not a terminal.
pub fn spawn_spinner(mut rx: ProgressReceiver) -> Option<JoinHandle<()>> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));

    Some(tokio::spawn(async move {
        let mut checked = 0usize;
        loop {
            match rx.recv().await {
                Ok(event) => match event.event {
                    ProgressEventKind::BatchStarted { group, batch, urls, .. } => {
                        pb.set_message(format!("{group} batch {batch}: checking {urls} URLs"));
                    }
                    ProgressEventKind::UrlChecked { .. } => {
                        checked += 1;
                        pb.set_message(format!("{checked} URLs checked"));
                    }
                    ProgressEventKind::BatchFinished { group, batch, accumulated, target, .. } => {
                        pb.set_message(format!("{group} batch {batch}: {accumulated}/{target}"));
                    }
                    ProgressEventKind::GroupFinished { group, actual, target, .. } => {
                        pb.println(format!("{group}: {actual}/{target}"));
                    }
                    ProgressEventKind::Warning { message } => pb.println(message),
                },
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        pb.finish_and_clear();
    }))
}
