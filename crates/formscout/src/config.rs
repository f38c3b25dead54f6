// Copyright 2026 Formscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Run configuration: URL groups, acquisition budgets, and performance tunables.
//!
//! The command line builds a [`RunConfig`] for the starting group; the run
//! sequencer mutates it in place as it moves from one group to the next.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Default upstream candidate-URL endpoint.
pub const DEFAULT_API_URL: &str =
    "http://testing-novabid-dsp.testing.svc.gzk8s.zhizh.com/api/admin/script/export/filter";

pub const DEFAULT_SCHEDULE_TIME: &str = "08:00";
pub const DEFAULT_CACHE_DATE_LEN: u32 = 2;
pub const DEFAULT_MIN_RESULTS: usize = 10;
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_MAX_BATCHES: usize = 5;
pub const DEFAULT_WRITE_RETRY: u32 = 3;
pub const DEFAULT_SHEET_NAME: &str = "TSTASK";
pub const DEFAULT_WORKSHEET_NAME: &str = "00";
pub const DEFAULT_CREDENTIALS_PATH: &str = "credentials.json";
pub const DEFAULT_LOG_FILE: &str = "log/app.log";

/// Order in which groups are processed by a full run.
pub const DEFAULT_SEQUENCE: [&str; 3] = ["00", "p0", "p1"];

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// One named URL group from the static table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEntry {
    /// Comma-separated filter string sent to the upstream API.
    pub urls: String,
    /// Number of qualifying URLs the group should reach.
    pub min_results: usize,
}

/// Static mapping from group name to filter string and target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupTable {
    groups: HashMap<String, GroupEntry>,
}

impl GroupTable {
    pub fn new(groups: HashMap<String, GroupEntry>) -> Self {
        Self { groups }
    }

    /// The built-in table.
    pub fn builtin() -> Self {
        let mut groups = HashMap::new();
        groups.insert(
            "00".to_string(),
            GroupEntry {
                urls: "good.realtimesinfo.com,bj1.puzzgo41.lol/?portal=1777,office.puzzlegamey.com,\
                       little.puzzlegamey.com,bj6.puzzgo41.lol/?portal=1809"
                    .to_string(),
                min_results: 90,
            },
        );
        groups.insert(
            "p0".to_string(),
            GroupEntry {
                urls: "edge.sassostyle.com,bj1.szgame1.lol/?portal=1964,bj17.puzzgo41.lol/?portal=1909,\
                       bj18.puzzgo41.lol/?portal=1910,bj2.puzzgo41.lol/?portal=1848,ate.dayheadlines.com,\
                       believe.puzzlegamey.com,ent.dayheadlines.com,hall.puzzlegamey.com,puzzle.pbfhp.com,\
                       nova.puzzlegamey.com,flynix.top,buzz.dayheadlines.com,date.dayheadlines.com,\
                       mdfp.ventoroa.com,pure.sassostyle.com,fancy.puzzlegamey.com,top.vwbvapxxx9l.com,\
                       trend.sassostyle.com,dave.puzzlegamey.com,glow.joysfull.com,go.pbfhp.com,\
                       hiap.ventoroa.com,voice.karationews.com,cosa.ventoroa.com,book.karationews.com,\
                       bj2.puzzgo12.lol/?portal=1804,hear.karationews.com,wine.karationews.com"
                    .to_string(),
                min_results: 90,
            },
        );
        groups.insert(
            "p1".to_string(),
            GroupEntry {
                urls: "bj3.puzzgo12.lol/?portal=1978,bj5.puzzgo12.lol/?portal=1980,dazzle.joysfull.com,\
                       fast.kwbvapxxx7w.com,hyntra.top,match.pbfhp.com,serene.joysfull.com,\
                       snap.kwbvapxxx7w.com,blue.weixiangltd.net,pfht.miranovaq.com,pink.wiuir.top,\
                       sdef.miranovaq.com,wen.realtimesinfo.com,white.fkiuz.top,goplay.pbfhp.co,\
                       strategy.pbfhp.com,light.dayheadlines.com,spot.dayheadlines.com,well.gamepean.top,\
                       good.gamepean.top,win.pcllwoscoddl.com,zen.sassostyle.com,add.joysfull.com,\
                       go.pcllwoscoddl.com,link.bdasdvsdadsx8w.com,easy.bdasdvsdadsx8w.com,\
                       mellow.joysfull.com,dream.pcllwoscoddl.com,bit.vwbvapxxx9l.com"
                    .to_string(),
                min_results: 60,
            },
        );
        Self { groups }
    }

    /// Load a table from a JSON object `{"name": {"urls": "...", "min_results": N}}`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read groups file: {}", path.display()))?;
        let table: GroupTable = serde_json::from_str(&raw)
            .with_context(|| format!("invalid groups file: {}", path.display()))?;
        Ok(table)
    }

    pub fn get(&self, name: &str) -> Option<&GroupEntry> {
        self.groups.get(name)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Budgets and write policy for one acquisition loop run.
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    /// Records requested per API page (`top_n`), also the `skip` stride.
    pub batch_size: usize,
    /// Hard ceiling on loop iterations.
    pub max_batches: usize,
    /// Optional ceiling on URLs dispatched for checking in one run.
    pub max_urls: Option<usize>,
    /// Lookback window in days for the API query.
    pub cache_date_len: u32,
    /// Persist every batch as it completes instead of once at the end.
    pub realtime_write: bool,
    /// Attempts per incremental write.
    pub write_retry: u32,
    /// Base of the exponential backoff between write attempts.
    pub retry_base: Duration,
    /// Pause between iterations.
    pub iteration_pause: Duration,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_batches: DEFAULT_MAX_BATCHES,
            max_urls: None,
            cache_date_len: DEFAULT_CACHE_DATE_LEN,
            realtime_write: true,
            write_retry: DEFAULT_WRITE_RETRY,
            retry_base: Duration::from_secs(2),
            iteration_pause: Duration::from_secs(1),
        }
    }
}

/// Mutable run configuration, pointed at the group currently being processed.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub group_name: String,
    pub url_filter: String,
    pub min_results: usize,
    /// Run only `group_name`; no sequence, no report.
    pub single_group: bool,
    pub acquisition: AcquisitionConfig,
}

impl RunConfig {
    /// Configuration for `group`, falling back to `fallback_min` when the
    /// table has no threshold for it.
    pub fn for_group(table: &GroupTable, group: &str, fallback_min: usize) -> Self {
        let mut config = Self {
            group_name: String::new(),
            url_filter: String::new(),
            min_results: fallback_min,
            single_group: false,
            acquisition: AcquisitionConfig::default(),
        };
        config.switch_group(table, group);
        config
    }

    /// Point the configuration at another group, keeping the previous
    /// target when the table has none for `group`.
    pub fn switch_group(&mut self, table: &GroupTable, group: &str) {
        self.group_name = group.to_string();
        match table.get(group) {
            Some(entry) => {
                self.url_filter = entry.urls.clone();
                self.min_results = entry.min_results;
            }
            None => self.url_filter.clear(),
        }
    }
}

/// Which fallback pass runs when the main page has no form.
#[derive(Debug, Clone)]
pub struct CheckStrategy {
    /// Skip the secondary pass entirely.
    pub check_main_page_only: bool,
    /// Query keyword links (true) or take the first links, contact-first (false).
    pub prioritize_contact_pages: bool,
    pub max_secondary_links: usize,
    pub contact_keywords: Vec<String>,
}

impl Default for CheckStrategy {
    fn default() -> Self {
        Self {
            check_main_page_only: false,
            prioritize_contact_pages: true,
            max_secondary_links: 2,
            contact_keywords: ["contact", "form", "inquiry", "get-quote", "request"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Identity and filtering applied to every browser context.
#[derive(Debug, Clone)]
pub struct BrowserProfile {
    pub headless: bool,
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Resource types aborted before they hit the network.
    pub blocked_resources: Vec<String>,
    /// Default per-operation timeout for page handles.
    pub page_timeout: Duration,
    pub launch_args: Vec<String>,
}

impl Default for BrowserProfile {
    fn default() -> Self {
        Self {
            headless: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            viewport_width: 1280,
            viewport_height: 720,
            blocked_resources: ["image", "stylesheet", "font", "media"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            page_timeout: Duration::from_millis(8000),
            launch_args: [
                "--disable-blink-features=AutomationControlled",
                "--disable-dev-shm-usage",
                "--no-sandbox",
                "--disable-setuid-sandbox",
                "--disable-gpu",
                "--disable-background-timer-throttling",
                "--disable-backgrounding-occluded-windows",
                "--disable-renderer-backgrounding",
                "--disable-features=TranslateUI",
                "--disable-ipc-flooding-protection",
                "--memory-pressure-off",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Timeouts, cache sizing, check strategy and browser identity.
#[derive(Debug, Clone)]
pub struct PerformanceConfig {
    /// Wait for the DOM-ready milestone before counting forms.
    pub page_load_wait: Duration,
    pub navigation_timeout: Duration,
    pub secondary_page_timeout: Duration,
    pub cache_expire: Duration,
    pub cache_max_size: usize,
    pub cache_cleanup_size: usize,
    pub strategy: CheckStrategy,
    pub browser: BrowserProfile,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            page_load_wait: Duration::from_millis(5000),
            navigation_timeout: Duration::from_millis(8000),
            secondary_page_timeout: Duration::from_millis(6000),
            cache_expire: Duration::from_secs(24 * 3600),
            cache_max_size: 1000,
            cache_cleanup_size: 500,
            strategy: CheckStrategy::default(),
            browser: BrowserProfile::default(),
        }
    }
}
