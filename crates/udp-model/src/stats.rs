use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{job::JobId, Namespace};

/// A flattened metrics row, the shape written to `job.log`/`last_job.log`
/// and (by Archive) merged into the warehouse's `stat_log` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatRow {
    pub script_name: String,
    pub script_version: String,
    pub script_instance: Option<String>,
    pub server_name: String,
    pub account_name: String,
    pub namespace: String,
    pub job_id: JobId,
    pub stat_name: String,
    pub stat_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub run_time: f64,
    pub row_count: i64,
    pub data_size: i64,
}

/// Workspace crate version, standing in for the original's script-file-mtime-derived version string.
const SCRIPT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Best-effort host/account identification, mirroring `socket.gethostname()`/
/// `os.getlogin()` in the original without pulling in a platform-specific crate.
fn current_server_name() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

fn current_account_name() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// A single named, timed metric: one job-level step (`capture`, `compress`,
/// `upload`) or one per-table extraction.
#[derive(Debug, Clone)]
pub struct Stat {
    stat_name: String,
    stat_type: String,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    row_count: i64,
    data_size: i64,
}

impl Stat {
    fn new(stat_name: impl Into<String>, stat_type: impl Into<String>) -> Self {
        Self {
            stat_name: stat_name.into(),
            stat_type: stat_type.into(),
            start_time: None,
            end_time: None,
            row_count: 0,
            data_size: 0,
        }
    }

    fn start(&mut self, now: DateTime<Utc>) {
        self.start_time = Some(now);
    }

    fn stop(&mut self, now: DateTime<Utc>, row_count: i64, data_size: i64) {
        self.end_time = Some(now);
        self.row_count = row_count;
        self.data_size = data_size;
    }

    fn run_time(&self) -> f64 {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => (end - start).num_milliseconds() as f64 / 1000.0,
            _ => 0.0,
        }
    }
}

/// A job's collection of named stats, tagged with the identifying columns
/// carried onto every emitted row.
#[derive(Debug, Clone)]
pub struct Stats {
    script_name: String,
    script_instance: Option<String>,
    server_name: String,
    account_name: String,
    namespace: String,
    job_id: JobId,
    stats: BTreeMap<String, Stat>,
}

impl Stats {
    pub fn new(
        script_name: impl Into<String>,
        namespace: &Namespace,
        job_id: JobId,
        script_instance: Option<String>,
    ) -> Self {
        Self {
            script_name: script_name.into(),
            script_instance,
            server_name: current_server_name(),
            account_name: current_account_name(),
            namespace: namespace.as_str().to_string(),
            job_id,
            stats: BTreeMap::new(),
        }
    }

    pub fn start(&mut self, stat_name: impl Into<String>, stat_type: impl Into<String>, now: DateTime<Utc>) {
        let stat_name = stat_name.into();
        let mut stat = Stat::new(stat_name.clone(), stat_type);
        stat.start(now);
        self.stats.insert(stat_name, stat);
    }

    pub fn stop(&mut self, stat_name: &str, row_count: i64, data_size: i64, now: DateTime<Utc>) {
        if let Some(stat) = self.stats.get_mut(stat_name) {
            stat.stop(now, row_count, data_size);
        }
    }

    pub fn rows(&self) -> Vec<StatRow> {
        self.stats
            .values()
            .map(|stat| StatRow {
                script_name: self.script_name.clone(),
                script_version: SCRIPT_VERSION.to_string(),
                script_instance: self.script_instance.clone(),
                server_name: self.server_name.clone(),
                account_name: self.account_name.clone(),
                namespace: self.namespace.clone(),
                job_id: self.job_id,
                stat_name: stat.stat_name.clone(),
                stat_type: stat.stat_type.clone(),
                start_time: stat.start_time.unwrap_or_default(),
                end_time: stat.end_time.unwrap_or_default(),
                run_time: stat.run_time(),
                row_count: stat.row_count,
                data_size: stat.data_size,
            })
            .collect()
    }

    /// Writes this job's stat rows as a JSON array to `path` (`job.log` /
    /// `last_job.log`/`state_dir/last_job.log`).
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let rows = self.rows();
        let json = serde_json::to_vec_pretty(&rows).expect("StatRow is always serializable");
        std::fs::write(path, json)
    }

    pub fn load(path: &Path) -> std::io::Result<Vec<StatRow>> {
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(std::io::Error::from)
    }
}
