use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::JobId;

/// Per-`(namespace, table_name)` CDC watermark state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableHistory {
    /// Inclusive upper bound of the last successful CDC window.
    pub last_timestamp: Option<DateTime<Utc>>,
    /// Monotonic counterpart for row-version CDC, when configured.
    pub last_rowversion: Option<String>,
    /// Content digest over produced batch files, for tables with no CDC key.
    pub last_filehash: Option<String>,
}

/// Per-namespace job counter plus per-table watermark map. Persisted
/// atomically by `udp_watermark::Store::save` at the end of each successful
/// capture job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobHistory {
    pub job_id: JobId,
    /// Accelerated catch-up watermark; see `TableSpec`/project
    /// `fast_forward_increment`. Unset (the common case) means current
    /// timestamp is always taken verbatim from the source database.
    pub fast_forward_timestamp: Option<DateTime<Utc>>,
    tables: BTreeMap<String, TableHistory>,
}

impl Default for JobHistory {
    fn default() -> Self {
        Self {
            job_id: 1,
            fast_forward_timestamp: None,
            tables: BTreeMap::new(),
        }
    }
}

impl JobHistory {
    /// Returns the existing history for `table_name` (case-insensitive), or
    /// creates and inserts an empty one on first access.
    pub fn get_table_history(&mut self, table_name: &str) -> &mut TableHistory {
        self.tables
            .entry(table_name.to_ascii_lowercase())
            .or_default()
    }

    pub fn table_history(&self, table_name: &str) -> Option<&TableHistory> {
        self.tables.get(&table_name.to_ascii_lowercase())
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &TableHistory)> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v))
    }
}
