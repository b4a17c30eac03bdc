use serde::{Deserialize, Serialize};

use crate::{Cdc, TableSchema, TableSpec};

pub const JOB_LOG_FILE: &str = "job.log";
pub const LAST_JOB_LOG_FILE: &str = "last_job.log";

/// The three files Capture writes per table: `T.table`, `T.schema`, `T.pk`.
/// Stage reads the same three back out of the extracted bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableManifest {
    pub table: TableSpec,
    pub schema: TableSchema,
    pub primary_key: Vec<String>,
}

impl TableManifest {
    pub fn has_usable_cdc(&self) -> bool {
        !matches!(self.table.cdc, Cdc::None) && !self.primary_key.is_empty()
    }
}

/// The shared stem used for a table's manifest and batch file names inside the work dir.
pub fn table_file_stem(table_name: &str) -> String {
    table_name.to_string()
}

/// Renders a batch file name: `T#0004.json` (1-based `batch_number`).
pub fn batch_file_name(table_name: &str, batch_number: u32) -> String {
    format!("{table_name}#{batch_number:04}.json")
}
