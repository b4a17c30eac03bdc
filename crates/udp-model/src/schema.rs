use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Discovered column metadata, as returned by an information-schema-equivalent query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub column_name: String,
    /// Source dialect's lower-cased type name, e.g. `character varying`, `jsonb`.
    pub data_type: String,
    pub is_nullable: bool,
    pub character_maximum_length: Option<i64>,
    pub numeric_precision: Option<i64>,
    pub numeric_scale: Option<i64>,
    pub datetime_precision: Option<i64>,
}

impl Column {
    pub fn new(column_name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            character_maximum_length: None,
            numeric_precision: None,
            numeric_scale: None,
            datetime_precision: None,
        }
    }
}

/// Ordered column metadata for one table. Order matters: it is the order
/// batch row arrays are positioned in, and the order columns are rendered
/// into generated DDL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: IndexMap<String, Column>,
}

impl TableSchema {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    /// Removes any column whose name matches (case-insensitively) one of the
    /// glob-style `patterns` (e.g. `*_pwd`, `secret*`).
    pub fn remove_ignored_columns(&mut self, patterns: &[String]) -> Vec<String> {
        if patterns.is_empty() {
            return Vec::new();
        }
        let compiled: Vec<glob::Pattern> = patterns
            .iter()
            .filter_map(|p| glob::Pattern::new(&p.to_lowercase()).ok())
            .collect();

        let removed: Vec<String> = self
            .columns
            .keys()
            .filter(|name| {
                let lower = name.to_lowercase();
                compiled.iter().any(|pattern| pattern.matches(&lower))
            })
            .cloned()
            .collect();

        for name in &removed {
            self.columns.shift_remove(name);
        }
        removed
    }
}
