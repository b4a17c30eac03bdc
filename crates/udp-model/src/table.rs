use serde::{Deserialize, Serialize};

/// How new/changed rows are identified for a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Cdc {
    #[default]
    None,
    Timestamp,
    Rowversion,
}

impl Cdc {
    /// Parses a configured `cdc=` value case-insensitively, folding anything
    /// unrecognized to `None` (matching `capture.py`'s `table_object.cdc` cleanup).
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "timestamp" => Cdc::Timestamp,
            "rowversion" => Cdc::Rowversion,
            _ => Cdc::None,
        }
    }
}

/// Declarative, static-per-run table configuration sourced from a
/// `.tables` file section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSpec {
    pub schema_name: String,
    pub table_name: String,
    pub cdc: Cdc,
    /// Timestamp column expression(s); more than one means "max of these columns".
    pub timestamp: Vec<String>,
    pub primary_key: Vec<String>,
    /// Initial watermark for a table with no prior history; defaults to `1900-01-01`.
    pub first_timestamp: Option<String>,
    /// Case-insensitive glob patterns of columns to drop from the captured schema.
    pub ignore_columns: Vec<String>,
    pub ignore_table: bool,
    pub drop_table: bool,
    /// Extra SQL join text, normalized by `udp_cdc::join`.
    pub join: String,
    /// Extra SQL predicate, ANDed with the CDC timestamp predicate.
    pub where_clause: String,
    pub order: Vec<String>,
    pub table_type: Option<String>,
}

impl TableSpec {
    pub fn new(schema_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            table_name: table_name.into(),
            cdc: Cdc::None,
            timestamp: Vec::new(),
            primary_key: Vec::new(),
            first_timestamp: None,
            ignore_columns: Vec::new(),
            ignore_table: false,
            drop_table: false,
            join: String::new(),
            where_clause: String::new(),
            order: Vec::new(),
            table_type: None,
        }
    }

    pub fn first_timestamp_or_default(&self) -> &str {
        self.first_timestamp.as_deref().unwrap_or("1900-01-01")
    }
}
