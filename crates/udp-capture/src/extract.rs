use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use futures::StreamExt;
use serde_json::Value;
use udp_model::{batch_file_name, JobHistory, JobId, TableSchema, TableSpec};
use udp_source_db::SourceDb;

use crate::CaptureError;

/// What happened when a table was considered for this job's window. Every
/// variant other than `Extracted` leaves the table's watermark untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// `ignore_table` is set; nothing is written for this table at all.
    Ignored,
    /// `drop_table` is set; only the manifest is written so Stage can act on it.
    DropOnly,
    /// The table's watermark is already past this job's window; try again next job.
    FutureWatermark,
    /// A no-CDC table whose content fingerprint matches the prior run; batch
    /// files were written, hashed, and discarded rather than uploaded twice.
    FingerprintUnchanged,
    Extracted { row_count: u64, byte_size: u64, batch_count: u32 },
}

fn parse_first_timestamp(raw: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(1900, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap().and_utc())
}

fn write_manifest(work_dir: &Path, table: &TableSpec, schema: &TableSchema, primary_key: &[String]) -> Result<(), CaptureError> {
    std::fs::write(work_dir.join(format!("{}.table", table.table_name)), serde_json::to_vec_pretty(table)?)?;
    std::fs::write(work_dir.join(format!("{}.schema", table.table_name)), serde_json::to_vec_pretty(schema)?)?;
    std::fs::write(work_dir.join(format!("{}.pk", table.table_name)), serde_json::to_vec_pretty(primary_key)?)?;
    Ok(())
}

/// Extracts one table's CDC window into `work_dir`, mirroring
/// `capture.py`'s `process_table`: short-circuit on `ignore_table`/
/// `drop_table`, initialize the watermark from `first_timestamp` on first
/// run, skip a table whose watermark is already ahead of this job's window,
/// discover schema/primary key (downgrading to no-CDC when no key can be
/// found), render and stream the CDC select in `batch_size`-row batches,
/// and suppress output for unchanged no-CDC tables via a content fingerprint.
pub async fn process_table(
    work_dir: &Path,
    table: &TableSpec,
    source_db: &dyn SourceDb,
    history: &mut JobHistory,
    job_id: JobId,
    current_timestamp: DateTime<Utc>,
    batch_size: usize,
) -> Result<ExtractOutcome, CaptureError> {
    if table.ignore_table {
        return Ok(ExtractOutcome::Ignored);
    }
    if table.drop_table {
        write_manifest(work_dir, table, &TableSchema::default(), &[])?;
        return Ok(ExtractOutcome::DropOnly);
    }

    let table_history = history.get_table_history(&table.table_name);
    let last_timestamp = table_history
        .last_timestamp
        .unwrap_or_else(|| parse_first_timestamp(table.first_timestamp_or_default()));

    if last_timestamp > current_timestamp {
        return Ok(ExtractOutcome::FutureWatermark);
    }

    let mut schema = source_db.discover_schema(&table.schema_name, &table.table_name).await?;
    schema.remove_ignored_columns(&table.ignore_columns);

    let mut effective = table.clone();
    let mut primary_key = if !table.primary_key.is_empty() {
        table.primary_key.clone()
    } else {
        source_db.discover_primary_key(&table.schema_name, &table.table_name).await?
    };
    if primary_key.is_empty() {
        effective.cdc = udp_model::Cdc::None;
        effective.timestamp.clear();
    }

    write_manifest(work_dir, &effective, &schema, &primary_key)?;

    let column_names = schema.column_names();
    let sql = udp_cdc::render_select(&effective, &column_names, job_id, current_timestamp, last_timestamp)?;

    let timestamp_value = current_timestamp.format("%Y-%m-%d %H:%M:%S%.f").to_string();
    let mut stream = source_db.stream_rows(&sql);
    let mut batches: Vec<std::path::PathBuf> = Vec::new();
    let mut current_batch: Vec<Vec<Value>> = Vec::with_capacity(batch_size.min(8192));
    let mut batch_number: u32 = 0;
    let mut row_count: u64 = 0;
    let mut byte_size: u64 = 0;

    while let Some(row) = stream.next().await {
        let row = row?;
        let mut values: Vec<Value> = column_names
            .iter()
            .map(|name| row.get(name).cloned().unwrap_or(Value::Null))
            .collect();
        values.push(Value::from(job_id));
        values.push(Value::String(timestamp_value.clone()));
        current_batch.push(values);
        row_count += 1;

        if current_batch.len() >= batch_size {
            batch_number += 1;
            let path = flush_batch(work_dir, &table.table_name, batch_number, &current_batch, &mut byte_size)?;
            batches.push(path);
            current_batch.clear();
        }
    }
    if !current_batch.is_empty() {
        batch_number += 1;
        let path = flush_batch(work_dir, &table.table_name, batch_number, &current_batch, &mut byte_size)?;
        batches.push(path);
    }

    let fingerprint_mode = matches!(effective.cdc, udp_model::Cdc::None) && !effective.order.is_empty();
    if fingerprint_mode {
        let fingerprint = crate::fingerprint::hash_files(&batches)?;
        let table_history = history.get_table_history(&table.table_name);
        if table_history.last_filehash.as_deref() == Some(fingerprint.as_str()) {
            crate::fingerprint::delete_files(&batches)?;
            table_history.last_timestamp = Some(current_timestamp);
            return Ok(ExtractOutcome::FingerprintUnchanged);
        }
        table_history.last_filehash = Some(fingerprint);
    }

    let table_history = history.get_table_history(&table.table_name);
    table_history.last_timestamp = Some(current_timestamp);

    Ok(ExtractOutcome::Extracted {
        row_count,
        byte_size,
        batch_count: batch_number,
    })
}

fn flush_batch(
    work_dir: &Path,
    table_name: &str,
    batch_number: u32,
    rows: &[Vec<Value>],
    byte_size: &mut u64,
) -> Result<std::path::PathBuf, CaptureError> {
    let path = work_dir.join(batch_file_name(table_name, batch_number));
    let bytes = serde_json::to_vec(rows)?;
    *byte_size += bytes.len() as u64;
    std::fs::write(&path, bytes)?;
    Ok(path)
}
