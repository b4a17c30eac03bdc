use std::io::{Cursor, Read};

use serde_json::Value;
use udp_cdc::render_merge;
use udp_model::{Cdc, TableSchema, TableSpec};
use udp_warehouse_db::{convert_row, target_column_names, translate_type, WarehouseDb, WarehouseError, EXTENDED_COLUMNS};

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
    #[error(transparent)]
    Render(#[from] udp_cdc::RenderError),
}

fn read_entry(archive: &mut zip::ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<Option<Vec<u8>>, StageError> {
    match archive.by_name(name) {
        Ok(mut entry) => {
            let mut buf = Vec::new();
            entry.read_to_end(&mut buf)?;
            Ok(Some(buf))
        }
        Err(zip::result::ZipError::FileNotFound) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// The table names this bundle carries manifests for, derived from its
/// `*.table` entries.
fn table_names(archive: &zip::ZipArchive<Cursor<&[u8]>>) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter_map(|name| name.strip_suffix(".table").map(|stem| stem.to_string()))
        .collect();
    names.sort();
    names
}

fn batch_files(archive: &zip::ZipArchive<Cursor<&[u8]>>, table_name: &str) -> Vec<String> {
    let prefix = format!("{table_name}#");
    let mut files: Vec<String> = archive
        .file_names()
        .filter(|name| name.starts_with(&prefix) && name.ends_with(".json"))
        .map(|name| name.to_string())
        .collect();
    files.sort();
    files
}

/// Applies one extracted table's manifest and batches against the
/// warehouse, mirroring `stage.py::stage_file`'s per-table loop. A bundle
/// with a malformed manifest (missing `.schema`/`.pk`) skips just that
/// table rather than failing the whole bundle, per the error-handling
/// contract for malformed bundles.
async fn apply_table(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
    schema_name: &str,
    table_name: &str,
    warehouse: &dyn WarehouseDb,
) -> Result<(), StageError> {
    let Some(table_bytes) = read_entry(archive, &format!("{table_name}.table"))? else {
        tracing::warn!(table = table_name, "missing .table manifest entry, skipping table");
        return Ok(());
    };
    let table: TableSpec = serde_json::from_slice(&table_bytes)?;

    if table.drop_table {
        warehouse.drop_table(schema_name, table_name).await?;
        return Ok(());
    }

    let Some(schema_bytes) = read_entry(archive, &format!("{table_name}.schema"))? else {
        tracing::warn!(table = table_name, "missing .schema manifest entry, skipping table");
        return Ok(());
    };
    let schema: TableSchema = serde_json::from_slice(&schema_bytes)?;

    let Some(pk_bytes) = read_entry(archive, &format!("{table_name}.pk"))? else {
        tracing::warn!(table = table_name, "missing .pk manifest entry, skipping table");
        return Ok(());
    };
    let primary_key: Vec<String> = serde_json::from_slice(&pk_bytes)?;

    let target_types: Vec<String> = schema
        .columns
        .values()
        .map(translate_type)
        .chain(EXTENDED_COLUMNS.iter().map(|(_, data_type)| data_type.to_string()))
        .collect();
    let column_names = target_column_names(&schema);

    let mut batches: Vec<Vec<Vec<Value>>> = Vec::new();
    for name in batch_files(archive, table_name) {
        let bytes = read_entry(archive, &name)?.unwrap_or_default();
        let mut rows: Vec<Vec<Value>> = serde_json::from_slice(&bytes)?;
        for row in &mut rows {
            convert_row(row, &target_types);
        }
        batches.push(rows);
    }

    let has_usable_cdc = !matches!(table.cdc, Cdc::None) && !primary_key.is_empty();

    if !has_usable_cdc {
        warehouse.drop_table(schema_name, table_name).await?;
        warehouse.create_table(schema_name, table_name, &schema).await?;
        for rows in &batches {
            warehouse.bulk_insert(schema_name, table_name, &column_names, rows).await?;
        }
        return Ok(());
    }

    if !warehouse.table_exists(schema_name, table_name).await? {
        warehouse.create_table(schema_name, table_name, &schema).await?;
    }

    let temp_table = format!("_{table_name}");
    warehouse.drop_table(schema_name, &temp_table).await?;
    warehouse.create_table(schema_name, &temp_table, &schema).await?;
    for rows in &batches {
        warehouse.bulk_insert(schema_name, &temp_table, &column_names, rows).await?;
    }

    let merge_sql = render_merge(schema_name, table_name, &temp_table, &primary_key, &column_names)?;
    warehouse.execute_merge(&merge_sql).await?;
    warehouse.drop_table(schema_name, &temp_table).await?;

    Ok(())
}

/// Applies an entire extracted bundle against `schema_name`: ensures the
/// schema exists, then applies every table manifest the bundle carries.
/// Mirrors `stage.py::stage_file`.
pub async fn apply_bundle(bundle_bytes: &[u8], schema_name: &str, warehouse: &dyn WarehouseDb) -> Result<(), StageError> {
    warehouse.ensure_schema(schema_name).await?;

    let mut archive = zip::ZipArchive::new(Cursor::new(bundle_bytes))?;
    for table_name in table_names(&archive) {
        apply_table(&mut archive, schema_name, &table_name, warehouse).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::io::Write;
    use std::sync::Mutex;
    use udp_model::Column;
    use zip::write::SimpleFileOptions;

    #[derive(Default)]
    struct RecordingWarehouse {
        created: Mutex<Vec<String>>,
        dropped: Mutex<Vec<String>>,
        inserted: Mutex<Vec<(String, Vec<Vec<Value>>)>>,
        merges: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl WarehouseDb for RecordingWarehouse {
        async fn ensure_schema(&self, _schema: &str) -> Result<(), WarehouseError> {
            Ok(())
        }
        async fn table_exists(&self, _schema: &str, _table: &str) -> Result<bool, WarehouseError> {
            Ok(false)
        }
        async fn create_table(&self, _schema: &str, table: &str, _source_schema: &TableSchema) -> Result<(), WarehouseError> {
            self.created.lock().unwrap().push(table.to_string());
            Ok(())
        }
        async fn drop_table(&self, _schema: &str, table: &str) -> Result<(), WarehouseError> {
            self.dropped.lock().unwrap().push(table.to_string());
            Ok(())
        }
        async fn bulk_insert(&self, _schema: &str, table: &str, _columns: &[String], rows: &[Vec<Value>]) -> Result<(), WarehouseError> {
            self.inserted.lock().unwrap().push((table.to_string(), rows.to_vec()));
            Ok(())
        }
        async fn execute_merge(&self, sql: &str) -> Result<(), WarehouseError> {
            self.merges.lock().unwrap().push(sql.to_string());
            Ok(())
        }
        async fn insert_stat_rows(&self, _rows: &[udp_model::StatRow]) -> Result<(), WarehouseError> {
            Ok(())
        }
        async fn insert_stage_arrival(&self, _namespace: &str, _row: &udp_model::StageArrivalRow) -> Result<(), WarehouseError> {
            Ok(())
        }
        async fn next_ready_bundle(&self) -> Result<Option<(String, udp_model::StageArrivalRow)>, WarehouseError> {
            Ok(None)
        }
        async fn advance_stage_queue(&self, _namespace: &str, _completed: &str, _next: &str) -> Result<(), WarehouseError> {
            Ok(())
        }
    }

    fn build_bundle(table: &TableSpec, schema: &TableSchema, primary_key: &[String], batches: &[Vec<Vec<Value>>]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            let options = SimpleFileOptions::default();
            writer.start_file(format!("{}.table", table.table_name), options).unwrap();
            writer.write_all(&serde_json::to_vec(table).unwrap()).unwrap();
            writer.start_file(format!("{}.schema", table.table_name), options).unwrap();
            writer.write_all(&serde_json::to_vec(schema).unwrap()).unwrap();
            writer.start_file(format!("{}.pk", table.table_name), options).unwrap();
            writer.write_all(&serde_json::to_vec(primary_key).unwrap()).unwrap();
            for (i, batch) in batches.iter().enumerate() {
                writer.start_file(format!("{}#{:04}.json", table.table_name, i + 1), options).unwrap();
                writer.write_all(&serde_json::to_vec(batch).unwrap()).unwrap();
            }
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[tokio::test]
    async fn cdc_table_stages_through_temp_table_and_merge() {
        let mut table = TableSpec::new("public", "customer");
        table.cdc = Cdc::Timestamp;
        let mut schema = TableSchema::default();
        schema.columns.insert("id".into(), Column::new("id", "integer"));
        schema.columns.insert("name".into(), Column::new("name", "character varying"));

        let batch = vec![vec![json!(1), json!("a"), json!(1), json!("2024-01-02T12:00:30")]];
        let bundle = build_bundle(&table, &schema, &["id".to_string()], &[batch]);

        let warehouse = RecordingWarehouse::default();
        apply_bundle(&bundle, "acme_customer", &warehouse).await.unwrap();

        assert_eq!(*warehouse.created.lock().unwrap(), vec!["customer", "_customer"]);
        assert_eq!(*warehouse.dropped.lock().unwrap(), vec!["_customer", "_customer"]);
        assert_eq!(warehouse.inserted.lock().unwrap().len(), 1);
        assert_eq!(warehouse.inserted.lock().unwrap()[0].0, "_customer");
        assert_eq!(warehouse.merges.lock().unwrap().len(), 1);
        assert!(warehouse.merges.lock().unwrap()[0].contains("merge \"acme_customer\".\"customer\""));
    }

    #[tokio::test]
    async fn no_cdc_table_does_a_full_refresh() {
        let table = TableSpec::new("public", "lookup");
        let mut schema = TableSchema::default();
        schema.columns.insert("code".into(), Column::new("code", "character varying"));

        let batch = vec![vec![json!("A"), json!(1), json!("2024-01-02T12:00:30")]];
        let bundle = build_bundle(&table, &schema, &[], &[batch]);

        let warehouse = RecordingWarehouse::default();
        apply_bundle(&bundle, "acme_lookup", &warehouse).await.unwrap();

        assert_eq!(*warehouse.dropped.lock().unwrap(), vec!["lookup"]);
        assert_eq!(*warehouse.created.lock().unwrap(), vec!["lookup"]);
        assert!(warehouse.merges.lock().unwrap().is_empty());
        assert_eq!(warehouse.inserted.lock().unwrap()[0].0, "lookup");
    }

    #[tokio::test]
    async fn drop_table_only_drops_and_skips_the_rest() {
        let mut table = TableSpec::new("public", "retired");
        table.drop_table = true;
        let schema = TableSchema::default();
        let bundle = build_bundle(&table, &schema, &[], &[]);

        let warehouse = RecordingWarehouse::default();
        apply_bundle(&bundle, "acme_retired", &warehouse).await.unwrap();

        assert_eq!(*warehouse.dropped.lock().unwrap(), vec!["retired"]);
        assert!(warehouse.created.lock().unwrap().is_empty());
    }
}
