use std::sync::Arc;

use udp_cloud::ObjectStore;
use udp_model::bundle_name;
use udp_warehouse_db::WarehouseDb;

use crate::apply::{self, StageError};

/// One pass over the ready-bundle queue for a whole project: apply the
/// oldest bundle whose namespace is unblocked, advance that namespace's
/// stage queue, repeat until the warehouse reports nothing ready. Mirrors
/// `stage.py`'s daemon loop, minus the `stat_log` write Archive already did.
pub struct StageEngine {
    archive_store: Arc<dyn ObjectStore>,
    warehouse: Arc<dyn WarehouseDb>,
}

impl StageEngine {
    pub fn new(archive_store: Arc<dyn ObjectStore>, warehouse: Arc<dyn WarehouseDb>) -> Self {
        Self { archive_store, warehouse }
    }

    /// Applies at most one ready bundle. Returns `false` when the warehouse
    /// has nothing ready, so the caller's poll loop can sleep until the next
    /// scheduled tick.
    pub async fn dispatch_once(&self) -> Result<bool, StageError> {
        let Some((namespace, arrival)) = self.warehouse.next_ready_bundle().await? else {
            return Ok(false);
        };

        let key = format!("{namespace}/{}", arrival.archive_file_name);
        let body = self.archive_store.get(&key).await?;
        apply::apply_bundle(&body, &namespace, self.warehouse.as_ref()).await?;

        let next_basename = next_basename(&namespace, arrival.job_id + 1);
        self.warehouse
            .advance_stage_queue(&namespace, &arrival.archive_file_name, &next_basename)
            .await?;

        tracing::info!(namespace = %namespace, job_id = arrival.job_id, "staged bundle");
        Ok(true)
    }

    /// Drains every bundle ready right now, stopping at the first namespace
    /// that is blocked waiting on an earlier job.
    pub async fn drain_ready(&self) -> Result<usize, StageError> {
        let mut staged = 0;
        while self.dispatch_once().await? {
            staged += 1;
        }
        Ok(staged)
    }
}

/// The basename `stage_pending_queue` expects next for `namespace`, derived
/// the same way Archive derives a bundle's full object key.
fn next_basename(namespace: &str, job_id: udp_model::JobId) -> String {
    let full = bundle_name(&udp_model::Namespace::new(namespace), job_id);
    full.rsplit_once('/').map(|(_, basename)| basename.to_string()).unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;
    use udp_cloud::CloudError;
    use udp_model::{StageArrivalRow, StatRow, TableSchema};
    use udp_warehouse_db::WarehouseError;

    struct FakeStore {
        objects: Mutex<std::collections::HashMap<String, Bytes>>,
    }

    #[async_trait]
    impl ObjectStore for FakeStore {
        async fn put(&self, key: &str, body: Bytes) -> Result<(), CloudError> {
            self.objects.lock().unwrap().insert(key.to_string(), body);
            Ok(())
        }
        async fn get(&self, key: &str) -> Result<Bytes, CloudError> {
            self.objects.lock().unwrap().get(key).cloned().ok_or_else(|| CloudError::NotFound(key.to_string()))
        }
        async fn delete(&self, _key: &str) -> Result<(), CloudError> {
            Ok(())
        }
        async fn list(&self, _prefix: &str) -> Result<Vec<String>, CloudError> {
            Ok(vec![])
        }
    }

    struct FakeWarehouse {
        ready: Mutex<Option<(String, StageArrivalRow)>>,
        advanced: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl WarehouseDb for FakeWarehouse {
        async fn ensure_schema(&self, _schema: &str) -> Result<(), WarehouseError> {
            Ok(())
        }
        async fn table_exists(&self, _schema: &str, _table: &str) -> Result<bool, WarehouseError> {
            Ok(false)
        }
        async fn create_table(&self, _schema: &str, _table: &str, _source_schema: &TableSchema) -> Result<(), WarehouseError> {
            Ok(())
        }
        async fn drop_table(&self, _schema: &str, _table: &str) -> Result<(), WarehouseError> {
            Ok(())
        }
        async fn bulk_insert(&self, _schema: &str, _table: &str, _columns: &[String], _rows: &[Vec<serde_json::Value>]) -> Result<(), WarehouseError> {
            Ok(())
        }
        async fn execute_merge(&self, _sql: &str) -> Result<(), WarehouseError> {
            Ok(())
        }
        async fn insert_stat_rows(&self, _rows: &[StatRow]) -> Result<(), WarehouseError> {
            Ok(())
        }
        async fn insert_stage_arrival(&self, _namespace: &str, _row: &StageArrivalRow) -> Result<(), WarehouseError> {
            Ok(())
        }
        async fn next_ready_bundle(&self) -> Result<Option<(String, StageArrivalRow)>, WarehouseError> {
            Ok(self.ready.lock().unwrap().take())
        }
        async fn advance_stage_queue(&self, namespace: &str, completed: &str, next: &str) -> Result<(), WarehouseError> {
            self.advanced.lock().unwrap().push((namespace.to_string(), completed.to_string(), next.to_string()));
            Ok(())
        }
    }

    fn empty_bundle() -> Bytes {
        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            writer.finish().unwrap();
        }
        Bytes::from(buf.into_inner())
    }

    #[tokio::test]
    async fn dispatch_once_applies_and_advances_then_reports_empty() {
        let archive_store = Arc::new(FakeStore { objects: Mutex::new(std::collections::HashMap::new()) });
        archive_store
            .put("acme_customer/acme_customer#000000001.zip", empty_bundle())
            .await
            .unwrap();

        let warehouse = Arc::new(FakeWarehouse {
            ready: Mutex::new(Some((
                "acme_customer".to_string(),
                StageArrivalRow {
                    archive_file_name: "acme_customer#000000001.zip".to_string(),
                    job_id: 1,
                },
            ))),
            advanced: Mutex::new(Vec::new()),
        });

        let engine = StageEngine::new(archive_store, warehouse.clone());
        let staged = engine.drain_ready().await.unwrap();
        assert_eq!(staged, 1);

        let advanced = warehouse.advanced.lock().unwrap();
        assert_eq!(advanced.len(), 1);
        assert_eq!(advanced[0].0, "acme_customer");
        assert_eq!(advanced[0].1, "acme_customer#000000001.zip");
        assert_eq!(advanced[0].2, "acme_customer#000000002.zip");
    }

    #[test]
    fn next_basename_is_just_the_filename() {
        assert_eq!(next_basename("acme_customer", 2), "acme_customer#000000002.zip");
    }
}
