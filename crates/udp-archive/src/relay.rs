use std::io::{Cursor, Read};

use udp_cloud::{CloudError, ObjectStore};
use udp_model::{parse_bundle_name, JobId, ObjectStoreNotification, StageArrivalRow, StatRow, JOB_LOG_FILE, LAST_JOB_LOG_FILE};
use udp_warehouse_db::{WarehouseDb, WarehouseError};

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Cloud(#[from] CloudError),
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("bundle key {0} does not encode a namespace/job_id")]
    UnrecognizedBundleName(String),
}

/// What happened to one drained notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// An empty key or the recovery-state snapshot; never archived.
    Ignored,
    Archived { namespace: String, job_id: JobId },
}

fn read_zip_entry(archive: &mut zip::ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<Option<Vec<StatRow>>, ArchiveError> {
    match archive.by_name(name) {
        Ok(mut entry) => {
            let mut buf = Vec::new();
            entry.read_to_end(&mut buf)?;
            Ok(Some(serde_json::from_slice(&buf)?))
        }
        Err(zip::result::ZipError::FileNotFound) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Relays one drained notification: copies the bundle from the capture
/// bucket to the archive bucket, extracts `job.log`/`last_job.log` into
/// `stat_log` rows (`job.log`'s own `capture` row is dropped since
/// `last_job.log` already carries the prior job's canonical one), registers
/// the bundle in `stage_arrival_queue`, and removes it from the capture
/// bucket. Mirrors `archive.py::archive_capture_file`.
pub async fn relay_notification(
    notification: &ObjectStoreNotification,
    capture_store: &dyn ObjectStore,
    archive_store: &dyn ObjectStore,
    warehouse: &dyn WarehouseDb,
) -> Result<RelayOutcome, ArchiveError> {
    if notification.object_key.is_empty() || notification.is_capture_state() {
        return Ok(RelayOutcome::Ignored);
    }

    let body = capture_store.get(&notification.object_key).await?;
    archive_store.put(&notification.object_key, body.clone()).await?;

    let mut archive = zip::ZipArchive::new(Cursor::new(body.as_ref()))?;
    let mut stat_rows: Vec<StatRow> = Vec::new();
    if let Some(rows) = read_zip_entry(&mut archive, JOB_LOG_FILE)? {
        stat_rows.extend(rows.into_iter().filter(|row| row.stat_name != "capture"));
    }
    if let Some(rows) = read_zip_entry(&mut archive, LAST_JOB_LOG_FILE)? {
        stat_rows.extend(
            rows.into_iter()
                .filter(|row| matches!(row.stat_name.as_str(), "capture" | "compress" | "upload")),
        );
    }
    warehouse.insert_stat_rows(&stat_rows).await?;

    let basename = notification.basename();
    let (namespace, job_id) =
        parse_bundle_name(basename).ok_or_else(|| ArchiveError::UnrecognizedBundleName(basename.to_string()))?;

    warehouse
        .insert_stage_arrival(
            namespace.as_str(),
            &StageArrivalRow {
                archive_file_name: basename.to_string(),
                job_id,
            },
        )
        .await?;

    capture_store.delete(&notification.object_key).await?;

    Ok(RelayOutcome::Archived {
        namespace: namespace.as_str().to_string(),
        job_id,
    })
}
