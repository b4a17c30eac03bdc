use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Utc};
use udp_cloud::ObjectStore;
use udp_model::{Namespace, Stats, TableSpec, JOB_LOG_FILE, LAST_JOB_LOG_FILE};
use udp_source_db::SourceDb;
use udp_watermark::Store;

use crate::{bundle, extract, window, CaptureError};

/// Ties the watermark store, source database, and object store together
/// into one capture job, mirroring `capture.py::main`'s sequencing: connect,
/// compute the window, extract every table, compress, upload, persist.
pub struct CaptureEngine {
    script_name: String,
    namespace: Namespace,
    source_db: Arc<dyn SourceDb>,
    object_store: Arc<dyn ObjectStore>,
    watermark: Store,
    state_dir: PathBuf,
    batch_size: usize,
    notransfer: bool,
    fast_forward_increment: Option<Duration>,
}

impl CaptureEngine {
    pub fn new(
        script_name: impl Into<String>,
        namespace: Namespace,
        source_db: Arc<dyn SourceDb>,
        object_store: Arc<dyn ObjectStore>,
        state_dir: PathBuf,
        batch_size: usize,
        notransfer: bool,
        fast_forward_increment: Option<Duration>,
    ) -> Self {
        Self {
            script_name: script_name.into(),
            watermark: Store::new(state_dir.clone()),
            namespace,
            source_db,
            object_store,
            state_dir,
            batch_size,
            notransfer,
            fast_forward_increment,
        }
    }

    /// Runs exactly one capture job against `tables` and advances the
    /// watermark only once the bundle has been durably uploaded.
    pub async fn run_job(&self, tables: &[TableSpec]) -> Result<(), CaptureError> {
        let mut history = self.watermark.load()?;
        let job_id = history.job_id;
        let work_dir = tempfile::tempdir()?;

        let mut stats = Stats::new(self.script_name.clone(), &self.namespace, job_id, None);
        stats.start("capture", "job", Utc::now());

        bundle::carry_forward_last_job_log(&self.state_dir, work_dir.path())?;

        let db_now = self.source_db.current_timestamp().await?;
        let windowed = window::current_timestamp(db_now);
        let reference = history.fast_forward_timestamp.unwrap_or(windowed);
        let current_timestamp = window::apply_fast_forward(windowed, reference, self.fast_forward_increment);
        if self.fast_forward_increment.is_some() {
            history.fast_forward_timestamp = Some(current_timestamp);
        }

        let mut total_rows: i64 = 0;
        let mut total_bytes: i64 = 0;
        for table in tables {
            stats.start(&table.table_name, "table", Utc::now());
            let outcome = extract::process_table(
                work_dir.path(),
                table,
                self.source_db.as_ref(),
                &mut history,
                job_id,
                current_timestamp,
                self.batch_size,
            )
            .await?;

            let (rows, bytes) = match &outcome {
                extract::ExtractOutcome::Extracted { row_count, byte_size, .. } => (*row_count as i64, *byte_size as i64),
                _ => (0, 0),
            };
            total_rows += rows;
            total_bytes += bytes;
            stats.stop(&table.table_name, rows, bytes, Utc::now());
            tracing::info!(
                namespace = %self.namespace,
                table = %table.table_name,
                outcome = ?outcome,
                "processed table"
            );
        }
        stats.stop("capture", total_rows, total_bytes, Utc::now());
        stats.save(&work_dir.path().join(JOB_LOG_FILE))?;

        stats.start("compress", "job", Utc::now());
        let bundle_bytes = bundle::compress_work_folder(work_dir.path())?;
        stats.stop("compress", 0, bundle_bytes.len() as i64, Utc::now());

        stats.start("upload", "job", Utc::now());
        bundle::upload_bundle(self.object_store.as_ref(), &self.namespace, job_id, bundle_bytes, self.notransfer).await?;
        stats.stop("upload", 0, 0, Utc::now());

        std::fs::create_dir_all(&self.state_dir)?;
        stats.save(&self.state_dir.join(LAST_JOB_LOG_FILE))?;

        self.watermark.save(&mut history)?;

        let recovery_bytes = bundle::compress_state_folder(&self.state_dir)?;
        bundle::upload_recovery_state(self.object_store.as_ref(), &self.namespace, recovery_bytes, self.notransfer).await?;

        tracing::info!(namespace = %self.namespace, job_id, rows = total_rows, "capture job complete");
        Ok(())
    }
}
