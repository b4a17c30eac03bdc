use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use udp_cloud::ObjectStore;
use udp_model::{bundle_name, capture_state_key, JobId, Namespace, LAST_JOB_LOG_FILE};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::CaptureError;

fn zip_files(paths: &[PathBuf]) -> Result<Bytes, CaptureError> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = ZipWriter::new(&mut buffer);
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for path in paths {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            writer.start_file(name, options)?;
            writer.write_all(&std::fs::read(path)?)?;
        }
        writer.finish()?;
    }
    Ok(Bytes::from(buffer.into_inner()))
}

fn sorted_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Ok(files)
}

/// Copies the prior run's `last_job.log` from `state_dir` into `work_dir`
/// so this job's bundle carries forward the previous job's stats, the way
/// Archive expects them when classifying `job.log` vs `last_job.log` rows.
/// A first run with no prior log is not an error.
pub fn carry_forward_last_job_log(state_dir: &Path, work_dir: &Path) -> std::io::Result<()> {
    let source = state_dir.join(LAST_JOB_LOG_FILE);
    if source.exists() {
        std::fs::copy(&source, work_dir.join(LAST_JOB_LOG_FILE))?;
    }
    Ok(())
}

/// Zips every file directly under `work_dir` into this job's bundle payload.
pub fn compress_work_folder(work_dir: &Path) -> Result<Bytes, CaptureError> {
    zip_files(&sorted_files(work_dir)?)
}

/// Zips `state_dir`'s persisted watermark and job log into the recovery
/// snapshot Archive restores from if the capture host is ever rebuilt.
pub fn compress_state_folder(state_dir: &Path) -> Result<Bytes, CaptureError> {
    zip_files(&sorted_files(state_dir)?)
}

/// Uploads the job bundle to `<namespace>/<namespace>#<job_id>.zip`. A no-op
/// under `--notransfer`, matching the original's dry-run flag.
pub async fn upload_bundle(
    object_store: &dyn ObjectStore,
    namespace: &Namespace,
    job_id: JobId,
    body: Bytes,
    notransfer: bool,
) -> Result<(), CaptureError> {
    if notransfer {
        return Ok(());
    }
    let key = bundle_name(namespace, job_id);
    object_store.put(&key, body).await?;
    Ok(())
}

/// Uploads the recovery snapshot to `<namespace>/capture_state.zip`.
pub async fn upload_recovery_state(
    object_store: &dyn ObjectStore,
    namespace: &Namespace,
    body: Bytes,
    notransfer: bool,
) -> Result<(), CaptureError> {
    if notransfer {
        return Ok(());
    }
    let key = capture_state_key(namespace);
    object_store.put(&key, body).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn compress_work_folder_zips_every_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("customer.table"), b"{}").unwrap();
        std::fs::write(dir.path().join("customer#0001.json"), b"[]").unwrap();

        let bytes = compress_work_folder(dir.path()).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        assert_eq!(archive.len(), 2);

        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["customer#0001.json", "customer.table"]);
    }

    #[test]
    fn carry_forward_copies_prior_last_job_log() {
        let state_dir = tempfile::tempdir().unwrap();
        let work_dir = tempfile::tempdir().unwrap();
        std::fs::write(state_dir.path().join(LAST_JOB_LOG_FILE), b"[]").unwrap();

        carry_forward_last_job_log(state_dir.path(), work_dir.path()).unwrap();

        let mut contents = String::new();
        std::fs::File::open(work_dir.path().join(LAST_JOB_LOG_FILE))
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "[]");
    }

    #[test]
    fn carry_forward_is_a_noop_on_first_run() {
        let state_dir = tempfile::tempdir().unwrap();
        let work_dir = tempfile::tempdir().unwrap();
        carry_forward_last_job_log(state_dir.path(), work_dir.path()).unwrap();
        assert!(!work_dir.path().join(LAST_JOB_LOG_FILE).exists());
    }
}
