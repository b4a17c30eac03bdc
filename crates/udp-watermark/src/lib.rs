//! Durable per-namespace watermark (`JobHistory`) persistence.
//!
//! The on-disk format is an explicit, versioned frame rather than a
//! reflective pickle dump: `[magic: u32][version: u16][len: u64][JSON]`.
//! An unrecognized version is treated as fatal corruption and is never
//! silently migrated or truncated back to defaults.

use std::io::Write;
use std::path::{Path, PathBuf};

use udp_model::JobHistory;

const MAGIC: u32 = 0x5544_5031; // "UDP1"
const CURRENT_VERSION: u16 = 1;
const FILE_NAME: &str = "capture.job";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("watermark store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("watermark store at {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("watermark store at {path} has unsupported version {found} (expected {expected})")]
    UnsupportedVersion {
        path: PathBuf,
        found: u16,
        expected: u16,
    },
}

/// A namespace-scoped watermark store backed by a single file in `state_dir`.
pub struct Store {
    state_dir: PathBuf,
}

impl Store {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    fn file_path(&self) -> PathBuf {
        self.state_dir.join(FILE_NAME)
    }

    /// Loads the persisted `JobHistory`, or returns the default
    /// (`job_id = 1`, empty table map) if no store file exists yet.
    pub fn load(&self) -> Result<JobHistory, StoreError> {
        let path = self.file_path();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "initializing new watermark store");
            return Ok(JobHistory::default());
        }

        let bytes = std::fs::read(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        decode_frame(&path, &bytes)
    }

    /// Atomically persists `history` and increments its `job_id`. Write is
    /// write-temp-then-rename within `state_dir`, so no partial state is
    /// ever observable on crash.
    pub fn save(&self, history: &mut JobHistory) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.state_dir).map_err(|source| StoreError::Io {
            path: self.state_dir.clone(),
            source,
        })?;

        history.job_id += 1;

        let path = self.file_path();
        let frame = encode_frame(history);

        let mut tmp = tempfile::NamedTempFile::new_in(&self.state_dir).map_err(|source| StoreError::Io {
            path: self.state_dir.clone(),
            source,
        })?;
        tmp.write_all(&frame).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        tmp.flush().map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        tmp.persist(&path).map_err(|e| StoreError::Io {
            path: path.clone(),
            source: e.error,
        })?;

        tracing::debug!(path = %path.display(), job_id = history.job_id, "saved watermark store");
        Ok(())
    }
}

fn encode_frame(history: &JobHistory) -> Vec<u8> {
    let payload = serde_json::to_vec(history).expect("JobHistory is always serializable");
    let mut frame = Vec::with_capacity(4 + 2 + 8 + payload.len());
    frame.extend_from_slice(&MAGIC.to_le_bytes());
    frame.extend_from_slice(&CURRENT_VERSION.to_le_bytes());
    frame.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    frame.extend_from_slice(&payload);
    frame
}

fn decode_frame(path: &Path, bytes: &[u8]) -> Result<JobHistory, StoreError> {
    if bytes.len() < 14 {
        return Err(StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: format!("frame too short ({} bytes)", bytes.len()),
        });
    }

    let magic = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
    if magic != MAGIC {
        return Err(StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: format!("bad magic 0x{magic:08x}"),
        });
    }

    let version = u16::from_le_bytes(bytes[4..6].try_into().unwrap());
    if version != CURRENT_VERSION {
        return Err(StoreError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: version,
            expected: CURRENT_VERSION,
        });
    }

    let len = u64::from_le_bytes(bytes[6..14].try_into().unwrap()) as usize;
    let payload = bytes.get(14..14 + len).ok_or_else(|| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason: format!("declared length {len} exceeds frame size {}", bytes.len()),
    })?;

    serde_json::from_slice(payload).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let history = store.load().unwrap();
        assert_eq!(history.job_id, 1);
    }

    #[test]
    fn save_then_load_round_trips_and_increments_job_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let mut history = store.load().unwrap();
        history.get_table_history("customer").last_filehash = Some("abc".into());

        store.save(&mut history).unwrap();
        assert_eq!(history.job_id, 2);

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.job_id, 2);
        assert_eq!(
            reloaded.table_history("customer").unwrap().last_filehash.as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn corrupt_magic_is_fatal_and_not_silently_reset() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        std::fs::write(dir.path().join("capture.job"), b"not a frame at all").unwrap();
        let err = store.load().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn unsupported_version_is_rejected_not_migrated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.job");
        let mut bytes = MAGIC.to_le_bytes().to_vec();
        bytes.extend_from_slice(&99u16.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();

        let store = Store::new(dir.path());
        let err = store.load().unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedVersion { found: 99, .. }));
    }

    #[test]
    fn repeated_saves_increment_job_id_monotonically() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let mut history = store.load().unwrap();
        for expected in 2..=5 {
            store.save(&mut history).unwrap();
            assert_eq!(history.job_id, expected);
        }
    }
}
