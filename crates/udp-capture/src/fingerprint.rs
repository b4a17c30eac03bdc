use std::path::Path;

use sha2::{Digest, Sha256};

/// Hashes the concatenated bytes of `files` (already sorted by caller into
/// batch order) into a single content fingerprint, used to suppress output
/// for non-CDC tables whose captured content hasn't changed since last run.
pub fn hash_files(files: &[std::path::PathBuf]) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    for path in files {
        hasher.update(std::fs::read(path)?);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn delete_files(files: &[std::path::PathBuf]) -> std::io::Result<()> {
    for path in files {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

/// Lists a table's batch files (`T#0001.json`, `T#0002.json`, ...) in a
/// `work_dir`, sorted so fingerprinting is deterministic across runs.
pub fn table_batch_files(work_dir: &Path, table_name: &str) -> std::io::Result<Vec<std::path::PathBuf>> {
    let prefix = format!("{table_name}#");
    let mut files: Vec<std::path::PathBuf> = std::fs::read_dir(work_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with(&prefix) && name.ends_with(".json"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_produces_identical_hash() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("lookup#0001.json");
        let b = dir.path().join("other#0001.json");
        std::fs::write(&a, b"[[1,\"x\"]]").unwrap();
        std::fs::write(&b, b"[[1,\"x\"]]").unwrap();
        assert_eq!(hash_files(&[a]).unwrap(), hash_files(&[b]).unwrap());
    }

    #[test]
    fn different_content_produces_different_hash() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        std::fs::write(&a, b"[[1]]").unwrap();
        std::fs::write(&b, b"[[2]]").unwrap();
        assert_ne!(hash_files(&[a]).unwrap(), hash_files(&[b]).unwrap());
    }

    #[test]
    fn table_batch_files_matches_only_that_table_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lookup#0002.json"), b"[]").unwrap();
        std::fs::write(dir.path().join("lookup#0001.json"), b"[]").unwrap();
        std::fs::write(dir.path().join("other#0001.json"), b"[]").unwrap();
        let files = table_batch_files(dir.path(), "lookup").unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("lookup#0001.json"));
        assert!(files[1].ends_with("lookup#0002.json"));
    }
}
