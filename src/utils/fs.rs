//! File helpers shared by the snapshot store and the tile cache.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write bytes atomically (write to a sibling temp file, then rename).
///
/// Readers see either the previous content or the new content, never a
/// partial file. Temp names are unique per call so concurrent writers to the
/// same path do not share a temp file.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::Io(std::io::Error::other(format!("invalid path {path:?}"))))?;
    let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp = path.with_file_name(format!(".{file_name}.{}.{seq}.tmp", std::process::id()));

    let result = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(AppError::Io(e));
    }
    Ok(())
}

/// Serialize `value` as JSON and write it atomically.
pub async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    write_atomic(path, &bytes).await
}

/// Read bytes, returning None if the file doesn't exist.
pub async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

/// Read JSON, returning None if the file doesn't exist.
pub async fn read_json_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match read_optional(path).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/test.txt");

        write_atomic(&path, b"hello").await.unwrap();
        assert_eq!(read_optional(&path).await.unwrap(), Some(b"hello".to_vec()));

        write_atomic(&path, b"world").await.unwrap();
        assert_eq!(read_optional(&path).await.unwrap(), Some(b"world".to_vec()));
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("live.json");
        write_json_atomic(&path, &vec!["a", "b"]).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["live.json"]);
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let data = read_optional(&tmp.path().join("nope.txt")).await.unwrap();
        assert!(data.is_none());
        let json: Option<Vec<String>> =
            read_json_optional(&tmp.path().join("nope.json")).await.unwrap();
        assert!(json.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_writers_leave_complete_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("shared.json");

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let path = path.clone();
                tokio::spawn(async move {
                    let body = vec![i; 4096];
                    write_json_atomic(&path, &body).await
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        let body: Vec<u32> = read_json_optional(&path).await.unwrap().unwrap();
        assert_eq!(body.len(), 4096);
        assert!(body.iter().all(|v| *v == body[0]));
    }
}
