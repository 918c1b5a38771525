//! Model artifact provisioning: cache-dir check, streaming download, and a
//! durable-replace write (§4.D). Generic over whatever the configured
//! backend ultimately loads from the cache directory — this module only
//! owns "is the artifact present, and if not, fetch it."

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::config::model_cache_dir;
use crate::error::{Result, VectorStoreError};

const DOWNLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Resolves and, if necessary, downloads model artifacts into
/// `~/.vectorstore/models/<model_id>/`.
pub struct ModelManager;

impl ModelManager {
    /// Ensure `model_id`'s artifact exists locally, downloading it from
    /// `download_url` when absent. Returns the artifact's path. A download
    /// in progress can be interrupted via `cancel`; a cancellation mid-write
    /// leaves no partial file behind (the temp file is cleaned up).
    /// `on_progress(bytes_downloaded, total_bytes, percent)` is invoked after
    /// every chunk written (§6); `total_bytes` is 0 when the server doesn't
    /// report `Content-Length`.
    pub async fn ensure_model<F>(model_id: &str, download_url: Option<&str>, cancel: CancellationToken, on_progress: F) -> Result<PathBuf>
    where
        F: Fn(u64, u64, f64) + Send + 'static,
    {
        let dir = model_cache_dir(model_id);
        let artifact_path = dir.join("model.bin");
        if artifact_path.exists() {
            return Ok(artifact_path);
        }
        let Some(url) = download_url else {
            return Err(VectorStoreError::model_unavailable(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no local artifact for {model_id} and no download url configured"),
            )));
        };

        let url = url.to_string();
        let dir_owned = dir.clone();
        let artifact_owned = artifact_path.clone();
        tokio::task::spawn_blocking(move || download_to(&url, &dir_owned, &artifact_owned, cancel, on_progress))
            .await
            .map_err(VectorStoreError::model_unavailable)??;

        Ok(artifact_path)
    }
}

fn download_to<F>(url: &str, dir: &Path, dest: &Path, cancel: CancellationToken, on_progress: F) -> Result<()>
where
    F: Fn(u64, u64, f64),
{
    std::fs::create_dir_all(dir)?;
    let response = ureq::get(url)
        .call()
        .map_err(|err| VectorStoreError::model_unavailable(std::io::Error::new(std::io::ErrorKind::Other, err.to_string())))?;
    let total_bytes = response
        .header("Content-Length")
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(0);
    stream_to_file(response.into_reader(), total_bytes, dir, dest, cancel, on_progress)
}

/// Drain `reader` into `<dir>/.model.bin.tmp` in fixed-size chunks, reporting
/// progress after each write, then durably rename the temp file to `dest`.
/// Split out from `download_to` so the cancellation and progress-reporting
/// loop can be exercised directly against an in-memory reader, without a
/// live HTTP connection.
fn stream_to_file<R, F>(mut reader: R, total_bytes: u64, dir: &Path, dest: &Path, cancel: CancellationToken, on_progress: F) -> Result<()>
where
    R: Read,
    F: Fn(u64, u64, f64),
{
    let tmp_path = dir.join(".model.bin.tmp");
    let mut tmp = std::fs::File::create(&tmp_path)?;
    let mut buf = [0u8; DOWNLOAD_CHUNK_SIZE];
    let mut downloaded = 0u64;

    loop {
        if cancel.is_cancelled() {
            drop(tmp);
            let _ = std::fs::remove_file(&tmp_path);
            return Err(VectorStoreError::Cancelled);
        }
        let read = reader.read(&mut buf)?;
        if read == 0 {
            break;
        }
        tmp.write_all(&buf[..read])?;
        downloaded += read as u64;
        let pct = if total_bytes > 0 { downloaded as f64 / total_bytes as f64 * 100.0 } else { 0.0 };
        on_progress(downloaded, total_bytes, pct);
    }
    tmp.sync_all()?;
    drop(tmp);
    std::fs::rename(&tmp_path, dest)?;
    tracing::info!(path = %dest.display(), "model artifact downloaded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn cancellation_during_streaming_leaves_no_partial_file() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("model.bin");
        let token = CancellationToken::new();
        token.cancel();
        let reader = Cursor::new(vec![0u8; 1024]);

        let result = stream_to_file(reader, 1024, dir.path(), &dest, token, |_, _, _| {});

        assert!(matches!(result, Err(VectorStoreError::Cancelled)));
        assert!(!dir.path().join(".model.bin.tmp").exists());
        assert!(!dest.exists());
    }

    #[test]
    fn streaming_writes_the_full_payload_and_reports_progress_to_completion() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("model.bin");
        let payload = vec![7u8; DOWNLOAD_CHUNK_SIZE * 3 + 17];
        let reader = Cursor::new(payload.clone());
        let calls: RefCell<Vec<(u64, u64, f64)>> = RefCell::new(Vec::new());

        stream_to_file(reader, payload.len() as u64, dir.path(), &dest, CancellationToken::new(), |downloaded, total, pct| {
            calls.borrow_mut().push((downloaded, total, pct));
        })
        .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), payload);
        assert!(!dir.path().join(".model.bin.tmp").exists());
        let calls = calls.into_inner();
        assert!(calls.len() >= 4, "expected a progress call per chunk");
        let (last_downloaded, last_total, last_pct) = *calls.last().unwrap();
        assert_eq!(last_downloaded, payload.len() as u64);
        assert_eq!(last_total, payload.len() as u64);
        assert!((last_pct - 100.0).abs() < 1e-6);
    }

    #[test]
    fn zero_total_bytes_reports_zero_percent_instead_of_dividing_by_zero() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("model.bin");
        let reader = Cursor::new(vec![1u8; 10]);
        let calls: RefCell<Vec<f64>> = RefCell::new(Vec::new());

        stream_to_file(reader, 0, dir.path(), &dest, CancellationToken::new(), |_, _, pct| {
            calls.borrow_mut().push(pct);
        })
        .unwrap();

        assert!(calls.into_inner().iter().all(|&pct| pct == 0.0));
    }
}
