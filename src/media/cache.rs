//! # Content-Address Media Cache
//!
//! Downloaded media bytes live on disk as `<sha256(url)>.<extension>`.
//!
//! ## Properties:
//! - **Key**: SHA-256 of the raw URL text. No normalization, so two spellings
//!   of the same video are two entries.
//! - **Immutable entries**: nothing is ever invalidated or expired.
//! - **No locking**: two requests racing on the same key both download and
//!   both write identical bytes, last writer wins. Writes are staged in a
//!   hidden file and renamed into place.
//! - **Lazy directory**: the cache folder is created on the first write.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use hex::encode as hex_encode;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::pipeline::{PipelineError, PipelineResult};

#[derive(Debug, Clone)]
pub struct MediaCache {
    dir: PathBuf,
}

impl MediaCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic cache key for a raw input URL.
    pub fn key_for(url: &str) -> String {
        hex_encode(Sha256::digest(url.as_bytes()))
    }

    pub fn entry_path(&self, key: &str, extension: &str) -> PathBuf {
        self.dir.join(format!("{key}.{extension}"))
    }

    /// Read a cached entry. A missing file is `Ok(None)`; any other I/O
    /// failure is `CacheReadFailed`.
    pub async fn get(&self, key: &str, extension: &str) -> PipelineResult<Option<Vec<u8>>> {
        let path = self.entry_path(key, extension);
        match fs::read(&path).await {
            Ok(bytes) => {
                debug!(path = %path.display(), bytes = bytes.len(), "Cache hit");
                Ok(Some(bytes))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Cache miss");
                Ok(None)
            }
            Err(source) => Err(PipelineError::CacheReadFailed { source, path }),
        }
    }

    /// Store an entry. Failures are logged and swallowed: the caller already
    /// holds the bytes it needs.
    pub async fn put(&self, key: &str, extension: &str, bytes: &[u8]) {
        if let Err(err) = self.try_put(key, extension, bytes).await {
            warn!(
                key = %key,
                extension = %extension,
                error = %err,
                "Failed to write media to cache"
            );
        }
    }

    async fn try_put(&self, key: &str, extension: &str, bytes: &[u8]) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.entry_path(key, extension);
        // Readers only ever see complete entries.
        let staging = self.dir.join(format!(".{key}.{extension}.{}", Uuid::new_v4()));
        fs::write(&staging, bytes).await?;
        if let Err(err) = fs::rename(&staging, &path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(err);
        }
        debug!(path = %path.display(), bytes = bytes.len(), "Cached media");
        Ok(())
    }
}
