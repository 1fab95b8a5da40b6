//! # Media Resolver
//!
//! Splits the work of getting media into two calls:
//! - **`resolve`**: one call to the extraction provider for fresh metadata.
//!   Metadata is never cached.
//! - **`fetch_bytes`**: cache lookup by `sha256(url)` + mode extension,
//!   falling back to a download of the selected variant. Only raw bytes are
//!   cached, since the transfer is the expensive part.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::media::{MediaCache, MediaDownloader, MediaKind, MediaMetadata, MetadataProvider};
use crate::pipeline::{PipelineError, PipelineResult};

/// Media bytes together with where they came from.
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub bytes: Vec<u8>,
    pub cached: bool,
    /// The variant URL chosen from the metadata, when one exists.
    pub download_url: Option<String>,
}

pub struct MediaResolver {
    provider: Arc<dyn MetadataProvider>,
    downloader: Arc<dyn MediaDownloader>,
    cache: MediaCache,
}

impl MediaResolver {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        downloader: Arc<dyn MediaDownloader>,
        cache: MediaCache,
    ) -> Self {
        Self {
            provider,
            downloader,
            cache,
        }
    }

    pub fn provider_id(&self) -> &str {
        self.provider.id()
    }

    pub fn cache(&self) -> &MediaCache {
        &self.cache
    }

    pub async fn resolve(&self, url: &str) -> PipelineResult<MediaMetadata> {
        self.provider.extract(url).await
    }

    /// Return the media for `url` in the requested mode.
    ///
    /// A cache hit performs no network access. On a miss the selected
    /// variant is downloaded and written back best-effort. An unreadable
    /// cache entry is logged and treated as a miss.
    pub async fn fetch_bytes(
        &self,
        url: &str,
        metadata: &MediaMetadata,
        kind: MediaKind,
        prefer_high_def: bool,
    ) -> PipelineResult<FetchedMedia> {
        let key = MediaCache::key_for(url);
        let extension = kind.extension();
        let download_url = metadata
            .download_url(kind, prefer_high_def)
            .map(str::to_string);

        match self.cache.get(&key, extension).await {
            Ok(Some(bytes)) => {
                debug!(key = %key, extension = %extension, "Serving media from cache");
                return Ok(FetchedMedia {
                    bytes,
                    cached: true,
                    download_url,
                });
            }
            Ok(None) => {}
            Err(err) => {
                warn!(key = %key, error = %err, "Cache read failed, downloading instead");
            }
        }

        let source = download_url.as_deref().ok_or(PipelineError::NoDownloadUrl)?;
        let bytes = self.downloader.download(source).await?;
        self.cache.put(&key, extension, &bytes).await;

        Ok(FetchedMedia {
            bytes,
            cached: false,
            download_url,
        })
    }
}
