//! # Extraction Providers
//!
//! Two interchangeable ways to turn a TikTok URL into [`MediaMetadata`]:
//! - **api**: the tikwm HTTP API ([`TikwmProvider`])
//! - **yt-dlp**: a local `yt-dlp` executable ([`YtDlpProvider`])
//!
//! The caption pipeline only sees the [`MetadataProvider`] trait, so the
//! pipeline, timing and error logic exist once for both.

pub mod tikwm;
pub mod ytdlp;

use async_trait::async_trait;

use crate::media::MediaMetadata;
use crate::pipeline::PipelineResult;

pub use tikwm::TikwmProvider;
pub use ytdlp::YtDlpProvider;

/// Resolves a source URL into normalized metadata with exactly one
/// outbound call.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Provider identifier, reported by the health endpoint.
    fn id(&self) -> &str;

    async fn extract(&self, url: &str) -> PipelineResult<MediaMetadata>;
}
