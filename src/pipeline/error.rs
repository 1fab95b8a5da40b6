use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures raised by the stages of the caption pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("metadata extraction failed: {0}")]
    ExtractionFailed(String),
    #[error("no downloadable media url in metadata")]
    NoDownloadUrl,
    #[error("media download failed: {0}")]
    DownloadFailed(String),
    #[error("cache read failed at {path}: {source}")]
    CacheReadFailed {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("transcription timed out after {0:?}")]
    TranscriptionTimeout(Duration),
    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Short summary used as the `error` field of the response body.
    pub fn summary(&self) -> &'static str {
        match self {
            PipelineError::InvalidUrl(_) => "Invalid TikTok URL",
            PipelineError::ExtractionFailed(_) => "Failed to fetch video metadata",
            PipelineError::NoDownloadUrl => "No download URL available",
            PipelineError::DownloadFailed(_) => "Failed to download media",
            PipelineError::CacheReadFailed { .. } => "Failed to read media cache",
            PipelineError::TranscriptionTimeout(_) => "Transcription request timed out",
            PipelineError::TranscriptionFailed(_) => "Transcription failed",
            PipelineError::Internal(_) => "Internal server error",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PipelineError::TranscriptionTimeout(_))
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(error: serde_json::Error) -> Self {
        PipelineError::ExtractionFailed(format!("unexpected provider payload: {error}"))
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
